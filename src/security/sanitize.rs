//! Input sanitization and injection heuristics.
//!
//! Every `sanitize_*` function is pure and idempotent: feeding its output back
//! in returns the same string. The `looks_like_*` detectors are a coarse
//! pre-filter used to reject requests outright. They are not a substitute for
//! escaping or parameterized queries in anything downstream.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_TAG_LEN: usize = 30;

static SCRIPT_STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap_or_else(|e| {
        tracing::error!("Failed to compile script block regex: {}", e);
        never_matches()
    })
});

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)</?[A-Za-z!][^>]*>").unwrap_or_else(|e| {
        tracing::error!("Failed to compile tag regex: {}", e);
        never_matches()
    })
});

static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap_or_else(
        |e| {
            tracing::error!("Failed to compile email regex: {}", e);
            never_matches()
        },
    )
});

static SCRIPT_INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(<\s*script|</\s*script|javascript\s*:|vbscript\s*:|data\s*:\s*text/html|<\s*iframe|<\s*object|<\s*embed|<\s*svg[^>]*\bon|\bon[a-z]+\s*=|expression\s*\()",
    )
    .unwrap_or_else(|e| {
        tracing::error!("Failed to compile script injection regex: {}", e);
        never_matches()
    })
});

static SQL_INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\bunion\b\s+(all\s+)?\bselect\b|;\s*(drop|delete|insert|update|alter|create|truncate|exec)\b|\bdrop\s+(table|database)\b|'\s*or\s*'?\d+'?\s*=\s*'?\d+|'\s*or\s*'[^']*'\s*=\s*'|--|/\*|\*/|\bxp_cmdshell\b|\bsleep\s*\(|\bwaitfor\s+delay\b)",
    )
    .unwrap_or_else(|e| {
        tracing::error!("Failed to compile SQL injection regex: {}", e);
        never_matches()
    })
});

/// Fallback for a pattern that failed to compile.
pub(crate) fn never_matches() -> Regex {
    // [^\s\S] is the empty character class.
    Regex::new(r"[^\s\S]").expect("empty class is a valid regex")
}

/// Truncate to at most `max` characters (not bytes).
fn truncate_chars(input: &str, max: usize) -> &str {
    match input.char_indices().nth(max) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Lowercase, keep only characters valid in an address, cap at 254.
pub fn sanitize_email(input: &str) -> String {
    let filtered: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "@._%+-".contains(*c))
        .collect();
    truncate_chars(&filtered, MAX_EMAIL_LEN).to_string()
}

/// Display names: letters, spaces, apostrophes, hyphens and periods.
pub fn sanitize_name(input: &str) -> String {
    let filtered: String = input
        .chars()
        .filter(|c| c.is_alphabetic() || matches!(c, ' ' | '\'' | '-' | '.'))
        .collect();
    let collapsed = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_NAME_LEN).trim_end().to_string()
}

/// Free text: drop script/style blocks, any tags, then stray angle brackets.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let without_blocks = SCRIPT_STYLE_BLOCK.replace_all(input, "");
    let without_tags = HTML_TAG.replace_all(&without_blocks, "");
    let stripped: String = without_tags
        .chars()
        .filter(|c| *c != '<' && *c != '>' && (!c.is_control() || *c == '\n'))
        .collect();
    truncate_chars(stripped.trim(), max_len).trim_end().to_string()
}

/// Tags: lowercase slug of `[a-z0-9_-]`, spaces become hyphens.
pub fn sanitize_tag(input: &str) -> String {
    let slug: String = input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let trimmed = slug.trim_matches('-');
    truncate_chars(trimmed, MAX_TAG_LEN).trim_end_matches('-').to_string()
}

/// Format check for an already-sanitized address.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_FORMAT.is_match(email)
}

/// Flags markup or URL schemes that execute script.
pub fn looks_like_script_injection(input: &str) -> bool {
    SCRIPT_INJECTION.is_match(input)
}

/// Flags common SQL injection constructs.
pub fn looks_like_sql_injection(input: &str) -> bool {
    SQL_INJECTION.is_match(input)
}

/// Either detector fired.
pub fn looks_like_injection(input: &str) -> bool {
    looks_like_script_injection(input) || looks_like_sql_injection(input)
}
