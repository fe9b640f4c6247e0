use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use super::degraded;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::upstream::BitcoinQuote;

/// `GET /api/bitcoin/price`
///
/// When the feed fails the response is a 500 that still carries a
/// quote-shaped `data` so the widget can render something.
pub async fn price(State(state): State<AppState>) -> Response {
    match state.price_feed.quote().await {
        Ok(quote) => Envelope::ok(quote).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Bitcoin price lookup failed, serving fallback");
            degraded("Failed to fetch Bitcoin price", BitcoinQuote::fallback())
        }
    }
}
