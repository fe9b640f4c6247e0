//! End-to-end tests for the read-only routes.

mod common;

use common::{dead_upstream, spawn_gateway, start_mock_upstream, test_config};
use betirement_gateway::config::schema::{ExperimentConfig, VariantConfig};
use serde_json::{json, Value};

const COIN: &str = r#"{"id":"bitcoin","market_data":{
    "current_price":{"usd":97000.0},
    "price_change_24h":1200.5,
    "price_change_percentage_24h":1.25,
    "high_24h":{"usd":98000.0},
    "low_24h":{"usd":95000.0},
    "market_cap":{"usd":1900000000000.0},
    "total_volume":{"usd":30000000000.0},
    "last_updated":"2026-10-19T08:00:00.000Z"}}"#;

const SEARCH: &str = r#"{"nextPageToken":"CAwQAA","items":[
    {"id":{"videoId":"dQw4w9WgXcQ"},"snippet":{"title":"Retire with Bitcoin","description":"",
     "publishedAt":"2026-10-01T12:00:00Z","thumbnails":{"high":{"url":"https://i.ytimg.com/h.jpg"}}}}]}"#;

#[tokio::test]
async fn test_health() {
    let gateway = spawn_gateway(test_config()).await;

    let response = gateway.client.get(gateway.url("/api/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response.headers().get("x-ratelimit-limit").is_none());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let gateway = spawn_gateway(test_config()).await;

    let response = gateway.client.get(gateway.url("/api/nope")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_price_is_served_and_cached() {
    let feed = start_mock_upstream(200, COIN).await;
    let mut config = test_config();
    config.bitcoin.base_url = feed.url();
    let gateway = spawn_gateway(config).await;

    for _ in 0..3 {
        let response = gateway.client.get(gateway.url("/api/bitcoin/price")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["x-ratelimit-limit"], "100");

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["price"], 97000.0);
        assert_eq!(body["data"]["changePercent24h"], 1.25);
        assert_eq!(body["data"]["lastUpdated"], "2026-10-19T08:00:00Z");
    }

    assert_eq!(feed.hits(), 1);
    assert!(feed
        .last_request()
        .unwrap()
        .request_line
        .starts_with("GET /coins/bitcoin?"));
}

#[tokio::test]
async fn test_price_falls_back_when_feed_down() {
    let mut config = test_config();
    config.bitcoin.base_url = dead_upstream().await;
    let gateway = spawn_gateway(config).await;

    let response = gateway.client.get(gateway.url("/api/bitcoin/price")).send().await.unwrap();
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to fetch Bitcoin price");
    assert_eq!(body["data"]["price"], 100000.0);
    assert!(body["data"]["lastUpdated"].is_string());
}

#[tokio::test]
async fn test_price_upstream_errors_are_retried() {
    let feed = start_mock_upstream(503, "{}").await;
    let mut config = test_config();
    config.retries.enabled = true;
    config.retries.max_attempts = 3;
    config.retries.base_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config.bitcoin.base_url = feed.url();
    let gateway = spawn_gateway(config).await;

    let response = gateway.client.get(gateway.url("/api/bitcoin/price")).send().await.unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(feed.hits(), 3);
}

#[tokio::test]
async fn test_video_listing() {
    let youtube = start_mock_upstream(200, SEARCH).await;
    let mut config = test_config();
    config.youtube.base_url = youtube.url();
    config.youtube.api_key = "yt_test".into();
    config.youtube.channel_id = "UCbetirement".into();
    let gateway = spawn_gateway(config).await;

    let response = gateway
        .client
        .get(gateway.url("/api/videos?maxResults=500&pageToken=CAUQAA"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-ratelimit-limit"], "30");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["nextPageToken"], "CAwQAA");
    assert_eq!(body["data"]["videos"][0]["id"], "dQw4w9WgXcQ");
    assert_eq!(body["data"]["videos"][0]["thumbnailUrl"], "https://i.ytimg.com/h.jpg");

    let request_line = youtube.last_request().unwrap().request_line;
    assert!(request_line.starts_with("GET /search?"));
    assert!(request_line.contains("maxResults=50"));
    assert!(request_line.contains("pageToken=CAUQAA"));
}

#[tokio::test]
async fn test_video_listing_without_credentials() {
    let gateway = spawn_gateway(test_config()).await;

    let response = gateway.client.get(gateway.url("/api/videos")).send().await.unwrap();
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], json!({"videos": [], "nextPageToken": null}));
}

#[tokio::test]
async fn test_video_by_id() {
    let youtube = start_mock_upstream(200, r#"{"items":[]}"#).await;
    let mut config = test_config();
    config.youtube.base_url = youtube.url();
    config.youtube.api_key = "yt_test".into();
    let gateway = spawn_gateway(config).await;

    let bad = gateway.client.get(gateway.url("/api/videos/short")).send().await.unwrap();
    assert_eq!(bad.status(), 400);
    assert_eq!(youtube.hits(), 0);

    let missing = gateway.client.get(gateway.url("/api/videos/dQw4w9WgXcQ")).send().await.unwrap();
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body, json!({"error": "Video not found", "success": false}));
}

#[tokio::test]
async fn test_social_placeholder_is_strictly_limited() {
    let gateway = spawn_gateway(test_config()).await;

    for _ in 0..5 {
        let response = gateway.client.get(gateway.url("/api/social/twitter")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["platform"], "twitter");
        assert_eq!(body["data"]["available"], false);
        assert_eq!(body["data"]["posts"], json!([]));
    }

    let limited = gateway.client.get(gateway.url("/api/social/twitter")).send().await.unwrap();
    assert_eq!(limited.status(), 429);

    let unknown = gateway
        .client
        .get(gateway.url("/api/social/myspace"))
        .header("x-forwarded-for", "192.0.2.44")
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn test_experiment_assignment() {
    let mut config = test_config();
    config.experiments = vec![ExperimentConfig {
        id: "hero-cta".into(),
        variants: vec![
            VariantConfig { name: "control".into(), weight: 1 },
            VariantConfig { name: "stack-sats".into(), weight: 1 },
        ],
    }];
    let gateway = spawn_gateway(config).await;

    let kept: Value = gateway
        .client
        .get(gateway.url("/api/experiments/hero-cta/variant?current=stack-sats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(kept["data"], json!({"experiment": "hero-cta", "variant": "stack-sats"}));

    let fresh: Value = gateway
        .client
        .get(gateway.url("/api/experiments/hero-cta/variant"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let variant = fresh["data"]["variant"].as_str().unwrap();
    assert!(variant == "control" || variant == "stack-sats");

    let unknown = gateway
        .client
        .get(gateway.url("/api/experiments/nope/variant"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn test_malformed_query_is_json_400() {
    let gateway = spawn_gateway(test_config()).await;

    for path in [
        "/api/videos?maxResults=1&maxResults=2",
        "/api/experiments/hero-cta/variant?current=a&current=b",
    ] {
        let response = gateway.client.get(gateway.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "{path}");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert!(response.headers().contains_key("x-ratelimit-limit"));

        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Invalid query parameters", "success": false}));
    }
}

#[tokio::test]
async fn test_public_preflight() {
    let gateway = spawn_gateway(test_config()).await;

    let response = gateway
        .client
        .request(reqwest::Method::OPTIONS, gateway.url("/api/videos"))
        .header("origin", "https://someone-else.example")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["access-control-max-age"], "86400");
    assert!(response.headers().get("access-control-allow-credentials").is_none());
}
