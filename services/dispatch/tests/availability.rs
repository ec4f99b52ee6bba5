//! Availability behavior of the allocation engine: live ranking, cache
//! fallback, and the defined empty result when neither exists.
//!
//! The catalog pool is constructed lazily and never touched: availability
//! and the no-fit path are decided before any allocation row is written.

use lifeboat_dispatch::allocator::AllocationEngine;
use lifeboat_dispatch::cache::RankingCache;
use lifeboat_dispatch::ranking_client::RankingClient;
use serde_json::json;
use sqlx::postgres::PgPool;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lazy_pool() -> PgPool {
    PgPool::connect_lazy("postgres://localhost/lifeboat_test").unwrap()
}

fn ranked_entry(asset_id: i64, priority: i32, size_mb: f64) -> serde_json::Value {
    json!({
        "path": format!("path/{asset_id}"),
        "name": format!("asset {asset_id}"),
        "priority": priority,
        "size_mb": size_mb,
        "ds_id": "ds",
        "res_id": "res",
        "asset_id": asset_id,
        "url": format!("https://example.org/{asset_id}.csv")
    })
}

#[tokio::test]
async fn unreachable_ranking_with_no_cache_yields_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = RankingClient::new("http://127.0.0.1:9").unwrap();
    let cache = RankingCache::new(dir.path().join("cache.json"));
    let engine = AllocationEngine::new(client, cache, lazy_pool());

    assert!(engine.get_available_assets().await.is_empty());

    // Nothing to pack: a defined empty result, not an error.
    let allocation = engine.allocate_assets(1024.0, None).await.unwrap();
    assert!(allocation.is_none());
}

#[tokio::test]
async fn successful_call_refreshes_cache_write_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ranking"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "asset": [ranked_entry(1, 1, 5.0), ranked_entry(2, 2, 10.0)]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");

    let engine = AllocationEngine::new(
        RankingClient::new(&server.uri()).unwrap(),
        RankingCache::new(&cache_path),
        lazy_pool(),
    );
    let live = engine.get_available_assets().await;
    assert_eq!(live.len(), 2);

    // A second engine pointed at a dead ranking service reads the cache
    // the first call wrote.
    let fallback_engine = AllocationEngine::new(
        RankingClient::new("http://127.0.0.1:9").unwrap(),
        RankingCache::new(&cache_path),
        lazy_pool(),
    );
    let cached = fallback_engine.get_available_assets().await;
    assert_eq!(cached, live);
}
