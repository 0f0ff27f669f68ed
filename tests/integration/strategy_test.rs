//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 单键读取策略集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{ctx, setup_logging, source_value, MapStore};
use oxfetch::{
    CacheError, CancellationToken, Fetcher, FetcherBuilder, Strategy, StrategyFetcher,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn build_fetcher(store: Arc<MapStore>, strategy: Strategy) -> StrategyFetcher<u64, String> {
    FetcherBuilder::<u64, String>::new(store)
        .with_strategy(strategy)
        .with_namespace("user")
        .with_load_fn(|_ctx: CancellationToken, key: u64| async move {
            Ok::<_, CacheError>(source_value(key))
        })
        .build()
        .unwrap()
}

/// 缓存优先：首次读取回源并回填，再次读取命中缓存
#[tokio::test]
async fn test_cache_first_loads_then_hits() {
    setup_logging();
    let store = Arc::new(MapStore::new());
    let fetcher = build_fetcher(store.clone(), Strategy::CacheFirst);

    let first = fetcher.get(&ctx(), &1).await.unwrap();
    assert_eq!(first, "source-1");
    assert_eq!(fetcher.stats().source_loads, 1);
    assert_eq!(fetcher.stats().hits, 0);
    assert_eq!(store.value("user:1").as_deref(), Some("source-1"));

    let second = fetcher.get(&ctx(), &1).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(fetcher.stats().source_loads, 1);
    assert_eq!(fetcher.stats().hits, 1);
}

/// 缓存优先：写入后读取返回写入值，不回源
#[tokio::test]
async fn test_cache_first_returns_value_written_by_set() {
    setup_logging();
    let store = Arc::new(MapStore::new());
    let fetcher = build_fetcher(store.clone(), Strategy::CacheFirst);

    fetcher.set(&ctx(), &7, "written".to_string()).await.unwrap();
    assert_eq!(fetcher.get(&ctx(), &7).await.unwrap(), "written");
    assert_eq!(fetcher.stats().source_loads, 0);
    assert_eq!(fetcher.stats().hits, 1);
}

/// 缓存优先：缓存故障时回源，回填失败不影响结果
#[tokio::test]
async fn test_cache_first_survives_store_failure() {
    setup_logging();
    let store = Arc::new(MapStore::new());
    store.set_failing(true);
    let fetcher = build_fetcher(store.clone(), Strategy::CacheFirst);

    assert_eq!(fetcher.get(&ctx(), &3).await.unwrap(), "source-3");
    assert_eq!(fetcher.stats().source_loads, 1);
    assert_eq!(store.sets(), 1);
    assert_eq!(store.len(), 0);
}

/// 缓存优先：缓存未命中且回源失败时返回加载器错误
#[tokio::test]
async fn test_cache_first_surfaces_loader_error() {
    let store = Arc::new(MapStore::new());
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_load_fn(|_ctx: CancellationToken, _key: u64| async move {
            Err::<String, _>(CacheError::Source("db down".to_string()))
        })
        .build()
        .unwrap();

    let err = fetcher.get(&ctx(), &1).await.unwrap_err();
    assert!(matches!(err, CacheError::Source(_)));
    assert_eq!(fetcher.stats().source_loads, 1);
    assert_eq!(store.sets(), 0);
}

/// 数据源优先：每次成功读取都回源，缓存不被读取
#[tokio::test]
async fn test_source_first_always_loads() {
    setup_logging();
    let store = Arc::new(MapStore::new());
    store.seed("user:5", "stale");
    let fetcher = build_fetcher(store.clone(), Strategy::SourceFirst);

    for expected_loads in 1..=3 {
        assert_eq!(fetcher.get(&ctx(), &5).await.unwrap(), "source-5");
        assert_eq!(fetcher.stats().source_loads, expected_loads);
    }
    assert_eq!(fetcher.stats().hits, 0);
    assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.value("user:5").as_deref(), Some("source-5"));
}

/// 数据源优先：回源失败时退回缓存
#[tokio::test]
async fn test_source_first_falls_back_to_cache() {
    setup_logging();
    let store = Arc::new(MapStore::new());
    store.seed("user:9", "cached");
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = healthy.clone();
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_strategy(Strategy::SourceFirst)
        .with_namespace("user")
        .with_load_fn(move |_ctx: CancellationToken, key: u64| {
            let ok = flag.load(Ordering::SeqCst);
            async move {
                if ok {
                    Ok(source_value(key))
                } else {
                    Err(CacheError::Source("timeout".to_string()))
                }
            }
        })
        .build()
        .unwrap();

    assert_eq!(fetcher.get(&ctx(), &9).await.unwrap(), "cached");
    assert_eq!(fetcher.stats().source_loads, 1);
    assert_eq!(fetcher.stats().hits, 1);

    // 源和缓存都没有数据时返回缓存的错误
    let err = fetcher.get(&ctx(), &10).await.unwrap_err();
    assert!(err.is_not_found());

    healthy.store(true, Ordering::SeqCst);
    assert_eq!(fetcher.get(&ctx(), &9).await.unwrap(), "source-9");
}

/// 仅缓存：未命中返回错误且从不回源，刷新后可读
#[tokio::test]
async fn test_cache_only_never_loads_until_refresh() {
    setup_logging();
    let store = Arc::new(MapStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_strategy(Strategy::CacheOnly)
        .with_namespace("user")
        .with_load_fn(move |_ctx: CancellationToken, key: u64| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, CacheError>(source_value(key)) }
        })
        .build()
        .unwrap();

    assert!(fetcher.get(&ctx(), &4).await.unwrap_err().is_not_found());
    assert_eq!(fetcher.stats().source_loads, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    fetcher.refresh(&ctx(), &[4]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // 刷新不是读取，不影响计数
    assert_eq!(fetcher.stats().source_loads, 0);

    assert_eq!(fetcher.get(&ctx(), &4).await.unwrap(), "source-4");
    assert_eq!(fetcher.stats().hits, 1);
}

/// 仅缓存：删除后读取返回不存在
#[tokio::test]
async fn test_cache_only_get_after_delete() {
    let store = Arc::new(MapStore::new());
    let fetcher = build_fetcher(store.clone(), Strategy::CacheOnly);

    fetcher.set(&ctx(), &2, "two".to_string()).await.unwrap();
    assert_eq!(fetcher.get(&ctx(), &2).await.unwrap(), "two");

    fetcher.delete(&ctx(), &[2]).await.unwrap();
    assert!(!store.contains("user:2"));
    assert!(fetcher.get(&ctx(), &2).await.unwrap_err().is_not_found());
}

/// 回填条目携带配置的过期时间
#[tokio::test]
async fn test_write_back_uses_configured_ttl() {
    let store = Arc::new(MapStore::new());
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_namespace("user")
        .with_ttl(Duration::from_secs(90))
        .with_load_fn(|_ctx: CancellationToken, key: u64| async move {
            Ok::<_, CacheError>(source_value(key))
        })
        .build()
        .unwrap();

    fetcher.get(&ctx(), &11).await.unwrap();
    assert_eq!(store.ttl_of("user:11"), Some(Duration::from_secs(90)));
}

/// 未设置命名空间时缓存键就是键的文本表示
#[tokio::test]
async fn test_empty_namespace_uses_raw_key() {
    let store = Arc::new(MapStore::new());
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_load_fn(|_ctx: CancellationToken, key: u64| async move {
            Ok::<_, CacheError>(source_value(key))
        })
        .build()
        .unwrap();

    fetcher.get(&ctx(), &12).await.unwrap();
    assert!(store.contains("12"));
}
