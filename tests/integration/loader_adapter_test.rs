//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 加载器适配与协作者调用次数测试

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::{ctx, setup_logging, MapStore};
use mockall::mock;
use mockall::predicate::eq;
use oxfetch::{
    BatchLoader, CacheError, CacheStore, CancellationToken, Entry, Fetcher, FetcherBuilder,
    Loader, Result, Strategy,
};
use std::sync::Arc;

mock! {
    pub Source {}

    #[async_trait]
    impl Loader<u64, String> for Source {
        async fn load(&self, ctx: &CancellationToken, key: &u64) -> Result<String>;
    }
}

mock! {
    pub BatchSource {}

    #[async_trait]
    impl BatchLoader<u64, String> for BatchSource {
        async fn batch_load(&self, ctx: &CancellationToken, keys: &[u64]) -> Result<Vec<String>>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl CacheStore<String> for Store {
        async fn get(&self, ctx: &CancellationToken, key: &str) -> Result<Entry<String>>;
        async fn multi_get(
            &self,
            ctx: &CancellationToken,
            keys: &[String],
        ) -> Result<Vec<Option<Entry<String>>>>;
        async fn set(&self, ctx: &CancellationToken, entries: Vec<Entry<String>>) -> Result<()>;
        async fn delete(&self, ctx: &CancellationToken, keys: &[String]) -> Result<()>;
    }
}

/// 只配置单键加载器时，批量读取逐键加载，失败位置为空值
#[tokio::test]
async fn test_single_loader_serves_batch_reads() {
    setup_logging();
    let mut source = MockSource::new();
    source
        .expect_load()
        .with(mockall::predicate::always(), eq(1))
        .times(1)
        .returning(|_, k| Ok(format!("v{}", k)));
    source
        .expect_load()
        .with(mockall::predicate::always(), eq(2))
        .times(1)
        .returning(|_, _| Err(CacheError::Source("row missing".to_string())));
    source
        .expect_load()
        .with(mockall::predicate::always(), eq(3))
        .times(1)
        .returning(|_, k| Ok(format!("v{}", k)));

    let store = Arc::new(MapStore::new());
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_empty_value("-".to_string())
        .with_loader(Arc::new(source))
        .build()
        .unwrap();

    let values = fetcher.multi_get(&ctx(), &[1, 2, 3]).await.unwrap();
    assert_eq!(values, vec!["v1", "-", "v3"]);
    assert_eq!(fetcher.stats().source_loads, 3);
    // 逐键合成的批量加载总是成功，失败位置以空值回填
    assert_eq!(store.value("2").as_deref(), Some("-"));
}

/// 只配置批量加载器时，单键读取以单元素列表调用
#[tokio::test]
async fn test_batch_loader_serves_single_reads() {
    let mut batch = MockBatchSource::new();
    batch
        .expect_batch_load()
        .withf(|_, keys| keys.to_vec() == vec![8])
        .times(1)
        .returning(|_, keys| Ok(keys.iter().map(|k| format!("b{}", k)).collect()));

    let store = Arc::new(MapStore::new());
    let fetcher = FetcherBuilder::<u64, String>::new(store.clone())
        .with_batch_loader(Arc::new(batch))
        .build()
        .unwrap();

    assert_eq!(fetcher.get(&ctx(), &8).await.unwrap(), "b8");
    // 第二次命中缓存，不再调用加载器
    assert_eq!(fetcher.get(&ctx(), &8).await.unwrap(), "b8");
}

/// 批量加载器返回空结果时，单键读取返回不存在
#[tokio::test]
async fn test_batch_loader_empty_result_is_not_found() {
    let mut batch = MockBatchSource::new();
    batch
        .expect_batch_load()
        .times(1)
        .returning(|_, _| Ok(Vec::new()));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(MapStore::new()))
        .with_batch_loader(Arc::new(batch))
        .build()
        .unwrap();

    assert!(fetcher.get(&ctx(), &1).await.unwrap_err().is_not_found());
}

/// 同时配置两种加载器时各自独立使用
#[tokio::test]
async fn test_both_loaders_used_as_is() {
    let mut single = MockSource::new();
    single
        .expect_load()
        .times(1)
        .returning(|_, k| Ok(format!("single-{}", k)));
    let mut batch = MockBatchSource::new();
    batch
        .expect_batch_load()
        .times(1)
        .returning(|_, keys| Ok(keys.iter().map(|k| format!("batch-{}", k)).collect()));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(MapStore::new()))
        .with_strategy(Strategy::SourceFirst)
        .with_loader(Arc::new(single))
        .with_batch_loader(Arc::new(batch))
        .build()
        .unwrap();

    assert_eq!(fetcher.get(&ctx(), &1).await.unwrap(), "single-1");
    assert_eq!(
        fetcher.multi_get(&ctx(), &[2, 3]).await.unwrap(),
        vec!["batch-2", "batch-3"]
    );
}

/// 未配置任何加载器时构建失败
#[test]
fn test_build_requires_a_loader() {
    let result = FetcherBuilder::<u64, String>::new(Arc::new(MapStore::new()))
        .with_strategy(Strategy::CacheOnly)
        .build();
    assert!(matches!(result, Err(CacheError::ConfigError(_))));
}

/// 取消令牌原样传递给存储和加载器
#[tokio::test]
async fn test_cancellation_token_passed_through() {
    let token = CancellationToken::new();
    token.cancel();

    let mut store = MockStore::new();
    store
        .expect_get()
        .withf(|ctx, key| ctx.is_cancelled() && key == "7")
        .times(1)
        .returning(|_, key| Err(CacheError::NotFound(key.to_string())));
    store
        .expect_set()
        .withf(|ctx, entries| ctx.is_cancelled() && entries.len() == 1)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut source = MockSource::new();
    source
        .expect_load()
        .withf(|ctx, key| ctx.is_cancelled() && *key == 7)
        .times(1)
        .returning(|_, k| Ok(k.to_string()));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(store))
        .with_loader(Arc::new(source))
        .build()
        .unwrap();

    assert_eq!(fetcher.get(&token, &7).await.unwrap(), "7");
}

/// 存储批量读取返回的槽位数量与键不一致时视为缓存故障
#[tokio::test]
async fn test_store_slot_count_mismatch() {
    let mut store = MockStore::new();
    store
        .expect_multi_get()
        .returning(|_, _| Ok(vec![None]));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(store))
        .with_strategy(Strategy::CacheOnly)
        .with_load_fn(|_ctx: CancellationToken, k: u64| async move {
            Ok::<_, CacheError>(k.to_string())
        })
        .build()
        .unwrap();

    let err = fetcher.multi_get(&ctx(), &[1, 2]).await.unwrap_err();
    assert!(matches!(err, CacheError::Backend(_)));
}

fn cancelled_token() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

fn raw_keys(keys: &[u64]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// 缓存优先批量读取：批量读缓存、批量回源和回填都收到同一个令牌
#[tokio::test]
async fn test_cancellation_token_reaches_batch_read_path() {
    let token = cancelled_token();

    let mut store = MockStore::new();
    store
        .expect_multi_get()
        .withf(|ctx, keys| ctx.is_cancelled() && keys.to_vec() == raw_keys(&[1, 2]))
        .times(1)
        .returning(|_, keys| Ok(vec![None; keys.len()]));
    store
        .expect_set()
        .withf(|ctx, entries| ctx.is_cancelled() && entries.len() == 2)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut batch = MockBatchSource::new();
    batch
        .expect_batch_load()
        .withf(|ctx, keys| ctx.is_cancelled() && keys.to_vec() == vec![1, 2])
        .times(1)
        .returning(|_, keys| Ok(keys.iter().map(|k| format!("b{}", k)).collect()));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(store))
        .with_batch_loader(Arc::new(batch))
        .build()
        .unwrap();

    assert_eq!(
        fetcher.multi_get(&token, &[1, 2]).await.unwrap(),
        vec!["b1", "b2"]
    );
}

/// 删除与强制刷新把令牌传给存储和批量加载器
#[tokio::test]
async fn test_cancellation_token_reaches_delete_and_refresh() {
    let token = cancelled_token();

    let mut store = MockStore::new();
    store
        .expect_delete()
        .withf(|ctx, keys| ctx.is_cancelled() && keys.to_vec() == raw_keys(&[4]))
        .times(1)
        .returning(|_, _| Ok(()));
    store
        .expect_set()
        .withf(|ctx, entries| {
            ctx.is_cancelled()
                && entries.iter().map(|e| e.key()).collect::<Vec<_>>() == vec!["5", "6"]
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let mut batch = MockBatchSource::new();
    batch
        .expect_batch_load()
        .withf(|ctx, keys| ctx.is_cancelled() && keys.to_vec() == vec![5, 6])
        .times(1)
        .returning(|_, keys| Ok(keys.iter().map(|k| format!("r{}", k)).collect()));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(store))
        .with_batch_loader(Arc::new(batch))
        .build()
        .unwrap();

    fetcher.delete(&token, &[4]).await.unwrap();
    fetcher.refresh(&token, &[5, 6]).await.unwrap();
    assert_eq!(fetcher.stats().source_loads, 0);
}

/// 数据源优先回退到缓存时，回退读取同样收到令牌
#[tokio::test]
async fn test_cancellation_token_reaches_source_first_fallback() {
    let token = cancelled_token();

    let mut store = MockStore::new();
    store
        .expect_get()
        .withf(|ctx, key| ctx.is_cancelled() && key == "3")
        .times(1)
        .returning(|_, key| Ok(Entry::new(key, "cached-3".to_string(), None)));
    store
        .expect_multi_get()
        .withf(|ctx, keys| ctx.is_cancelled() && keys.to_vec() == raw_keys(&[3, 9]))
        .times(1)
        .returning(|_, keys| {
            Ok(vec![
                Some(Entry::new(keys[0].as_str(), "cached-3".to_string(), None)),
                None,
            ])
        });

    let mut single = MockSource::new();
    single
        .expect_load()
        .withf(|ctx, key| ctx.is_cancelled() && *key == 3)
        .times(1)
        .returning(|_, _| Err(CacheError::Cancelled));
    let mut batch = MockBatchSource::new();
    batch
        .expect_batch_load()
        .withf(|ctx, keys| ctx.is_cancelled() && keys.to_vec() == vec![3, 9])
        .times(1)
        .returning(|_, _| Err(CacheError::Cancelled));

    let fetcher = FetcherBuilder::<u64, String>::new(Arc::new(store))
        .with_strategy(Strategy::SourceFirst)
        .with_empty_value("-".to_string())
        .with_loader(Arc::new(single))
        .with_batch_loader(Arc::new(batch))
        .build()
        .unwrap();

    assert_eq!(fetcher.get(&token, &3).await.unwrap(), "cached-3");
    assert_eq!(
        fetcher.multi_get(&token, &[3, 9]).await.unwrap(),
        vec!["cached-3", "-"]
    );
}
