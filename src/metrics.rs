//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了获取器的命中/回源计数以及全局指标收集。
//!
//! 全局注册表只在构建获取器时写入；读写路径持有预先注册的计数器句柄，
//! 只做原子递增。

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 单个获取器的计数器
///
/// 命中数与回源数只增不减，并发调用下使用原子操作更新
#[derive(Debug, Default)]
pub struct FetchStats {
    hit: AtomicU64,
    source: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchStatsSnapshot {
    pub hits: u64,
    pub source_loads: u64,
}

impl FetchStats {
    pub fn record_hits(&self, n: u64) {
        if n > 0 {
            self.hit.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn record_source(&self, n: u64) {
        if n > 0 {
            self.source.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn hits(&self) -> u64 {
        self.hit.load(Ordering::Relaxed)
    }

    pub fn source_loads(&self) -> u64 {
        self.source.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            hits: self.hits(),
            source_loads: self.source_loads(),
        }
    }
}

/// 共享的请求计数器句柄
#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    pub fn add(&self, n: u64) {
        if n > 0 {
            self.0.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn incr(&self) {
        self.add(1);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// 累计耗时（纳秒）与次数
#[derive(Debug, Default)]
pub struct DurationStat {
    total_nanos: AtomicU64,
    count: AtomicU64,
}

impl DurationStat {
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_secs(&self) -> f64 {
        self.total_nanos.load(Ordering::Relaxed) as f64 / 1e9
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// 指标注册表
///
/// 用于收集所有获取器的请求结果和耗时
#[derive(Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "fetcher:layer:op:result"
    pub requests_total: DashMap<String, Counter>,
    /// 操作耗时
    /// key: "fetcher:layer:op"
    pub operation_duration: DashMap<String, Arc<DurationStat>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

impl Metrics {
    /// 注册（或取回已注册的）请求计数器
    ///
    /// # 参数
    ///
    /// * `fetcher` - 获取器标签
    /// * `layer` - 访问层（cache/source）
    /// * `op` - 操作类型（get/multi_get/set/delete/refresh/backfill）
    /// * `result` - 操作结果（hit/miss/error/success）
    pub fn counter(&self, fetcher: &str, layer: &str, op: &str, result: &str) -> Counter {
        let key = format!("{}:{}:{}:{}", fetcher, layer, op, result);
        self.requests_total.entry(key).or_default().clone()
    }

    /// 注册（或取回已注册的）耗时统计
    pub fn duration(&self, fetcher: &str, layer: &str, op: &str) -> Arc<DurationStat> {
        let key = format!("{}:{}:{}", fetcher, layer, op);
        self.operation_duration.entry(key).or_default().clone()
    }

    /// 读取某个请求计数，未注册时为0
    pub fn request_count(&self, fetcher: &str, layer: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}:{}", fetcher, layer, op, result);
        self.requests_total
            .get(&key)
            .map(|counter| counter.get())
            .unwrap_or(0)
    }
}

/// 成功/失败计数器对
#[derive(Clone, Debug)]
pub struct OutcomeCounters {
    pub success: Counter,
    pub error: Counter,
}

impl OutcomeCounters {
    fn register(metrics: &Metrics, fetcher: &str, layer: &str, op: &str) -> Self {
        Self {
            success: metrics.counter(fetcher, layer, op, "success"),
            error: metrics.counter(fetcher, layer, op, "error"),
        }
    }

    pub fn record<T, E>(&self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.success.incr(),
            Err(_) => self.error.incr(),
        }
    }
}

/// 单个获取器持有的指标句柄
///
/// 构建获取器时一次性注册，之后只做原子递增。
/// 标签相同的获取器共享同一组计数器
#[derive(Clone, Debug)]
pub struct FetcherMetrics {
    pub cache_get_hit: Counter,
    pub cache_get_miss: Counter,
    pub cache_multi_get_hit: Counter,
    pub cache_multi_get_miss: Counter,
    pub cache_set: OutcomeCounters,
    pub cache_backfill: OutcomeCounters,
    pub cache_delete: OutcomeCounters,
    pub source_get: OutcomeCounters,
    pub source_multi_get: OutcomeCounters,
    pub source_refresh: OutcomeCounters,
    pub source_get_duration: Arc<DurationStat>,
    pub source_multi_get_duration: Arc<DurationStat>,
}

impl FetcherMetrics {
    pub fn register(metrics: &Metrics, fetcher: &str) -> Self {
        Self {
            cache_get_hit: metrics.counter(fetcher, "cache", "get", "hit"),
            cache_get_miss: metrics.counter(fetcher, "cache", "get", "miss"),
            cache_multi_get_hit: metrics.counter(fetcher, "cache", "multi_get", "hit"),
            cache_multi_get_miss: metrics.counter(fetcher, "cache", "multi_get", "miss"),
            cache_set: OutcomeCounters::register(metrics, fetcher, "cache", "set"),
            cache_backfill: OutcomeCounters::register(metrics, fetcher, "cache", "backfill"),
            cache_delete: OutcomeCounters::register(metrics, fetcher, "cache", "delete"),
            source_get: OutcomeCounters::register(metrics, fetcher, "source", "get"),
            source_multi_get: OutcomeCounters::register(metrics, fetcher, "source", "multi_get"),
            source_refresh: OutcomeCounters::register(metrics, fetcher, "source", "refresh"),
            source_get_duration: metrics.duration(fetcher, "source", "get"),
            source_multi_get_duration: metrics.duration(fetcher, "source", "multi_get"),
        }
    }
}

/// 获取指标字符串
///
/// 将全局指标格式化为文本，用于监控系统采集
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let mut output = String::new();
    for item in metrics.requests_total.iter() {
        output.push_str(&format!(
            "fetch_requests_total{{labels=\"{}\"}} {}\n",
            item.key(),
            item.value().get()
        ));
    }
    for item in metrics.operation_duration.iter() {
        // 获取器名称可能包含冒号，从右侧切分
        let mut parts: Vec<&str> = item.key().rsplitn(3, ':').collect();
        parts.reverse();
        if parts.len() == 3 {
            output.push_str(&format!(
                "fetch_operation_duration_seconds_sum{{fetcher=\"{}\", layer=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], item.value().total_secs()
            ));
            output.push_str(&format!(
                "fetch_operation_duration_seconds_count{{fetcher=\"{}\", layer=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], item.value().count()
            ));
        }
    }
    output
}
