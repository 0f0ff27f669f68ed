//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块负责把调用方的键映射为缓存存储使用的字符串键。

use std::fmt;
use std::sync::Arc;

/// 键投影函数
pub type KeyFn<K> = Arc<dyn Fn(&K) -> String + Send + Sync>;

/// 缓存键构建器
///
/// 同一配置下同一个键总是得到同一个缓存键；
/// 命名空间非空时缓存键为 `namespace:projection`
pub struct KeyBuilder<K> {
    namespace: String,
    gen_key: KeyFn<K>,
}

impl<K> Clone for KeyBuilder<K> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            gen_key: Arc::clone(&self.gen_key),
        }
    }
}

impl<K> fmt::Debug for KeyBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBuilder")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl<K> KeyBuilder<K> {
    pub fn new(namespace: impl Into<String>, gen_key: KeyFn<K>) -> Self {
        Self {
            namespace: namespace.into(),
            gen_key,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 构建单个缓存键
    pub fn build_key(&self, key: &K) -> String {
        let projected = (self.gen_key)(key);
        if self.namespace.is_empty() {
            projected
        } else {
            format!("{}:{}", self.namespace, projected)
        }
    }

    /// 按位置构建缓存键，保持顺序和重复项
    pub fn build_keys(&self, keys: &[K]) -> Vec<String> {
        keys.iter().map(|k| self.build_key(k)).collect()
    }
}

impl<K: fmt::Display + 'static> KeyBuilder<K> {
    /// 使用键的文本表示作为默认投影
    pub fn display(namespace: impl Into<String>) -> Self {
        Self::new(namespace, Arc::new(|k: &K| k.to_string()))
    }
}
