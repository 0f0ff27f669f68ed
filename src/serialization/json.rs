//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 基于serde_json，启用 `flate2` 特性时可选gzip压缩
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    /// 是否启用压缩
    compress: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的JSON序列化器
    pub fn with_compression() -> Self {
        Self { compress: true }
    }

    pub fn is_compressed(&self) -> bool {
        self.compress
    }
}

fn codec_error(e: impl std::fmt::Display) -> CacheError {
    CacheError::Serialization(e.to_string())
}

#[cfg(feature = "flate2")]
fn gzip(data: Vec<u8>) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&data).map_err(codec_error)?;
    encoder.finish().map_err(codec_error)
}

#[cfg(not(feature = "flate2"))]
fn gzip(data: Vec<u8>) -> Result<Vec<u8>> {
    Ok(data)
}

#[cfg(feature = "flate2")]
fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(codec_error)?;
    Ok(decoded)
}

#[cfg(not(feature = "flate2"))]
fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    Ok(data.to_vec())
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let json_bytes = serde_json::to_vec(value).map_err(codec_error)?;
        if self.compress {
            gzip(json_bytes)
        } else {
            Ok(json_bytes)
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        if self.compress {
            let decoded = gunzip(data)?;
            serde_json::from_slice(&decoded).map_err(codec_error)
        } else {
            serde_json::from_slice(data).map_err(codec_error)
        }
    }
}
