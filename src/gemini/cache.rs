//! 説明結果キャッシュモジュール
//!
//! 画像URLまたは画像バイト列のSHA-256をキーに説明結果を保存し、
//! `--use-cache` 指定時に同じ画像の再説明をスキップする。

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;

const CACHE_FILE_NAME: &str = ".describe-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionCache {
    /// バージョン（互換性チェック用）
    version: u32,
    /// ハッシュ → 説明結果
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 元画像（URLまたはパス）
    pub source: String,
    pub model: String,
    pub described_at: String,
    pub description: Value,
}

impl DescriptionCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// 読み込み（存在しない・壊れている・バージョン違いは空で開始）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        let Ok(file) = File::open(&cache_path) else {
            return Self::default();
        };

        match serde_json::from_reader::<_, DescriptionCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                warn!("キャッシュバージョン不一致、再生成します: {}", cache_path.display());
                Self::default()
            }
            Err(e) => {
                warn!("キャッシュを読み込めません（{}）: {}", e, cache_path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        std::fs::create_dir_all(folder)?;
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（削除した場合は `true`）
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, hash: &str) -> Option<&Value> {
        self.entries.get(hash).map(|e| &e.description)
    }

    pub fn insert(&mut self, hash: String, source: &str, model: &str, now: &str, description: Value) {
        self.entries.insert(
            hash,
            CacheEntry {
                source: source.to_string(),
                model: model.to_string(),
                described_at: now.to_string(),
                description,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DescriptionCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// キャッシュキー: URLは文字列、ローカルファイルは内容のSHA-256
pub fn cache_key(source: &str, bytes: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    match bytes {
        Some(bytes) if !is_url(source) => hasher.update(bytes),
        _ => hasher.update(source.as_bytes()),
    }
    hex::encode(hasher.finalize())
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
