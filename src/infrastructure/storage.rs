//! 持久化键值存储 - 基础设施层
//!
//! 相当于浏览器的 localStorage：同步读写，按组原子写入/删除

use crate::error::{AppError, AppResult, StorageError};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// 键值存储能力
///
/// 职责：
/// - 只认识字符串键和字符串值
/// - 一组键要么全部写入，要么全部不写
/// - 不认识 Session / User
pub trait KeyValueStore: Send + Sync {
    /// 读取单个键
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 原子写入一组键值
    fn set_many(&self, entries: &[(&str, &str)]) -> AppResult<()>;

    /// 原子删除一组键
    fn remove_many(&self, keys: &[&str]) -> AppResult<()>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用初始内容创建（测试中模拟“上次留下的存储”）
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> AppResult<()> {
        let mut map = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        let mut map = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        for k in keys {
            map.remove(*k);
        }
        Ok(())
    }
}

/// 文件存储
///
/// 整个存储是一个 JSON 对象文件。每次写入先写临时文件、fsync，再 rename 覆盖，
/// 因此进程在写入中途退出也不会留下只写了一半的键组。
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> AppResult<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            StorageError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// 读不出来的 IO 错误照常返回，只有内容损坏时才当作空对象
    fn read_map_or_reset(&self) -> AppResult<BTreeMap<String, String>> {
        match self.read_map() {
            Err(AppError::Storage(StorageError::Corrupt { message, .. })) => {
                warn!("⚠️ 存储文件已损坏，将被覆盖: {} ({})", self.path.display(), message);
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let json = serde_json::to_string_pretty(map).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path).map_err(|e| self.io_error(e))?;
            file.write_all(json.as_bytes()).map_err(|e| self.io_error(e))?;
            file.sync_all().map_err(|e| self.io_error(e))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!("存储已写入: {} ({} 个键)", self.path.display(), map.len());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> AppError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
        .into()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> AppResult<()> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map_or_reset()?;
        for (k, v) in entries {
            map.insert(k.to_string(), v.to_string());
        }
        self.write_map(&map)
    }

    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = match self.read_map() {
            Ok(map) => map,
            // 损坏的文件整体重置
            Err(AppError::Storage(StorageError::Corrupt { .. })) => {
                return self.write_map(&BTreeMap::new())
            }
            Err(e) => return Err(e),
        };
        let before = map.len();
        for k in keys {
            map.remove(*k);
        }
        if before == map.len() {
            return Ok(());
        }
        self.write_map(&map)
    }
}
