//! 設定存取模組
//!
//! 核心只透過 `ConfigProvider` 讀取設定：
//! - 指令字元 / 靜音字元（Tokenizer 使用）
//! - `actions` 網域的變數（ActionSubstitutor 使用）
//! - 指令歷史長度、動作總開關等一般選項

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

/// 預設指令字元
pub const DEFAULT_COMMAND_CHAR: char = '/';
/// 預設靜音字元
pub const DEFAULT_SILENCE_CHAR: char = '.';

/// 設定讀寫錯誤
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO 錯誤: {0}")]
    Io(#[from] io::Error),

    #[error("設定格式錯誤: {0}")]
    Json(#[from] serde_json::Error),
}

/// 設定來源
///
/// 所有值都在讀取當下取得，因此實作可以隨時熱更新。
pub trait ConfigProvider: Send + Sync {
    /// 讀取單一選項
    fn option(&self, domain: &str, key: &str) -> Option<String>;

    /// 讀取整個網域的選項
    fn options(&self, domain: &str) -> HashMap<String, String>;

    /// 指令字元（`general.commandchar` 的第一個字元）
    fn command_char(&self) -> char {
        self.option("general", "commandchar")
            .and_then(|v| v.chars().next())
            .unwrap_or(DEFAULT_COMMAND_CHAR)
    }

    /// 靜音字元（`general.silencechar` 的第一個字元）
    fn silence_char(&self) -> char {
        self.option("general", "silencechar")
            .and_then(|v| v.chars().next())
            .unwrap_or(DEFAULT_SILENCE_CHAR)
    }

    /// 選項是否存在
    fn has_option(&self, domain: &str, key: &str) -> bool {
        self.option(domain, key).is_some()
    }

    /// 讀取整數選項，無法解析時使用預設值
    fn option_int(&self, domain: &str, key: &str, default: i64) -> i64 {
        self.option(domain, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// 讀取布林選項，無法解析時使用預設值
    fn option_bool(&self, domain: &str, key: &str, default: bool) -> bool {
        match self.option(domain, key).as_deref().map(str::trim) {
            Some("true") | Some("1") | Some("yes") | Some("on") => true,
            Some("false") | Some("0") | Some("no") | Some("off") => false,
            _ => default,
        }
    }
}

/// 記憶體中的設定（網域 -> 鍵 -> 值）
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigStore {
    domains: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl ConfigStore {
    /// 建立空的設定
    pub fn new() -> Self {
        Self::default()
    }

    /// 從既有的網域表建立
    pub fn from_domains(domains: HashMap<String, HashMap<String, String>>) -> Self {
        Self {
            domains: RwLock::new(domains),
        }
    }

    /// 從 JSON 檔案載入
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 儲存為 JSON 檔案
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 設定選項（下一次讀取立即生效）
    pub fn set_option(&self, domain: &str, key: &str, value: impl Into<String>) {
        let mut domains = self.domains.write().unwrap_or_else(|e| e.into_inner());
        domains
            .entry(domain.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// 移除選項
    pub fn unset_option(&self, domain: &str, key: &str) -> Option<String> {
        let mut domains = self.domains.write().unwrap_or_else(|e| e.into_inner());
        domains.get_mut(domain)?.remove(key)
    }

    /// 以另一份設定覆蓋（用於重新載入）
    pub fn replace_all(&self, other: ConfigStore) {
        let incoming = other.domains.into_inner().unwrap_or_else(|e| e.into_inner());
        *self.domains.write().unwrap_or_else(|e| e.into_inner()) = incoming;
    }
}

impl ConfigProvider for ConfigStore {
    fn option(&self, domain: &str, key: &str) -> Option<String> {
        let domains = self.domains.read().unwrap_or_else(|e| e.into_inner());
        domains.get(domain)?.get(key).cloned()
    }

    fn options(&self, domain: &str) -> HashMap<String, String> {
        let domains = self.domains.read().unwrap_or_else(|e| e.into_inner());
        domains.get(domain).cloned().unwrap_or_default()
    }
}
