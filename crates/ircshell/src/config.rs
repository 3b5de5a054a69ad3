//! 設定檔
//!
//! 設定存放在 `<設定目錄>/ircshell/config.json`，`/set` 的選項存放在 `options.json`，
//! 動作存放在 `<設定目錄>/ircshell/actions/<群組>/<名稱>.json`。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// 殼層設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// 模擬連線的伺服器名稱
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// 連線後自動加入的頻道
    #[serde(default)]
    pub channels: Vec<String>,
    /// 核心設定（網域 -> 鍵 -> 值），例如 `general.commandchar`
    #[serde(default)]
    pub options: HashMap<String, HashMap<String, String>>,
}

fn default_server() -> String {
    "irc.example.net".to_string()
}

fn default_network() -> String {
    "ExampleNet".to_string()
}

fn default_nickname() -> String {
    "ircshell".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            network: default_network(),
            nickname: default_nickname(),
            channels: Vec::new(),
            options: HashMap::new(),
        }
    }
}

impl ShellConfig {
    pub fn config_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// 核心選項（`/set` 的內容）的儲存位置
    pub fn options_path() -> PathBuf {
        config_dir().join("options.json")
    }

    /// 動作目錄
    pub fn actions_dir() -> PathBuf {
        config_dir().join("actions")
    }

    /// 載入設定，檔案不存在或格式錯誤時使用預設值
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path).map(|content| serde_json::from_str(&content)) {
            Ok(Ok(config)) => config,
            Ok(Err(e)) => {
                warn!("設定檔格式錯誤，使用預設值: {}", e);
                Self::default()
            }
            Err(e) => {
                warn!("無法讀取設定檔，使用預設值: {}", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }
}

/// 設定目錄
pub fn config_dir() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("ircshell")
    } else {
        PathBuf::from(".")
    }
}
