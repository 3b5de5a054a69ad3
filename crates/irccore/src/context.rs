//! 連線與視窗上下文介面
//!
//! 核心不負責顯示與網路，只透過這些窄介面與外部協作：
//! - `Window`: 輸出一行訊息到視窗，並提供該視窗的指令解析器
//! - `Server` / `Channel` / `Query`: 指令執行與變數替換所需的連線資訊
//! - `ChannelUser`: 頻道成員資訊

use std::sync::Arc;

use crate::command::CommandParser;

/// 可接收輸出的視窗
pub trait Window: Send + Sync {
    /// 視窗名稱（伺服器名、頻道名或對象暱稱）
    fn name(&self) -> String;

    /// 以指定格式類型輸出一行（由 UI 層負責格式化）
    fn add_line(&self, kind: &str, args: &[String]);

    /// 此視窗的指令解析器（沒有輸入框的視窗回傳 None）
    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        None
    }
}

/// 伺服器連線
pub trait Server: Window {
    /// 轉型為 `Window`
    fn as_window(&self) -> &dyn Window;

    /// 是否已連線
    fn is_connected(&self) -> bool;

    /// 網路名稱
    fn network(&self) -> Option<String>;

    /// 協定名稱
    fn protocol(&self) -> String {
        "irc".to_string()
    }

    /// 目前的離開訊息
    fn away_message(&self) -> Option<String>;

    /// 自己的暱稱
    fn nickname(&self) -> Option<String>;

    /// 送出原始協定行
    fn send_line(&self, line: &str);

    /// 是否為合法頻道名稱
    fn is_valid_channel_name(&self, name: &str) -> bool {
        name.starts_with('#') || name.starts_with('&')
    }

    /// 取得已加入的頻道
    fn channel(&self, name: &str) -> Option<Arc<dyn Channel>>;
}

/// 頻道
pub trait Channel: Window {
    /// 轉型為 `Window`
    fn as_window(&self) -> &dyn Window;

    /// 所屬連線
    fn connection(&self) -> Option<Arc<dyn Server>>;

    /// 頻道主題
    fn topic(&self) -> Option<String> {
        None
    }

    /// 送出一般訊息
    fn send_message(&self, text: &str);

    /// 送出動作訊息（/me）
    fn send_action(&self, text: &str);
}

/// 私人對話
pub trait Query: Window {
    /// 轉型為 `Window`
    fn as_window(&self) -> &dyn Window;

    /// 所屬連線
    fn connection(&self) -> Option<Arc<dyn Server>>;

    /// 對象暱稱
    fn nickname(&self) -> String;

    /// 對象主機
    fn host(&self) -> Option<String> {
        None
    }

    /// 送出一般訊息
    fn send_message(&self, text: &str);

    /// 送出動作訊息（/me）
    fn send_action(&self, text: &str);
}

/// 頻道成員
pub trait ChannelUser: Send + Sync {
    fn nickname(&self) -> String;

    /// 頻道模式字串（如 `@`、`+`）
    fn modes(&self) -> String {
        String::new()
    }

    fn host(&self) -> Option<String> {
        None
    }

    /// 共同頻道數
    fn channel_count(&self) -> usize {
        0
    }
}

/// 聊天目標（頻道或私人對話）
#[derive(Clone, Copy)]
pub enum ChatTarget<'a> {
    Channel(&'a Arc<dyn Channel>),
    Query(&'a Arc<dyn Query>),
}

impl ChatTarget<'_> {
    /// 聊天視窗
    pub fn window(&self) -> &dyn Window {
        match self {
            ChatTarget::Channel(c) => c.as_window(),
            ChatTarget::Query(q) => q.as_window(),
        }
    }

    /// 送出一般訊息
    pub fn send_message(&self, text: &str) {
        match self {
            ChatTarget::Channel(c) => c.send_message(text),
            ChatTarget::Query(q) => q.send_message(text),
        }
    }

    /// 送出動作訊息
    pub fn send_action(&self, text: &str) {
        match self {
            ChatTarget::Channel(c) => c.send_action(text),
            ChatTarget::Query(q) => q.send_action(text),
        }
    }
}
