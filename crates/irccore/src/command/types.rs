//! 指令類型、指令資訊與指令行為

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::CommandArguments;
use crate::context::{Channel, ChatTarget, Query, Server, Window};

/// 指令類型：決定指令可在哪些上下文中執行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandType {
    Global,
    Server,
    Chat,
    Channel,
    Query,
}

impl CommandType {
    /// 所有類型
    pub const ALL: [CommandType; 5] = [
        CommandType::Global,
        CommandType::Server,
        CommandType::Chat,
        CommandType::Channel,
        CommandType::Query,
    ];

    /// 展開後的組成類型（固定表，不遞迴）
    ///
    /// CHANNEL 與 QUERY 解析器同時接受 CHAT 指令。
    pub fn component_types(self) -> &'static [CommandType] {
        match self {
            CommandType::Global => &[CommandType::Global],
            CommandType::Server => &[CommandType::Server],
            CommandType::Chat => &[CommandType::Chat],
            CommandType::Channel => &[CommandType::Channel, CommandType::Chat],
            CommandType::Query => &[CommandType::Query, CommandType::Chat],
        }
    }

    /// 以 `filter` 篩選時此類型是否符合
    ///
    /// 以 CHAT 篩選時，CHANNEL 與 QUERY 指令也會被找到。
    pub fn matches(self, filter: CommandType) -> bool {
        self == filter
            || (filter == CommandType::Chat
                && matches!(self, CommandType::Channel | CommandType::Query))
    }

    /// 類型名稱
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Global => "GLOBAL",
            CommandType::Server => "SERVER",
            CommandType::Chat => "CHAT",
            CommandType::Channel => "CHANNEL",
            CommandType::Query => "QUERY",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 指令參數個數
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    /// 固定個數
    Fixed(usize),
    /// 不定個數（只以名稱識別）
    Variadic,
}

/// 指令資訊
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub arity: Arity,
    pub help: String,
    /// 是否顯示在 /help 列表中
    pub show_in_help: bool,
    pub command_type: CommandType,
}

impl CommandInfo {
    /// 建立不定參數的指令資訊
    pub fn new(name: impl Into<String>, command_type: CommandType) -> Self {
        Self {
            name: name.into(),
            arity: Arity::Variadic,
            help: String::new(),
            show_in_help: true,
            command_type,
        }
    }

    /// 設定固定參數個數
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Arity::Fixed(arity);
        self
    }

    /// 設定說明文字
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// 不顯示在說明列表中
    pub fn hidden(mut self) -> Self {
        self.show_in_help = false;
        self
    }

    /// 是否為不定參數指令
    pub fn is_polyadic(&self) -> bool {
        self.arity == Arity::Variadic
    }

    /// 指令簽章：固定參數為 `name/arity`，不定參數為 `name`（皆為小寫）
    pub fn signature(&self) -> String {
        signature(&self.name, self.arity)
    }
}

/// 以名稱與參數個數組成簽章
pub fn signature(name: &str, arity: Arity) -> String {
    match arity {
        Arity::Fixed(n) => format!("{}/{}", name.to_lowercase(), n),
        Arity::Variadic => name.to_lowercase(),
    }
}

/// 全域指令
pub trait GlobalCommand: Send + Sync {
    fn execute(&self, origin: &dyn Window, silent: bool, args: &CommandArguments);
}

/// 伺服器指令
pub trait ServerCommand: Send + Sync {
    fn execute(
        &self,
        origin: &dyn Window,
        server: &Arc<dyn Server>,
        silent: bool,
        args: &CommandArguments,
    );
}

/// 頻道指令
pub trait ChannelCommand: Send + Sync {
    fn execute(
        &self,
        origin: &dyn Window,
        server: &Arc<dyn Server>,
        channel: &Arc<dyn Channel>,
        silent: bool,
        args: &CommandArguments,
    );
}

/// 私人對話指令
pub trait QueryCommand: Send + Sync {
    fn execute(
        &self,
        origin: &dyn Window,
        server: &Arc<dyn Server>,
        query: &Arc<dyn Query>,
        silent: bool,
        args: &CommandArguments,
    );
}

/// 聊天指令（頻道與私人對話皆可）
pub trait ChatCommand: Send + Sync {
    fn execute(
        &self,
        origin: &dyn Window,
        server: &Arc<dyn Server>,
        target: ChatTarget<'_>,
        silent: bool,
        args: &CommandArguments,
    );
}

/// 指令行為：依上下文區分的封閉集合
#[derive(Clone)]
pub enum Command {
    Global(Arc<dyn GlobalCommand>),
    Server(Arc<dyn ServerCommand>),
    Chat(Arc<dyn ChatCommand>),
    Channel(Arc<dyn ChannelCommand>),
    Query(Arc<dyn QueryCommand>),
}

impl Command {
    /// 此行為對應的指令類型
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Global(_) => CommandType::Global,
            Command::Server(_) => CommandType::Server,
            Command::Chat(_) => CommandType::Chat,
            Command::Channel(_) => CommandType::Channel,
            Command::Query(_) => CommandType::Query,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command::{}", self.command_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_types() {
        assert_eq!(
            CommandType::Channel.component_types(),
            &[CommandType::Channel, CommandType::Chat]
        );
        assert_eq!(
            CommandType::Query.component_types(),
            &[CommandType::Query, CommandType::Chat]
        );
        assert_eq!(CommandType::Server.component_types(), &[CommandType::Server]);
    }

    #[test]
    fn test_chat_filter_matches_channel_and_query() {
        assert!(CommandType::Channel.matches(CommandType::Chat));
        assert!(CommandType::Query.matches(CommandType::Chat));
        assert!(CommandType::Chat.matches(CommandType::Chat));
        assert!(!CommandType::Server.matches(CommandType::Chat));
        assert!(!CommandType::Chat.matches(CommandType::Channel));
    }

    #[test]
    fn test_signature() {
        let fixed = CommandInfo::new("Kick", CommandType::Channel).with_arity(2);
        assert_eq!(fixed.signature(), "kick/2");
        assert!(!fixed.is_polyadic());

        let poly = CommandInfo::new("Away", CommandType::Server);
        assert_eq!(poly.signature(), "away");
        assert!(poly.is_polyadic());
    }
}
