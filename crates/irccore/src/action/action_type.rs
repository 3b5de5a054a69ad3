//! 動作觸發類型

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::ValueType;

/// 內建觸發類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoreActionType {
    ServerConnected,
    ServerDisconnected,
    ServerAway,
    ServerBack,
    ChannelMessage,
    ChannelAction,
    ChannelJoin,
    ChannelPart,
    QueryMessage,
    UnknownCommand,
}

impl CoreActionType {
    pub const ALL: [CoreActionType; 10] = [
        CoreActionType::ServerConnected,
        CoreActionType::ServerDisconnected,
        CoreActionType::ServerAway,
        CoreActionType::ServerBack,
        CoreActionType::ChannelMessage,
        CoreActionType::ChannelAction,
        CoreActionType::ChannelJoin,
        CoreActionType::ChannelPart,
        CoreActionType::QueryMessage,
        CoreActionType::UnknownCommand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CoreActionType::ServerConnected => "SERVER_CONNECTED",
            CoreActionType::ServerDisconnected => "SERVER_DISCONNECTED",
            CoreActionType::ServerAway => "SERVER_AWAY",
            CoreActionType::ServerBack => "SERVER_BACK",
            CoreActionType::ChannelMessage => "CHANNEL_MESSAGE",
            CoreActionType::ChannelAction => "CHANNEL_ACTION",
            CoreActionType::ChannelJoin => "CHANNEL_JOIN",
            CoreActionType::ChannelPart => "CHANNEL_PART",
            CoreActionType::QueryMessage => "QUERY_MESSAGE",
            CoreActionType::UnknownCommand => "UNKNOWN_COMMAND",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// 參數型別
    pub fn arg_types(self) -> &'static [ValueType] {
        use ValueType as V;
        match self {
            CoreActionType::ServerConnected
            | CoreActionType::ServerDisconnected
            | CoreActionType::ServerBack => &[V::Server],
            CoreActionType::ServerAway => &[V::Server, V::String],
            CoreActionType::ChannelMessage | CoreActionType::ChannelAction => {
                &[V::Channel, V::User, V::String]
            }
            CoreActionType::ChannelJoin => &[V::Channel, V::User],
            CoreActionType::ChannelPart => &[V::Channel, V::User, V::String],
            CoreActionType::QueryMessage => &[V::Query, V::String],
            CoreActionType::UnknownCommand => &[V::String, V::StringArray],
        }
    }

    /// 參數名稱（與 `arg_types` 一一對應）
    pub fn arg_names(self) -> &'static [&'static str] {
        match self {
            CoreActionType::ServerConnected
            | CoreActionType::ServerDisconnected
            | CoreActionType::ServerBack => &["server"],
            CoreActionType::ServerAway => &["server", "reason"],
            CoreActionType::ChannelMessage | CoreActionType::ChannelAction => {
                &["channel", "user", "message"]
            }
            CoreActionType::ChannelJoin => &["channel", "user"],
            CoreActionType::ChannelPart => &["channel", "user", "reason"],
            CoreActionType::QueryMessage => &["query", "message"],
            CoreActionType::UnknownCommand => &["command", "arguments"],
        }
    }

    /// 參數個數
    pub fn arity(self) -> usize {
        self.arg_types().len()
    }

    /// `$N` 取字時使用的參數（最後一個字串參數）
    pub fn message_argument(self) -> Option<usize> {
        self.arg_types().iter().rposition(|t| *t == ValueType::String)
    }

    /// 說明文字
    pub fn description(self) -> &'static str {
        match self {
            CoreActionType::ServerConnected => "connected to a server",
            CoreActionType::ServerDisconnected => "disconnected from a server",
            CoreActionType::ServerAway => "marked as away",
            CoreActionType::ServerBack => "no longer away",
            CoreActionType::ChannelMessage => "channel message received",
            CoreActionType::ChannelAction => "channel action received",
            CoreActionType::ChannelJoin => "someone joined a channel",
            CoreActionType::ChannelPart => "someone left a channel",
            CoreActionType::QueryMessage => "private message received",
            CoreActionType::UnknownCommand => "unknown command entered",
        }
    }
}

impl fmt::Display for CoreActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for t in CoreActionType::ALL {
            assert_eq!(CoreActionType::from_name(t.name()), Some(t));
            assert_eq!(t.arg_types().len(), t.arg_names().len());
        }
        assert_eq!(CoreActionType::from_name("CHANNEL_FOO"), None);
    }

    #[test]
    fn test_message_argument() {
        assert_eq!(CoreActionType::ChannelMessage.message_argument(), Some(2));
        assert_eq!(CoreActionType::QueryMessage.message_argument(), Some(1));
        assert_eq!(CoreActionType::UnknownCommand.message_argument(), Some(0));
        assert_eq!(CoreActionType::ServerConnected.message_argument(), None);
    }

    #[test]
    fn test_serde_names_match() {
        let json = serde_json::to_string(&CoreActionType::ChannelMessage).unwrap();
        assert_eq!(json, "\"CHANNEL_MESSAGE\"");
        let parsed: CoreActionType = serde_json::from_str("\"UNKNOWN_COMMAND\"").unwrap();
        assert_eq!(parsed, CoreActionType::UnknownCommand);
    }
}
