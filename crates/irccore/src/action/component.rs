//! 動作元件
//!
//! 元件是從某個型別的值取出另一個值的存取器，例如 `CHANNEL_NAME`
//! 從頻道取出名稱。元件可以串接成 `CHANNEL_NAME.STRING_LENGTH`，
//! 串接時每一段的輸入型別都必須與前一段的輸出型別相符。

use std::fmt;

use super::value::{ActionArgument, ValueType};
use super::ActionError;

/// 內建元件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreActionComponent {
    ServerName,
    ServerNetwork,
    ServerProtocol,
    ServerMyAwayReason,
    ServerMyNickname,
    ChannelName,
    ChannelTopic,
    UserName,
    UserModes,
    UserHost,
    UserComchans,
    QueryNick,
    QueryHost,
    StringString,
    StringLength,
    StringArrayLength,
}

impl CoreActionComponent {
    pub const ALL: [CoreActionComponent; 16] = [
        CoreActionComponent::ServerName,
        CoreActionComponent::ServerNetwork,
        CoreActionComponent::ServerProtocol,
        CoreActionComponent::ServerMyAwayReason,
        CoreActionComponent::ServerMyNickname,
        CoreActionComponent::ChannelName,
        CoreActionComponent::ChannelTopic,
        CoreActionComponent::UserName,
        CoreActionComponent::UserModes,
        CoreActionComponent::UserHost,
        CoreActionComponent::UserComchans,
        CoreActionComponent::QueryNick,
        CoreActionComponent::QueryHost,
        CoreActionComponent::StringString,
        CoreActionComponent::StringLength,
        CoreActionComponent::StringArrayLength,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CoreActionComponent::ServerName => "SERVER_NAME",
            CoreActionComponent::ServerNetwork => "SERVER_NETWORK",
            CoreActionComponent::ServerProtocol => "SERVER_PROTOCOL",
            CoreActionComponent::ServerMyAwayReason => "SERVER_MYAWAYREASON",
            CoreActionComponent::ServerMyNickname => "SERVER_MYNICKNAME",
            CoreActionComponent::ChannelName => "CHANNEL_NAME",
            CoreActionComponent::ChannelTopic => "CHANNEL_TOPIC",
            CoreActionComponent::UserName => "USER_NAME",
            CoreActionComponent::UserModes => "USER_MODES",
            CoreActionComponent::UserHost => "USER_HOST",
            CoreActionComponent::UserComchans => "USER_COMCHANS",
            CoreActionComponent::QueryNick => "QUERY_NICK",
            CoreActionComponent::QueryHost => "QUERY_HOST",
            CoreActionComponent::StringString => "STRING_STRING",
            CoreActionComponent::StringLength => "STRING_LENGTH",
            CoreActionComponent::StringArrayLength => "STRINGARRAY_LENGTH",
        }
    }

    /// 以名稱查詢（區分大小寫）
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// 說明文字
    pub fn description(self) -> &'static str {
        match self {
            CoreActionComponent::ServerName => "name",
            CoreActionComponent::ServerNetwork => "network",
            CoreActionComponent::ServerProtocol => "protocol",
            CoreActionComponent::ServerMyAwayReason => "away reason",
            CoreActionComponent::ServerMyNickname => "nickname",
            CoreActionComponent::ChannelName => "name",
            CoreActionComponent::ChannelTopic => "topic",
            CoreActionComponent::UserName => "nickname",
            CoreActionComponent::UserModes => "modes",
            CoreActionComponent::UserHost => "host",
            CoreActionComponent::UserComchans => "number of common channels",
            CoreActionComponent::QueryNick => "nickname",
            CoreActionComponent::QueryHost => "host",
            CoreActionComponent::StringString => "content",
            CoreActionComponent::StringLength => "length",
            CoreActionComponent::StringArrayLength => "size",
        }
    }

    /// 接受的輸入型別
    pub fn applies_to(self) -> ValueType {
        match self {
            CoreActionComponent::ServerName
            | CoreActionComponent::ServerNetwork
            | CoreActionComponent::ServerProtocol
            | CoreActionComponent::ServerMyAwayReason
            | CoreActionComponent::ServerMyNickname => ValueType::Server,
            CoreActionComponent::ChannelName | CoreActionComponent::ChannelTopic => {
                ValueType::Channel
            }
            CoreActionComponent::UserName
            | CoreActionComponent::UserModes
            | CoreActionComponent::UserHost
            | CoreActionComponent::UserComchans => ValueType::User,
            CoreActionComponent::QueryNick | CoreActionComponent::QueryHost => ValueType::Query,
            CoreActionComponent::StringString | CoreActionComponent::StringLength => {
                ValueType::String
            }
            CoreActionComponent::StringArrayLength => ValueType::StringArray,
        }
    }

    /// 輸出型別
    pub fn value_type(self) -> ValueType {
        match self {
            CoreActionComponent::UserComchans
            | CoreActionComponent::StringLength
            | CoreActionComponent::StringArrayLength => ValueType::Int,
            _ => ValueType::String,
        }
    }

    /// 是否需要伺服器處於連線狀態
    pub fn requires_connection(self) -> bool {
        matches!(
            self,
            CoreActionComponent::ServerName
                | CoreActionComponent::ServerNetwork
                | CoreActionComponent::ServerMyNickname
        )
    }

    /// 取值；輸入型別不符時回傳 None
    pub fn get(self, arg: &ActionArgument) -> Option<ActionArgument> {
        use ActionArgument as A;

        let value = match (self, arg) {
            (CoreActionComponent::ServerName, A::Server(s)) => A::String(s.name()),
            (CoreActionComponent::ServerNetwork, A::Server(s)) => {
                A::String(s.network().unwrap_or_default())
            }
            (CoreActionComponent::ServerProtocol, A::Server(s)) => A::String(s.protocol()),
            (CoreActionComponent::ServerMyAwayReason, A::Server(s)) => {
                A::String(s.away_message().unwrap_or_default())
            }
            (CoreActionComponent::ServerMyNickname, A::Server(s)) => {
                A::String(s.nickname().unwrap_or_default())
            }
            (CoreActionComponent::ChannelName, A::Channel(c)) => A::String(c.name()),
            (CoreActionComponent::ChannelTopic, A::Channel(c)) => {
                A::String(c.topic().unwrap_or_default())
            }
            (CoreActionComponent::UserName, A::User(u)) => A::String(u.nickname()),
            (CoreActionComponent::UserModes, A::User(u)) => A::String(u.modes()),
            (CoreActionComponent::UserHost, A::User(u)) => A::String(u.host().unwrap_or_default()),
            (CoreActionComponent::UserComchans, A::User(u)) => A::Int(u.channel_count() as i64),
            (CoreActionComponent::QueryNick, A::Query(q)) => A::String(q.nickname()),
            (CoreActionComponent::QueryHost, A::Query(q)) => A::String(q.host().unwrap_or_default()),
            (CoreActionComponent::StringString, A::String(s)) => A::String(s.clone()),
            (CoreActionComponent::StringLength, A::String(s)) => A::Int(s.chars().count() as i64),
            (CoreActionComponent::StringArrayLength, A::StringArray(list)) => A::Int(list.len() as i64),
            _ => return None,
        };
        Some(value)
    }
}

impl fmt::Display for CoreActionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 元件串接（至少一段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentChain {
    components: Vec<CoreActionComponent>,
}

impl ComponentChain {
    /// 解析以 `.` 分隔的元件名稱，並逐段檢查型別
    pub fn parse(start: ValueType, text: &str) -> Result<Self, ActionError> {
        let mut components = Vec::new();
        let mut current = start;

        for part in text.split('.') {
            let component = CoreActionComponent::from_name(part)
                .ok_or_else(|| ActionError::UnknownComponent(part.to_string()))?;
            if component.applies_to() != current {
                return Err(ActionError::ComponentMismatch {
                    component: part.to_string(),
                    expected: current,
                });
            }
            current = component.value_type();
            components.push(component);
        }

        Ok(Self { components })
    }

    pub fn components(&self) -> &[CoreActionComponent] {
        &self.components
    }

    /// 串接的輸入型別
    pub fn applies_to(&self) -> ValueType {
        self.components
            .first()
            .map(|c| c.applies_to())
            .unwrap_or(ValueType::String)
    }

    /// 串接的最終輸出型別
    pub fn value_type(&self) -> ValueType {
        self.components
            .last()
            .map(|c| c.value_type())
            .unwrap_or(ValueType::String)
    }

    /// 任一段需要連線
    pub fn requires_connection(&self) -> bool {
        self.components.iter().any(|c| c.requires_connection())
    }

    /// 依序取值
    pub fn get(&self, arg: &ActionArgument) -> Option<ActionArgument> {
        let mut iter = self.components.iter();
        let first = iter.next()?.get(arg)?;
        iter.try_fold(first, |value, component| component.get(&value))
    }
}

impl fmt::Display for ComponentChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.components.iter().map(|c| c.name()).collect();
        f.write_str(&names.join("."))
    }
}
