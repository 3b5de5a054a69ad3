//! 動作參數值

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::{Channel, ChannelUser, Query, Server, Window};

/// 參數值的型別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Bool,
    StringArray,
    Server,
    Channel,
    Query,
    User,
}

/// 觸發動作時傳入的參數
#[derive(Clone)]
pub enum ActionArgument {
    String(String),
    Int(i64),
    Bool(bool),
    StringArray(Vec<String>),
    Server(Arc<dyn Server>),
    Channel(Arc<dyn Channel>),
    Query(Arc<dyn Query>),
    User(Arc<dyn ChannelUser>),
}

impl ActionArgument {
    pub fn value_type(&self) -> ValueType {
        match self {
            ActionArgument::String(_) => ValueType::String,
            ActionArgument::Int(_) => ValueType::Int,
            ActionArgument::Bool(_) => ValueType::Bool,
            ActionArgument::StringArray(_) => ValueType::StringArray,
            ActionArgument::Server(_) => ValueType::Server,
            ActionArgument::Channel(_) => ValueType::Channel,
            ActionArgument::Query(_) => ValueType::Query,
            ActionArgument::User(_) => ValueType::User,
        }
    }

    /// 參數所代表的視窗（伺服器、頻道或私人對話）
    pub fn window(&self) -> Option<&dyn Window> {
        match self {
            ActionArgument::Server(s) => Some(s.as_window()),
            ActionArgument::Channel(c) => Some(c.as_window()),
            ActionArgument::Query(q) => Some(q.as_window()),
            _ => None,
        }
    }

    /// 參數所屬的伺服器連線
    pub fn server(&self) -> Option<Arc<dyn Server>> {
        match self {
            ActionArgument::Server(s) => Some(Arc::clone(s)),
            ActionArgument::Channel(c) => c.connection(),
            ActionArgument::Query(q) => q.connection(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ActionArgument::String(s) => Some(s),
            _ => None,
        }
    }
}

/// 以文字呈現（變數替換與比較時使用）
impl fmt::Display for ActionArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionArgument::String(s) => f.write_str(s),
            ActionArgument::Int(n) => write!(f, "{}", n),
            ActionArgument::Bool(b) => write!(f, "{}", b),
            ActionArgument::StringArray(list) => f.write_str(&list.join(" ")),
            ActionArgument::Server(s) => f.write_str(&s.name()),
            ActionArgument::Channel(c) => f.write_str(&c.name()),
            ActionArgument::Query(q) => f.write_str(&q.name()),
            ActionArgument::User(u) => f.write_str(&u.nickname()),
        }
    }
}

impl fmt::Debug for ActionArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionArgument::String(s) => write!(f, "String({:?})", s),
            ActionArgument::Int(n) => write!(f, "Int({})", n),
            ActionArgument::Bool(b) => write!(f, "Bool({})", b),
            ActionArgument::StringArray(list) => write!(f, "StringArray({:?})", list),
            other => write!(f, "{:?}({})", other.value_type(), other),
        }
    }
}

impl From<&str> for ActionArgument {
    fn from(s: &str) -> Self {
        ActionArgument::String(s.to_string())
    }
}

impl From<String> for ActionArgument {
    fn from(s: String) -> Self {
        ActionArgument::String(s)
    }
}
