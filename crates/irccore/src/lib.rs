//! IRC Core Library
//!
//! 提供 IRC 客戶端的指令與動作核心：
//! - `command`: 輸入行切分、指令註冊與各視窗的指令分派
//! - `action`: 事件觸發的動作、條件樹與 `$` 變數替換
//! - `config`: 設定存取
//! - `context`: 與伺服器 / 頻道 / 視窗協作的介面

pub mod action;
pub mod command;
pub mod config;
pub mod context;

#[cfg(test)]
mod testing;

pub use action::{
    Action, ActionArgument, ActionError, ActionManager, ActionSubstitutor, ConditionTree,
    CoreActionType,
};
pub use command::{
    CommandArguments, CommandError, CommandInfo, CommandManager, CommandParser, CommandType,
    Dispatch,
};
pub use config::{ConfigProvider, ConfigStore};
pub use context::{Channel, ChannelUser, ChatTarget, Query, Server, Window};
