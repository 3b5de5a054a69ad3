//! 動作子系統
//!
//! 動作在事件發生時檢查條件，成立後執行一組輸入行：
//! - `condition_tree`: 組合多個條件的布林運算式
//! - `component` / `comparison`: 取值與比較
//! - `substitutor`: `$` 變數替換
//! - `model`: 動作定義與檔案格式
//! - `manager`: 註冊、觸發與從目錄載入

mod action_type;
mod comparison;
mod component;
mod condition;
mod condition_tree;
mod manager;
mod model;
mod substitutor;
mod value;

use std::io;

use thiserror::Error;

pub use action_type::CoreActionType;
pub use comparison::CoreActionComparison;
pub use component::{ComponentChain, CoreActionComponent};
pub use condition::{ActionCondition, ConditionRecord};
pub use condition_tree::ConditionTree;
pub use manager::ActionManager;
pub use model::{Action, ActionRecord};
pub use substitutor::{ActionSubstitutor, ILLEGAL_COMPONENT, NOT_CONNECTED, NOT_DEFINED};
pub use value::{ActionArgument, ValueType};

/// 動作定義錯誤
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("IO 錯誤: {0}")]
    Io(#[from] io::Error),

    #[error("動作檔格式錯誤: {0}")]
    Json(#[from] serde_json::Error),

    #[error("動作沒有觸發類型")]
    NoTriggers,

    #[error("未知的觸發類型: {0}")]
    UnknownTrigger(String),

    #[error("觸發類型 {other} 的參數與 {first} 不同")]
    IncompatibleTriggers { first: String, other: String },

    #[error("動作沒有回應")]
    NoResponse,

    #[error("未知的元件: {0}")]
    UnknownComponent(String),

    #[error("元件 {component} 不適用於 {expected:?}")]
    ComponentMismatch { component: String, expected: ValueType },

    #[error("未知的比較: {0}")]
    UnknownComparison(String),

    #[error("比較 {comparison} 不適用於 {value:?}")]
    ComparisonMismatch { comparison: String, value: ValueType },

    #[error("參數索引 {index} 超出範圍（共 {arity} 個參數）")]
    ArgumentOutOfRange { index: usize, arity: usize },

    #[error("無效的條件樹: '{0}'")]
    InvalidConditionTree(String),

    #[error("條件樹引用第 {index} 個條件，但只有 {conditions} 個")]
    TreeOutOfRange { index: usize, conditions: usize },
}
