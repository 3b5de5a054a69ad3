//! 指令子系統
//!
//! - `arguments`: 輸入行切分（指令字元、靜音字元、參數範圍）
//! - `types`: 指令類型、指令資訊與各上下文的指令行為
//! - `manager`: 指令註冊表，負責同步到解析器與補全索引
//! - `parser`: 每個視窗的解析器與分派

mod arguments;
mod completion;
mod manager;
mod parser;
mod types;

pub use arguments::CommandArguments;
pub use completion::{CompletionScope, TabCompleter};
pub use manager::{CommandError, CommandManager, CommandPair};
pub use parser::{CommandParser, Dispatch, ParserScope, PreviousCommand};
pub use types::{
    signature, Arity, ChannelCommand, ChatCommand, Command, CommandInfo, CommandType,
    GlobalCommand, QueryCommand, ServerCommand,
};
