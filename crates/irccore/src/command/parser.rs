//! 指令解析器
//!
//! 每個輸入視窗持有一個解析器。解析器判斷一行輸入是否為指令：
//! 是指令則依簽章查表並執行；不是則交由上下文當作一般文字送出。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::SystemTime;

use regex::Regex;
use tracing::{debug, warn};

use super::arguments::CommandArguments;
use super::manager::{CommandManager, CommandPair};
use super::types::{signature, Arity, Command, CommandInfo, CommandType};
use crate::action::{ActionArgument, CoreActionType};
use crate::config::ConfigProvider;
use crate::context::{Channel, ChatTarget, Query, Server, Window};

/// 預設保留的指令歷史筆數
const DEFAULT_HISTORY_SIZE: i64 = 10;

/// 解析器所屬的上下文
///
/// 以弱參照持有，避免與持有解析器的視窗形成循環。
#[derive(Clone)]
pub enum ParserScope {
    Global,
    Server(Weak<dyn Server>),
    Channel(Weak<dyn Channel>),
    Query(Weak<dyn Query>),
}

impl ParserScope {
    /// 此上下文載入的指令類型
    pub fn supertypes(&self) -> &'static [CommandType] {
        match self {
            ParserScope::Global => &[CommandType::Global],
            ParserScope::Server(_) => &[CommandType::Global, CommandType::Server],
            ParserScope::Channel(_) => &[CommandType::Global, CommandType::Server, CommandType::Channel],
            ParserScope::Query(_) => &[CommandType::Global, CommandType::Server, CommandType::Query],
        }
    }

    /// 此上下文的伺服器連線
    fn server(&self) -> Option<Arc<dyn Server>> {
        match self {
            ParserScope::Global => None,
            ParserScope::Server(s) => s.upgrade(),
            ParserScope::Channel(c) => c.upgrade()?.connection(),
            ParserScope::Query(q) => q.upgrade()?.connection(),
        }
    }
}

/// 一次分派的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 空白輸入，不做任何事
    Empty,
    /// 已執行指令
    Executed { signature: String, silent: bool },
    /// 已轉交給指定頻道的解析器
    Redirected { channel: String },
    /// 找不到指令
    Unknown { name: String },
    /// 非指令，已交由上下文送出
    NonCommand,
    /// 上下文已不存在或未連線，無法執行
    NoContext,
}

/// 歷史指令
#[derive(Debug, Clone)]
pub struct PreviousCommand {
    pub line: String,
    pub time: SystemTime,
}

/// 指令解析器
pub struct CommandParser {
    scope: ParserScope,
    config: Arc<dyn ConfigProvider>,
    manager: Weak<CommandManager>,
    /// 簽章 -> 指令
    commands: RwLock<HashMap<String, CommandPair>>,
    history: Mutex<VecDeque<PreviousCommand>>,
}

impl CommandParser {
    /// 建立解析器並從管理器載入此上下文可用的指令
    pub fn new(manager: &Arc<CommandManager>, scope: ParserScope) -> Arc<Self> {
        let parser = Arc::new(Self {
            config: Arc::clone(manager.config()),
            manager: Arc::downgrade(manager),
            scope,
            commands: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
        });
        manager.load_commands(&parser, parser.scope.supertypes());
        parser
    }

    /// 全域解析器
    pub fn global(manager: &Arc<CommandManager>) -> Arc<Self> {
        Self::new(manager, ParserScope::Global)
    }

    /// 伺服器視窗的解析器
    pub fn for_server(manager: &Arc<CommandManager>, server: Weak<dyn Server>) -> Arc<Self> {
        Self::new(manager, ParserScope::Server(server))
    }

    /// 頻道視窗的解析器
    pub fn for_channel(manager: &Arc<CommandManager>, channel: Weak<dyn Channel>) -> Arc<Self> {
        Self::new(manager, ParserScope::Channel(channel))
    }

    /// 私人對話視窗的解析器
    pub fn for_query(manager: &Arc<CommandManager>, query: Weak<dyn Query>) -> Arc<Self> {
        Self::new(manager, ParserScope::Query(query))
    }

    pub fn scope(&self) -> &ParserScope {
        &self.scope
    }

    /// 加入指令（相同簽章覆蓋）
    pub fn register_command(&self, info: CommandInfo, command: Command) {
        self.commands
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(info.signature(), (info, command));
    }

    /// 移除指令
    pub fn unregister_command(&self, info: &CommandInfo) {
        self.commands
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&info.signature());
    }

    /// 已載入指令的簽章（已排序）
    pub fn signatures(&self) -> Vec<String> {
        let mut list: Vec<String> = self
            .commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        list.sort();
        list
    }

    /// 處理一行使用者輸入
    pub fn handle(&self, origin: &dyn Window, line: &str) -> Dispatch {
        self.parse(origin, line, true)
    }

    /// 不判斷指令，直接當作一般文字送出（Ctrl+Enter）
    pub fn handle_as_text(&self, origin: &dyn Window, line: &str) -> Dispatch {
        if line.is_empty() {
            return Dispatch::Empty;
        }
        self.handle_non_command(origin, line)
    }

    fn parse(&self, origin: &dyn Window, line: &str, parse_channel: bool) -> Dispatch {
        if line.is_empty() {
            return Dispatch::Empty;
        }

        let args = CommandArguments::new(line, self.config.command_char(), self.config.silence_char());
        if !args.is_command() {
            return self.handle_non_command(origin, line);
        }

        if parse_channel {
            if let Some(redirected) = self.try_redirect(origin, &args) {
                return redirected;
            }
        }

        let name = args.command_name();
        match self.lookup(name, args.argument_count()) {
            Some((info, command)) => {
                self.add_history(name, &args);
                debug!("執行指令 {} (silent: {})", info.signature(), args.is_silent());
                self.execute(origin, &info, &command, args.is_silent(), &args)
            }
            None => {
                self.handle_invalid_command(origin, name, &args);
                Dispatch::Unknown {
                    name: name.to_string(),
                }
            }
        }
    }

    /// 先找精確簽章，再找不定參數版本
    fn lookup(&self, name: &str, arg_count: usize) -> Option<CommandPair> {
        let commands = self.commands.read().unwrap_or_else(|e| e.into_inner());
        commands
            .get(&signature(name, Arity::Fixed(arg_count)))
            .or_else(|| commands.get(&signature(name, Arity::Variadic)))
            .cloned()
    }

    /// `/cmd #channel args` 形式的頻道指令轉交給該頻道的解析器
    fn try_redirect(&self, origin: &dyn Window, args: &CommandArguments) -> Option<Dispatch> {
        let words = args.words();
        let target = *words.get(1)?;

        let server = self.scope.server()?;
        if !server.is_valid_channel_name(target) {
            return None;
        }

        let manager = self.manager.upgrade()?;
        if !manager.is_channel_command(args.command_name()) {
            return None;
        }

        let channel = server.channel(target)?;
        let parser = channel.command_parser()?;

        let line = if args.argument_count() > 1 {
            format!("{} {}", words[0], args.arguments_as_string_from(1))
        } else {
            words[0].to_string()
        };

        debug!("轉交指令到頻道 {}", target);
        parser.parse(origin, &line, false);
        Some(Dispatch::Redirected {
            channel: target.to_string(),
        })
    }

    fn execute(
        &self,
        origin: &dyn Window,
        info: &CommandInfo,
        command: &Command,
        silent: bool,
        args: &CommandArguments,
    ) -> Dispatch {
        let executed = match command {
            Command::Global(c) => {
                c.execute(origin, silent, args);
                true
            }
            Command::Server(c) => self
                .scope
                .server()
                .map(|server| c.execute(origin, &server, silent, args))
                .is_some(),
            Command::Channel(c) => match (&self.scope, self.scope.server()) {
                (ParserScope::Channel(channel), Some(server)) => channel
                    .upgrade()
                    .map(|channel| c.execute(origin, &server, &channel, silent, args))
                    .is_some(),
                _ => false,
            },
            Command::Query(c) => match (&self.scope, self.scope.server()) {
                (ParserScope::Query(query), Some(server)) => query
                    .upgrade()
                    .map(|query| c.execute(origin, &server, &query, silent, args))
                    .is_some(),
                _ => false,
            },
            Command::Chat(c) => match (&self.scope, self.scope.server()) {
                (ParserScope::Channel(channel), Some(server)) => channel
                    .upgrade()
                    .map(|channel| c.execute(origin, &server, ChatTarget::Channel(&channel), silent, args))
                    .is_some(),
                (ParserScope::Query(query), Some(server)) => query
                    .upgrade()
                    .map(|query| c.execute(origin, &server, ChatTarget::Query(&query), silent, args))
                    .is_some(),
                _ => false,
            },
        };

        if executed {
            Dispatch::Executed {
                signature: info.signature(),
                silent,
            }
        } else {
            warn!("指令 {} 無法在目前的上下文執行", info.signature());
            origin.add_line(
                "commandError",
                &[format!("Command '{}' requires an active connection", info.name)],
            );
            Dispatch::NoContext
        }
    }

    /// 找不到指令：以來源視窗觸發 UNKNOWN_COMMAND 動作後通知來源視窗
    fn handle_invalid_command(&self, origin: &dyn Window, name: &str, args: &CommandArguments) {
        let mut format = String::from("unknownCommand");
        let arguments: Vec<String> = args.arguments().into_iter().map(String::from).collect();

        if let Some(actions) = self.manager.upgrade().and_then(|m| m.action_manager()) {
            actions.process_event_from(
                Some(origin),
                CoreActionType::UnknownCommand,
                Some(&mut format),
                &[
                    ActionArgument::String(name.to_string()),
                    ActionArgument::StringArray(arguments.clone()),
                ],
            );
        }

        origin.add_line(&format, &[format!("{}/{}", name, arguments.len())]);
    }

    fn handle_non_command(&self, origin: &dyn Window, line: &str) -> Dispatch {
        match &self.scope {
            ParserScope::Global => {
                origin.add_line(
                    "commandError",
                    &["Only commands can be entered in the global window".to_string()],
                );
                Dispatch::NonCommand
            }
            ParserScope::Server(server) => match server.upgrade() {
                Some(server) => {
                    server.send_line(line);
                    Dispatch::NonCommand
                }
                None => Dispatch::NoContext,
            },
            ParserScope::Channel(channel) => match channel.upgrade() {
                Some(channel) => {
                    channel.send_message(line);
                    Dispatch::NonCommand
                }
                None => Dispatch::NoContext,
            },
            ParserScope::Query(query) => match query.upgrade() {
                Some(query) => {
                    query.send_message(line);
                    Dispatch::NonCommand
                }
                None => Dispatch::NoContext,
            },
        }
    }

    fn add_history(&self, name: &str, args: &CommandArguments) {
        let mut line = name.to_string();
        for arg in args.arguments() {
            line.push(' ');
            line.push_str(arg);
        }

        let limit = self
            .config
            .option_int("general", "commandhistory", DEFAULT_HISTORY_SIZE)
            .max(0) as usize;

        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push_back(PreviousCommand {
            line,
            time: SystemTime::now(),
        });
        while history.len() > limit {
            history.pop_front();
        }
    }

    /// 最近一次使用符合 `pattern`（不分大小寫、整行比對的正則）的指令時間
    pub fn command_time(&self, pattern: &str) -> Option<SystemTime> {
        let regex = match Regex::new(&format!("(?i)^(?:{})$", pattern)) {
            Ok(r) => r,
            Err(e) => {
                warn!("無效的歷史比對模式 '{}': {}", pattern, e);
                return None;
            }
        };

        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|pc| regex.is_match(&pc.line))
            .map(|pc| pc.time)
            .max()
    }

    /// 目前的指令歷史（舊到新）
    pub fn history(&self) -> Vec<PreviousCommand> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}
