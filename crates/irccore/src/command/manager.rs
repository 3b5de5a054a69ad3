//! 指令管理器
//!
//! 持有所有已註冊指令，並在註冊 / 移除時同步到：
//! - 已掛載且類型相符的指令解析器
//! - 相關範圍視窗的 Tab 補全索引

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use thiserror::Error;
use tracing::{debug, info};

use super::completion::{CompletionScope, TabCompleter};
use super::parser::CommandParser;
use super::types::{Command, CommandInfo, CommandType};
use crate::action::ActionManager;
use crate::config::ConfigProvider;

/// 指令註冊錯誤
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("指令名稱不可為空")]
    EmptyName,

    #[error("指令 '{name}' 宣告為 {declared}，但實作為 {actual}")]
    TypeMismatch {
        name: String,
        declared: CommandType,
        actual: CommandType,
    },
}

/// 指令與其資訊
pub type CommandPair = (CommandInfo, Command);

#[derive(Default)]
struct Registry {
    /// 簽章 -> 指令
    commands: HashMap<String, CommandPair>,
    /// 類型 -> 需要此類型指令的解析器
    parsers: HashMap<CommandType, Vec<Weak<CommandParser>>>,
    /// 範圍 -> 補全索引
    completers: HashMap<CompletionScope, Vec<Weak<TabCompleter>>>,
}

/// 指令管理器
pub struct CommandManager {
    config: Arc<dyn ConfigProvider>,
    registry: RwLock<Registry>,
    actions: RwLock<Option<Weak<ActionManager>>>,
}

impl CommandManager {
    /// 建立新的指令管理器
    pub fn new(config: Arc<dyn ConfigProvider>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: RwLock::new(Registry::default()),
            actions: RwLock::new(None),
        })
    }

    /// 設定來源
    pub fn config(&self) -> &Arc<dyn ConfigProvider> {
        &self.config
    }

    /// 指定處理 UNKNOWN_COMMAND 等事件的動作管理器
    pub fn set_action_manager(&self, actions: &Arc<ActionManager>) {
        *self.actions.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::downgrade(actions));
    }

    /// 動作管理器（若仍存在）
    pub fn action_manager(&self) -> Option<Arc<ActionManager>> {
        self.actions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 註冊指令
    ///
    /// 相同簽章重複註冊時以最後一次為準。
    pub fn register_command(&self, info: CommandInfo, command: Command) -> Result<(), CommandError> {
        if info.name.trim().is_empty() {
            return Err(CommandError::EmptyName);
        }
        if command.command_type() != info.command_type {
            return Err(CommandError::TypeMismatch {
                name: info.name,
                declared: info.command_type,
                actual: command.command_type(),
            });
        }

        let mut registry = self.write();

        for parser in live_parsers(&mut registry, info.command_type) {
            parser.register_command(info.clone(), command.clone());
        }

        let entry = self.completion_entry(&info.name);
        for completer in live_completers(&mut registry, info.command_type) {
            completer.add_entry(entry.clone());
        }

        info!("註冊指令 {} ({})", info.signature(), info.command_type);
        registry.commands.insert(info.signature(), (info, command));
        Ok(())
    }

    /// 移除指令，回傳是否曾經註冊
    pub fn unregister_command(&self, info: &CommandInfo) -> bool {
        let mut registry = self.write();

        let removed = registry.commands.remove(&info.signature()).is_some();
        if !removed {
            return false;
        }

        for parser in live_parsers(&mut registry, info.command_type) {
            parser.unregister_command(info);
        }

        // 其他參數個數的同名指令仍存在時保留補全項目
        let still_named = registry
            .commands
            .values()
            .any(|(other, _)| other.name.eq_ignore_ascii_case(&info.name)
                && scopes_for(other.command_type)
                    .iter()
                    .any(|s| scopes_for(info.command_type).contains(s)));
        if !still_named {
            let entry = self.completion_entry(&info.name);
            for completer in live_completers(&mut registry, info.command_type) {
                completer.remove_entry(&entry);
            }
        }

        info!("移除指令 {}", info.signature());
        true
    }

    /// 將符合類型的指令載入解析器，並讓它接收之後的註冊 / 移除
    pub fn load_commands(&self, parser: &Arc<CommandParser>, supertypes: &[CommandType]) {
        let mut types: Vec<CommandType> = supertypes
            .iter()
            .flat_map(|t| t.component_types().iter().copied())
            .collect();
        types.sort();
        types.dedup();

        let mut registry = self.write();

        for (info, command) in registry.commands.values() {
            if types.contains(&info.command_type) {
                parser.register_command(info.clone(), command.clone());
            }
        }

        for t in types {
            registry
                .parsers
                .entry(t)
                .or_default()
                .push(Arc::downgrade(parser));
        }

        debug!("解析器已載入 {:?} 類型的指令", supertypes);
    }

    /// 掛載視窗的補全索引，並填入目前已有的指令名稱
    pub fn attach_completer(&self, scope: CompletionScope, completer: &Arc<TabCompleter>) {
        let mut registry = self.write();

        for (info, _) in registry.commands.values() {
            if scopes_for(info.command_type).contains(&scope) {
                completer.add_entry(self.completion_entry(&info.name));
            }
        }

        registry
            .completers
            .entry(scope)
            .or_default()
            .push(Arc::downgrade(completer));
    }

    fn completion_entry(&self, name: &str) -> String {
        format!("{}{}", self.config.command_char(), name)
    }

    /// 以名稱查詢指令（可指定類型篩選）
    pub fn get_command(&self, filter: Option<CommandType>, name: &str) -> Option<CommandPair> {
        let registry = self.read();
        registry
            .commands
            .iter()
            .filter(|(_, (info, _))| {
                info.name.eq_ignore_ascii_case(name)
                    && filter.map_or(true, |f| info.command_type.matches(f))
            })
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, pair)| pair.clone())
    }

    /// 是否存在同名的 CHANNEL 或 CHAT 指令
    pub fn is_channel_command(&self, name: &str) -> bool {
        self.read().commands.values().any(|(info, _)| {
            info.name.eq_ignore_ascii_case(name)
                && matches!(info.command_type, CommandType::Channel | CommandType::Chat)
        })
    }

    /// 所有指令資訊（依名稱排序，可指定類型篩選）
    pub fn commands(&self, filter: Option<CommandType>) -> Vec<CommandInfo> {
        let mut list: Vec<CommandInfo> = self
            .read()
            .commands
            .values()
            .filter(|(info, _)| filter.map_or(true, |f| info.command_type.matches(f)))
            .map(|(info, _)| info.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.signature().cmp(&b.signature())));
        list
    }
}

/// 指令類型對應的補全範圍
fn scopes_for(command_type: CommandType) -> &'static [CompletionScope] {
    match command_type {
        CommandType::Global => &[CompletionScope::Global, CompletionScope::Server],
        CommandType::Server => &[CompletionScope::Server],
        CommandType::Chat => &[CompletionScope::Channel, CompletionScope::Query],
        CommandType::Channel => &[CompletionScope::Channel],
        CommandType::Query => &[CompletionScope::Query],
    }
}

/// 取得仍存活的解析器，並清除已釋放者
fn live_parsers(registry: &mut Registry, command_type: CommandType) -> Vec<Arc<CommandParser>> {
    let Some(list) = registry.parsers.get_mut(&command_type) else {
        return Vec::new();
    };
    list.retain(|w| w.strong_count() > 0);
    list.iter().filter_map(Weak::upgrade).collect()
}

/// 取得仍存活的補全索引，並清除已釋放者
fn live_completers(registry: &mut Registry, command_type: CommandType) -> Vec<Arc<TabCompleter>> {
    let mut result = Vec::new();
    for scope in scopes_for(command_type) {
        if let Some(list) = registry.completers.get_mut(scope) {
            list.retain(|w| w.strong_count() > 0);
            result.extend(list.iter().filter_map(Weak::upgrade));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::testing::Recorder;

    fn manager() -> (Arc<CommandManager>, Arc<Recorder>) {
        (CommandManager::new(Arc::new(ConfigStore::new())), Arc::new(Recorder::default()))
    }

    #[test]
    fn test_register_validates() {
        let (m, r) = manager();
        assert!(matches!(
            m.register_command(CommandInfo::new(" ", CommandType::Global), r.global_command("x")),
            Err(CommandError::EmptyName)
        ));
        assert!(matches!(
            m.register_command(CommandInfo::new("away", CommandType::Global), r.server_command("away")),
            Err(CommandError::TypeMismatch { declared: CommandType::Global, actual: CommandType::Server, .. })
        ));
        assert!(m.commands(None).is_empty());
    }

    #[test]
    fn test_lookup_and_filters() {
        let (m, r) = manager();
        m.register_command(CommandInfo::new("echo", CommandType::Global), r.global_command("echo")).unwrap();
        m.register_command(CommandInfo::new("Topic", CommandType::Channel), r.channel_command("topic")).unwrap();
        m.register_command(CommandInfo::new("me", CommandType::Chat), r.chat_command("me")).unwrap();

        assert!(m.get_command(None, "ECHO").is_some());
        assert!(m.get_command(Some(CommandType::Server), "echo").is_none());
        assert!(m.get_command(Some(CommandType::Chat), "topic").is_some());

        assert!(m.is_channel_command("topic"));
        assert!(m.is_channel_command("me"));
        assert!(!m.is_channel_command("echo"));

        let chat: Vec<String> = m.commands(Some(CommandType::Chat)).into_iter().map(|i| i.name).collect();
        assert_eq!(chat, vec!["Topic", "me"]);
        assert_eq!(m.commands(None).len(), 3);
    }

    #[test]
    fn test_completion_follows_registry() {
        let (m, r) = manager();
        m.register_command(CommandInfo::new("echo", CommandType::Global), r.global_command("echo")).unwrap();

        let server_tabs = Arc::new(TabCompleter::new());
        let channel_tabs = Arc::new(TabCompleter::new());
        m.attach_completer(CompletionScope::Server, &server_tabs);
        m.attach_completer(CompletionScope::Channel, &channel_tabs);
        assert!(server_tabs.contains("/echo"));
        assert!(!channel_tabs.contains("/echo"));

        let kick = CommandInfo::new("kick", CommandType::Channel).with_arity(1);
        m.register_command(kick.clone(), r.channel_command("kick/1")).unwrap();
        m.register_command(CommandInfo::new("kick", CommandType::Channel), r.channel_command("kick")).unwrap();
        assert_eq!(channel_tabs.complete("/k"), vec!["/kick"]);

        // 另一個同名指令仍存在時保留補全
        assert!(m.unregister_command(&kick));
        assert!(channel_tabs.contains("/kick"));
        assert!(m.unregister_command(&CommandInfo::new("kick", CommandType::Channel)));
        assert!(!channel_tabs.contains("/kick"));
        assert!(!m.unregister_command(&kick));
    }

    #[test]
    fn test_dropped_parsers_are_pruned() {
        let (m, r) = manager();
        {
            let _parser = CommandParser::global(&m);
        }
        m.register_command(CommandInfo::new("echo", CommandType::Global), r.global_command("echo")).unwrap();
        assert!(live_parsers(&mut m.write(), CommandType::Global).is_empty());
    }
}
