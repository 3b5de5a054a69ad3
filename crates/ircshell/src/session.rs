//! 模擬的 IRC 連線
//!
//! 沒有真正的網路：送出的協定行直接顯示，並在本地模擬
//! AWAY / JOIN / PART / NICK / QUIT 的效果；`/inject` 可以模擬收到的訊息，
//! 用來觸發頻道與私人對話的動作。

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use irccore::action::{ActionArgument, ActionManager, CoreActionType};
use irccore::command::{CommandManager, CommandParser, Dispatch};
use irccore::config::{ConfigError, ConfigStore};
use irccore::context::{Channel, ChannelUser, Query, Server, Window};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ShellConfig;

/// 輸出通道：每則訊息為一行 `[kind] text`
pub type Output = mpsc::UnboundedSender<String>;

fn emit(out: &Output, kind: &str, args: &[String]) {
    let text = if args.is_empty() {
        format!("[{}]", kind)
    } else {
        format!("[{}] {}", kind, args.join(" "))
    };
    // 接收端關閉表示程式正在結束
    let _ = out.send(text);
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// 全域狀態視窗
pub struct StatusWindow {
    out: Output,
}

impl Window for StatusWindow {
    fn name(&self) -> String {
        "status".to_string()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        emit(&self.out, kind, args);
    }
}

/// 頻道成員或私訊對象
pub struct ShellUser {
    nickname: String,
    host: Option<String>,
}

impl ShellUser {
    pub fn new(nickname: &str, host: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            nickname: nickname.to_string(),
            host: host.map(str::to_string),
        })
    }
}

impl ChannelUser for ShellUser {
    fn nickname(&self) -> String {
        self.nickname.clone()
    }

    fn host(&self) -> Option<String> {
        self.host.clone()
    }

    fn channel_count(&self) -> usize {
        1
    }
}

/// 模擬的伺服器連線
pub struct ShellServer {
    me: Weak<ShellServer>,
    name: String,
    network: String,
    nickname: Mutex<String>,
    connected: AtomicBool,
    away: Mutex<Option<String>>,
    channels: Mutex<HashMap<String, Arc<ShellChannel>>>,
    queries: Mutex<HashMap<String, Arc<ShellQuery>>>,
    parser: OnceLock<Arc<CommandParser>>,
    commands: Weak<CommandManager>,
    actions: Weak<ActionManager>,
    out: Output,
}

impl ShellServer {
    pub fn new(
        config: &ShellConfig,
        commands: &Arc<CommandManager>,
        actions: &Arc<ActionManager>,
        out: Output,
    ) -> Arc<Self> {
        let server = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            name: config.server.clone(),
            network: config.network.clone(),
            nickname: Mutex::new(config.nickname.clone()),
            connected: AtomicBool::new(false),
            away: Mutex::new(None),
            channels: Mutex::new(HashMap::new()),
            queries: Mutex::new(HashMap::new()),
            parser: OnceLock::new(),
            commands: Arc::downgrade(commands),
            actions: Arc::downgrade(actions),
            out,
        });
        let weak: Weak<dyn Server> = server.me.clone();
        let _ = server.parser.set(CommandParser::for_server(commands, weak));
        server
    }

    fn arc(&self) -> Option<Arc<dyn Server>> {
        let me = self.me.upgrade()?;
        Some(me as Arc<dyn Server>)
    }

    fn fire(&self, trigger: CoreActionType, format: Option<&mut String>, args: &[ActionArgument]) {
        if let Some(actions) = self.actions.upgrade() {
            actions.process_event(trigger, format, args);
        }
    }

    /// 建立連線並觸發 SERVER_CONNECTED
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        info!("已連線到 {} ({})", self.name, self.network);
        self.add_line("connected", &[self.name.clone(), self.network.clone()]);
        if let Some(me) = self.arc() {
            self.fire(CoreActionType::ServerConnected, None, &[ActionArgument::Server(me)]);
        }
    }

    pub fn channel_by_name(&self, name: &str) -> Option<Arc<ShellChannel>> {
        lock(&self.channels).get(&name.to_lowercase()).cloned()
    }

    pub fn query_by_name(&self, nickname: &str) -> Option<Arc<ShellQuery>> {
        lock(&self.queries).get(&nickname.to_lowercase()).cloned()
    }

    fn join(&self, name: &str) {
        if self.channel_by_name(name).is_some() {
            return;
        }
        let Some(commands) = self.commands.upgrade() else {
            return;
        };

        let channel = ShellChannel::new(name, self.me.clone(), &commands, self.out.clone());
        lock(&self.channels).insert(name.to_lowercase(), channel.clone());
        debug!("加入頻道 {}", name);

        let me = ShellUser::new(&lock(&self.nickname), None);
        self.fire(
            CoreActionType::ChannelJoin,
            None,
            &[ActionArgument::Channel(channel), ActionArgument::User(me)],
        );
    }

    fn part(&self, name: &str, reason: &str) {
        let Some(channel) = lock(&self.channels).remove(&name.to_lowercase()) else {
            return;
        };
        let me = ShellUser::new(&lock(&self.nickname), None);
        self.fire(
            CoreActionType::ChannelPart,
            None,
            &[
                ActionArgument::Channel(channel),
                ActionArgument::User(me),
                ActionArgument::from(reason),
            ],
        );
    }

    fn open_query(&self, nickname: &str, host: Option<&str>) -> Option<Arc<ShellQuery>> {
        if let Some(query) = self.query_by_name(nickname) {
            return Some(query);
        }
        let commands = self.commands.upgrade()?;
        let query = ShellQuery::new(nickname, host, self.me.clone(), &commands, self.out.clone());
        lock(&self.queries).insert(nickname.to_lowercase(), query.clone());
        Some(query)
    }

    /// 模擬收到一行協定訊息（目前處理 PRIVMSG）
    pub fn receive(&self, raw: &str) {
        let Some((prefix, rest)) = raw.strip_prefix(':').and_then(|r| r.split_once(' ')) else {
            self.add_line("unknownLine", &[raw.to_string()]);
            return;
        };
        let (nickname, host) = match prefix.split_once('!') {
            Some((nick, host)) => (nick, Some(host)),
            None => (prefix, None),
        };

        let mut parts = rest.splitn(3, ' ');
        let (Some("PRIVMSG"), Some(target), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
            self.add_line("unknownLine", &[raw.to_string()]);
            return;
        };
        let text = text.strip_prefix(':').unwrap_or(text);
        let user = ShellUser::new(nickname, host);

        if self.is_valid_channel_name(target) {
            let Some(channel) = self.channel_by_name(target) else {
                return;
            };
            let (trigger, mut format, text) = match ctcp_action(text) {
                Some(action) => (CoreActionType::ChannelAction, String::from("channelAction"), action),
                None => (CoreActionType::ChannelMessage, String::from("channelMessage"), text),
            };
            self.fire(
                trigger,
                Some(&mut format),
                &[
                    ActionArgument::Channel(channel.clone()),
                    ActionArgument::User(user),
                    ActionArgument::from(text),
                ],
            );
            channel.add_line(&format, &[nickname.to_string(), text.to_string()]);
        } else if let Some(query) = self.open_query(nickname, host) {
            let mut format = String::from("queryMessage");
            self.fire(
                CoreActionType::QueryMessage,
                Some(&mut format),
                &[ActionArgument::Query(query.clone()), ActionArgument::from(text)],
            );
            query.add_line(&format, &[nickname.to_string(), text.to_string()]);
        }
    }
}

/// `\x01ACTION text\x01` 形式的動作訊息
fn ctcp_action(text: &str) -> Option<&str> {
    text.strip_prefix("\u{1}ACTION ")
        .map(|t| t.strip_suffix('\u{1}').unwrap_or(t))
}

impl Window for ShellServer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        emit(&self.out, kind, args);
    }

    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        self.parser.get().cloned()
    }
}

impl Server for ShellServer {
    fn as_window(&self) -> &dyn Window {
        self
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn network(&self) -> Option<String> {
        Some(self.network.clone())
    }

    fn away_message(&self) -> Option<String> {
        lock(&self.away).clone()
    }

    fn nickname(&self) -> Option<String> {
        Some(lock(&self.nickname).clone())
    }

    /// 顯示送出的行並模擬伺服器的回應
    fn send_line(&self, line: &str) {
        if !self.is_connected() {
            self.add_line("notConnected", &[line.to_string()]);
            return;
        }
        emit(&self.out, "send", &[line.to_string()]);

        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let trailing = rest.strip_prefix(':').unwrap_or(rest);

        match verb.to_uppercase().as_str() {
            "AWAY" if trailing.is_empty() => {
                *lock(&self.away) = None;
                if let Some(me) = self.arc() {
                    self.fire(CoreActionType::ServerBack, None, &[ActionArgument::Server(me)]);
                }
            }
            "AWAY" => {
                *lock(&self.away) = Some(trailing.to_string());
                if let Some(me) = self.arc() {
                    self.fire(
                        CoreActionType::ServerAway,
                        None,
                        &[ActionArgument::Server(me), ActionArgument::from(trailing)],
                    );
                }
            }
            "JOIN" => {
                for name in rest.split(',').filter(|n| !n.is_empty()) {
                    self.join(name.trim());
                }
            }
            "PART" => {
                let (name, reason) = rest.split_once(' ').unwrap_or((rest, ""));
                self.part(name, reason.strip_prefix(':').unwrap_or(reason));
            }
            "NICK" if !rest.is_empty() => {
                *lock(&self.nickname) = rest.to_string();
            }
            "QUIT" => {
                self.connected.store(false, Ordering::SeqCst);
                if let Some(me) = self.arc() {
                    self.fire(CoreActionType::ServerDisconnected, None, &[ActionArgument::Server(me)]);
                }
            }
            _ => {}
        }
    }

    fn channel(&self, name: &str) -> Option<Arc<dyn Channel>> {
        let channel = self.channel_by_name(name)?;
        Some(channel as Arc<dyn Channel>)
    }
}

/// 模擬的頻道
pub struct ShellChannel {
    name: String,
    server: Weak<ShellServer>,
    parser: OnceLock<Arc<CommandParser>>,
    out: Output,
}

impl ShellChannel {
    fn new(name: &str, server: Weak<ShellServer>, commands: &Arc<CommandManager>, out: Output) -> Arc<Self> {
        let channel = Arc::new(Self {
            name: name.to_string(),
            server,
            parser: OnceLock::new(),
            out,
        });
        let weak: Weak<dyn Channel> = Arc::downgrade(&channel) as Weak<dyn Channel>;
        let _ = channel.parser.set(CommandParser::for_channel(commands, weak));
        channel
    }

    fn own_nickname(&self) -> String {
        self.server
            .upgrade()
            .and_then(|s| s.nickname())
            .unwrap_or_default()
    }
}

impl Window for ShellChannel {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        let mut line = vec![self.name.clone()];
        line.extend_from_slice(args);
        emit(&self.out, kind, &line);
    }

    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        self.parser.get().cloned()
    }
}

impl Channel for ShellChannel {
    fn as_window(&self) -> &dyn Window {
        self
    }

    fn connection(&self) -> Option<Arc<dyn Server>> {
        let server = self.server.upgrade()?;
        Some(server as Arc<dyn Server>)
    }

    fn send_message(&self, text: &str) {
        if let Some(server) = self.server.upgrade() {
            server.send_line(&format!("PRIVMSG {} :{}", self.name, text));
        }
        self.add_line("channelSelfMessage", &[self.own_nickname(), text.to_string()]);
    }

    fn send_action(&self, text: &str) {
        if let Some(server) = self.server.upgrade() {
            server.send_line(&format!("PRIVMSG {} :\u{1}ACTION {}\u{1}", self.name, text));
        }
        self.add_line("channelSelfAction", &[self.own_nickname(), text.to_string()]);
    }
}

/// 模擬的私人對話
pub struct ShellQuery {
    nickname: String,
    host: Option<String>,
    server: Weak<ShellServer>,
    parser: OnceLock<Arc<CommandParser>>,
    out: Output,
}

impl ShellQuery {
    fn new(
        nickname: &str,
        host: Option<&str>,
        server: Weak<ShellServer>,
        commands: &Arc<CommandManager>,
        out: Output,
    ) -> Arc<Self> {
        let query = Arc::new(Self {
            nickname: nickname.to_string(),
            host: host.map(str::to_string),
            server,
            parser: OnceLock::new(),
            out,
        });
        let weak: Weak<dyn Query> = Arc::downgrade(&query) as Weak<dyn Query>;
        let _ = query.parser.set(CommandParser::for_query(commands, weak));
        query
    }
}

impl Window for ShellQuery {
    fn name(&self) -> String {
        self.nickname.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        emit(&self.out, kind, args);
    }

    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        self.parser.get().cloned()
    }
}

impl Query for ShellQuery {
    fn as_window(&self) -> &dyn Window {
        self
    }

    fn connection(&self) -> Option<Arc<dyn Server>> {
        let server = self.server.upgrade()?;
        Some(server as Arc<dyn Server>)
    }

    fn nickname(&self) -> String {
        self.nickname.clone()
    }

    fn host(&self) -> Option<String> {
        self.host.clone()
    }

    fn send_message(&self, text: &str) {
        if let Some(server) = self.server.upgrade() {
            server.send_line(&format!("PRIVMSG {} :{}", self.nickname, text));
        }
    }

    fn send_action(&self, text: &str) {
        if let Some(server) = self.server.upgrade() {
            server.send_line(&format!("PRIVMSG {} :\u{1}ACTION {}\u{1}", self.nickname, text));
        }
    }
}

/// 整個執行環境：設定、指令、動作與目前的視窗
pub struct Session {
    config: Arc<ConfigStore>,
    commands: Arc<CommandManager>,
    actions: Arc<ActionManager>,
    status: Arc<StatusWindow>,
    global_parser: Arc<CommandParser>,
    server: Arc<ShellServer>,
    /// 目前的視窗（None 為伺服器視窗）
    active: Mutex<Option<String>>,
    autojoin: Vec<String>,
}

impl Session {
    pub fn new(shell_config: &ShellConfig, out: Output) -> Arc<Self> {
        let config = Arc::new(ConfigStore::from_domains(shell_config.options.clone()));
        let commands = CommandManager::new(config.clone());
        let status = Arc::new(StatusWindow { out: out.clone() });
        let global_parser = CommandParser::global(&commands);
        let actions = ActionManager::new(config.clone(), status.clone(), global_parser.clone());
        commands.set_action_manager(&actions);

        let server = ShellServer::new(shell_config, &commands, &actions, out);

        let session = Arc::new(Self {
            config,
            commands,
            actions,
            status,
            global_parser,
            server,
            active: Mutex::new(None),
            autojoin: shell_config.channels.clone(),
        });
        crate::commands::register_builtins(&session);
        session
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn commands(&self) -> &Arc<CommandManager> {
        &self.commands
    }

    pub fn actions(&self) -> &Arc<ActionManager> {
        &self.actions
    }

    pub fn server(&self) -> &Arc<ShellServer> {
        &self.server
    }

    /// 將目前的選項寫入檔案
    pub fn save_options(&self, path: &Path) -> Result<(), ConfigError> {
        self.config.save(path)?;
        info!("已儲存選項到 {}", path.display());
        Ok(())
    }

    /// 從檔案重新載入選項，取代目前的所有選項
    pub fn reload_options(&self, path: &Path) -> Result<(), ConfigError> {
        let loaded = ConfigStore::load(path)?;
        self.config.replace_all(loaded);
        info!("已從 {} 重新載入選項", path.display());
        Ok(())
    }

    /// 連線並加入自動加入的頻道
    pub fn connect(&self) {
        self.server.connect();
        for channel in &self.autojoin {
            self.server.send_line(&format!("JOIN {}", channel));
        }
    }

    /// 切換目前的視窗；名稱為空時回到伺服器視窗
    pub fn set_active(&self, name: &str) -> bool {
        if name.is_empty() {
            *lock(&self.active) = None;
            return true;
        }
        if self.server.channel_by_name(name).is_none() && self.server.query_by_name(name).is_none() {
            return false;
        }
        *lock(&self.active) = Some(name.to_string());
        true
    }

    pub fn active_name(&self) -> String {
        lock(&self.active)
            .clone()
            .unwrap_or_else(|| self.server.name.clone())
    }

    /// 在目前的視窗處理一行輸入
    pub fn handle_line(&self, line: &str) -> Dispatch {
        let active = lock(&self.active).clone();

        if let Some(name) = active {
            if let Some(channel) = self.server.channel_by_name(&name) {
                if let Some(parser) = channel.command_parser() {
                    return parser.handle(channel.as_window(), line);
                }
            }
            if let Some(query) = self.server.query_by_name(&name) {
                if let Some(parser) = query.command_parser() {
                    return parser.handle(query.as_window(), line);
                }
            }
            // 視窗已關閉
            *lock(&self.active) = None;
        }

        match self.server.command_parser() {
            Some(parser) => parser.handle(self.server.as_window(), line),
            None => self.global_parser.handle(self.status.as_ref(), line),
        }
    }
}
