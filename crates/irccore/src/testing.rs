//! 測試用的上下文替身

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::command::{
    ChannelCommand, ChatCommand, Command, CommandArguments, CommandManager, CommandParser,
    GlobalCommand, QueryCommand, ServerCommand,
};
use crate::context::{Channel, ChannelUser, ChatTarget, Query, Server, Window};

type Line = (String, Vec<String>);

fn snapshot<T: Clone>(m: &Mutex<Vec<T>>) -> Vec<T> {
    m.lock().unwrap().clone()
}

/// 只記錄輸出的視窗
pub struct MockWindow {
    name: String,
    lines: Mutex<Vec<Line>>,
}

impl MockWindow {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<Line> {
        snapshot(&self.lines)
    }
}

impl Window for MockWindow {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        self.lines.lock().unwrap().push((kind.to_string(), args.to_vec()));
    }
}

#[derive(Default)]
struct ServerState {
    connected: bool,
    network: Option<String>,
    protocol: Option<String>,
    away: Option<String>,
}

pub struct MockServer {
    me: Weak<MockServer>,
    name: String,
    state: Mutex<ServerState>,
    sent: Mutex<Vec<String>>,
    lines: Mutex<Vec<Line>>,
    channels: Mutex<HashMap<String, Arc<MockChannel>>>,
    parser: Mutex<Option<Arc<CommandParser>>>,
}

impl MockServer {
    fn build(name: &str, state: ServerState) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            name: name.to_string(),
            state: Mutex::new(state),
            sent: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
            channels: Mutex::new(HashMap::new()),
            parser: Mutex::new(None),
        })
    }

    pub fn connected(name: &str, network: &str) -> Arc<Self> {
        Self::build(
            name,
            ServerState {
                connected: true,
                network: Some(network.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn disconnected(name: &str) -> Arc<Self> {
        Self::build(name, ServerState::default())
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().unwrap().connected = connected;
    }

    pub fn set_network(&self, network: &str) {
        self.state.lock().unwrap().network = Some(network.to_string());
    }

    pub fn set_protocol(&self, protocol: &str) {
        self.state.lock().unwrap().protocol = Some(protocol.to_string());
    }

    pub fn set_away(&self, reason: &str) {
        self.state.lock().unwrap().away = Some(reason.to_string());
    }

    pub fn sent(&self) -> Vec<String> {
        snapshot(&self.sent)
    }

    pub fn lines(&self) -> Vec<Line> {
        snapshot(&self.lines)
    }

    pub fn attach_parser(&self, manager: &Arc<CommandManager>) -> Arc<CommandParser> {
        let me: Weak<dyn Server> = self.me.clone();
        let parser = CommandParser::for_server(manager, me);
        *self.parser.lock().unwrap() = Some(parser.clone());
        parser
    }
}

impl Window for MockServer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        self.lines.lock().unwrap().push((kind.to_string(), args.to_vec()));
    }

    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        self.parser.lock().unwrap().clone()
    }
}

impl Server for MockServer {
    fn as_window(&self) -> &dyn Window {
        self
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn network(&self) -> Option<String> {
        self.state.lock().unwrap().network.clone()
    }

    fn protocol(&self) -> String {
        self.state.lock().unwrap().protocol.clone().unwrap_or_else(|| "irc".to_string())
    }

    fn away_message(&self) -> Option<String> {
        self.state.lock().unwrap().away.clone()
    }

    fn nickname(&self) -> Option<String> {
        Some("me".to_string())
    }

    fn send_line(&self, line: &str) {
        self.sent.lock().unwrap().push(line.to_string());
    }

    fn channel(&self, name: &str) -> Option<Arc<dyn Channel>> {
        let channels = self.channels.lock().unwrap();
        channels.get(&name.to_lowercase()).map(|c| c.clone() as Arc<dyn Channel>)
    }
}

pub struct MockChannel {
    me: Weak<MockChannel>,
    name: String,
    server: Option<Weak<MockServer>>,
    messages: Mutex<Vec<String>>,
    actions: Mutex<Vec<String>>,
    lines: Mutex<Vec<Line>>,
    parser: Mutex<Option<Arc<CommandParser>>>,
}

impl MockChannel {
    fn build(name: &str, server: Option<Weak<MockServer>>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            name: name.to_string(),
            server,
            messages: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
            parser: Mutex::new(None),
        })
    }

    /// 加入伺服器上的頻道
    pub fn join(server: &Arc<MockServer>, name: &str) -> Arc<Self> {
        let channel = Self::build(name, Some(Arc::downgrade(server)));
        server
            .channels
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), channel.clone());
        channel
    }

    /// 沒有連線的頻道
    pub fn orphan(name: &str) -> Arc<Self> {
        Self::build(name, None)
    }

    pub fn attach_parser(&self, manager: &Arc<CommandManager>) -> Arc<CommandParser> {
        let me: Weak<dyn Channel> = self.me.clone();
        let parser = CommandParser::for_channel(manager, me);
        *self.parser.lock().unwrap() = Some(parser.clone());
        parser
    }

    pub fn messages(&self) -> Vec<String> {
        snapshot(&self.messages)
    }

    pub fn actions(&self) -> Vec<String> {
        snapshot(&self.actions)
    }

    pub fn lines(&self) -> Vec<Line> {
        snapshot(&self.lines)
    }
}

impl Window for MockChannel {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        self.lines.lock().unwrap().push((kind.to_string(), args.to_vec()));
    }

    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        self.parser.lock().unwrap().clone()
    }
}

impl Channel for MockChannel {
    fn as_window(&self) -> &dyn Window {
        self
    }

    fn connection(&self) -> Option<Arc<dyn Server>> {
        let server = self.server.as_ref()?.upgrade()?;
        Some(server as Arc<dyn Server>)
    }

    fn send_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn send_action(&self, text: &str) {
        self.actions.lock().unwrap().push(text.to_string());
    }
}

/// 私人對話
pub struct MockQuery {
    me: Weak<MockQuery>,
    nickname: String,
    server: Weak<MockServer>,
    messages: Mutex<Vec<String>>,
    actions: Mutex<Vec<String>>,
    lines: Mutex<Vec<Line>>,
    parser: Mutex<Option<Arc<CommandParser>>>,
}

impl MockQuery {
    pub fn open(server: &Arc<MockServer>, nickname: &str) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            nickname: nickname.to_string(),
            server: Arc::downgrade(server),
            messages: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
            parser: Mutex::new(None),
        })
    }

    pub fn attach_parser(&self, manager: &Arc<CommandManager>) -> Arc<CommandParser> {
        let me: Weak<dyn Query> = self.me.clone();
        let parser = CommandParser::for_query(manager, me);
        *self.parser.lock().unwrap() = Some(parser.clone());
        parser
    }

    pub fn messages(&self) -> Vec<String> {
        snapshot(&self.messages)
    }

    pub fn actions(&self) -> Vec<String> {
        snapshot(&self.actions)
    }

    pub fn lines(&self) -> Vec<Line> {
        snapshot(&self.lines)
    }
}

impl Window for MockQuery {
    fn name(&self) -> String {
        self.nickname.clone()
    }

    fn add_line(&self, kind: &str, args: &[String]) {
        self.lines.lock().unwrap().push((kind.to_string(), args.to_vec()));
    }

    fn command_parser(&self) -> Option<Arc<CommandParser>> {
        self.parser.lock().unwrap().clone()
    }
}

impl Query for MockQuery {
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

    fn send_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn send_action(&self, text: &str) {
        self.actions.lock().unwrap().push(text.to_string());
    }
}

pub struct MockUser {
    nickname: String,
}

impl MockUser {
    pub fn new(nickname: &str) -> Arc<Self> {
        Arc::new(Self {
            nickname: nickname.to_string(),
        })
    }
}

impl ChannelUser for MockUser {
    fn nickname(&self) -> String {
        self.nickname.clone()
    }
}

type Call = (String, bool, Vec<String>);

/// 記錄指令執行的替身
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    last_target: Mutex<Option<String>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        snapshot(&self.calls)
    }

    pub fn last_target(&self) -> Option<String> {
        self.last_target.lock().unwrap().clone()
    }

    fn recording(self: &Arc<Self>, label: &str) -> Arc<Recording> {
        Arc::new(Recording {
            label: label.to_string(),
            recorder: self.clone(),
        })
    }

    pub fn global_command(self: &Arc<Self>, label: &str) -> Command {
        Command::Global(self.recording(label))
    }

    pub fn server_command(self: &Arc<Self>, label: &str) -> Command {
        Command::Server(self.recording(label))
    }

    pub fn channel_command(self: &Arc<Self>, label: &str) -> Command {
        Command::Channel(self.recording(label))
    }

    pub fn query_command(self: &Arc<Self>, label: &str) -> Command {
        Command::Query(self.recording(label))
    }

    /// 會以 `send_action` 送出參數的聊天指令
    pub fn chat_command(self: &Arc<Self>, label: &str) -> Command {
        Command::Chat(self.recording(label))
    }
}

struct Recording {
    label: String,
    recorder: Arc<Recorder>,
}

impl Recording {
    fn record(&self, silent: bool, args: &CommandArguments) {
        let arguments = args.arguments().into_iter().map(String::from).collect();
        self.recorder
            .calls
            .lock()
            .unwrap()
            .push((self.label.clone(), silent, arguments));
    }
}

impl GlobalCommand for Recording {
    fn execute(&self, _origin: &dyn Window, silent: bool, args: &CommandArguments) {
        self.record(silent, args);
    }
}

impl ServerCommand for Recording {
    fn execute(&self, _origin: &dyn Window, _server: &Arc<dyn Server>, silent: bool, args: &CommandArguments) {
        self.record(silent, args);
    }
}

impl ChannelCommand for Recording {
    fn execute(
        &self,
        _origin: &dyn Window,
        _server: &Arc<dyn Server>,
        channel: &Arc<dyn Channel>,
        silent: bool,
        args: &CommandArguments,
    ) {
        *self.recorder.last_target.lock().unwrap() = Some(channel.name());
        self.record(silent, args);
    }
}

impl QueryCommand for Recording {
    fn execute(
        &self,
        _origin: &dyn Window,
        _server: &Arc<dyn Server>,
        query: &Arc<dyn Query>,
        silent: bool,
        args: &CommandArguments,
    ) {
        *self.recorder.last_target.lock().unwrap() = Some(query.name());
        self.record(silent, args);
    }
}

impl ChatCommand for Recording {
    fn execute(
        &self,
        _origin: &dyn Window,
        _server: &Arc<dyn Server>,
        target: ChatTarget<'_>,
        silent: bool,
        args: &CommandArguments,
    ) {
        target.send_action(args.arguments_as_string());
        self.record(silent, args);
    }
}
