//! 內建指令

use std::sync::{Arc, Weak};

use irccore::action::{CoreActionComponent, CoreActionType};
use irccore::command::{
    ChannelCommand, ChatCommand, Command, CommandArguments, CommandInfo, CommandType,
    GlobalCommand, ServerCommand,
};
use irccore::config::ConfigProvider;
use irccore::context::{Channel, ChatTarget, Server, Window};
use tracing::warn;

use crate::config::ShellConfig;
use crate::session::Session;

/// 註冊所有內建指令
pub fn register_builtins(session: &Arc<Session>) {
    let weak = Arc::downgrade(session);

    let builtins: Vec<(CommandInfo, Command)> = vec![
        (
            CommandInfo::new("echo", CommandType::Global).with_help("echo <text> - 顯示文字"),
            Command::Global(Arc::new(Echo)),
        ),
        (
            CommandInfo::new("set", CommandType::Global)
                .with_help("set [domain] [key] [value] - 查看或修改設定"),
            Command::Global(Arc::new(Set(weak.clone()))),
        ),
        (
            CommandInfo::new("unset", CommandType::Global)
                .with_arity(2)
                .with_help("unset <domain> <key> - 移除設定"),
            Command::Global(Arc::new(Unset(weak.clone()))),
        ),
        (
            CommandInfo::new("help", CommandType::Global).with_help("help - 列出指令"),
            Command::Global(Arc::new(Help(weak.clone()))),
        ),
        (
            CommandInfo::new("window", CommandType::Global)
                .with_help("window [name] - 切換視窗，省略名稱回到伺服器視窗"),
            Command::Global(Arc::new(SwitchWindow(weak.clone()))),
        ),
        (
            CommandInfo::new("actions", CommandType::Global)
                .with_help("actions [reload|triggers|components] - 列出或重新載入動作，或列出可用的觸發與元件"),
            Command::Global(Arc::new(Actions(weak.clone()))),
        ),
        (
            CommandInfo::new("options", CommandType::Global)
                .with_arity(1)
                .with_help("options <save|reload> - 儲存或重新載入 /set 的選項"),
            Command::Global(Arc::new(Options(weak.clone()))),
        ),
        (
            CommandInfo::new("away", CommandType::Server).with_help("away <reason> - 設為離開"),
            Command::Server(Arc::new(Away)),
        ),
        (
            CommandInfo::new("back", CommandType::Server)
                .with_arity(0)
                .with_help("back - 取消離開"),
            Command::Server(Arc::new(Back)),
        ),
        (
            CommandInfo::new("raw", CommandType::Server).with_help("raw <line> - 送出原始協定行"),
            Command::Server(Arc::new(Raw)),
        ),
        (
            CommandInfo::new("join", CommandType::Server).with_help("join <#channel> - 加入頻道"),
            Command::Server(Arc::new(Join)),
        ),
        (
            CommandInfo::new("nick", CommandType::Server)
                .with_arity(1)
                .with_help("nick <name> - 更改暱稱"),
            Command::Server(Arc::new(Nick)),
        ),
        (
            CommandInfo::new("msg", CommandType::Server).with_help("msg <target> <text> - 送出訊息"),
            Command::Server(Arc::new(Msg)),
        ),
        (
            CommandInfo::new("inject", CommandType::Server)
                .with_help("inject <raw> - 模擬收到一行協定訊息")
                .hidden(),
            Command::Server(Arc::new(Inject(weak.clone()))),
        ),
        (
            CommandInfo::new("part", CommandType::Channel).with_help("part [reason] - 離開頻道"),
            Command::Channel(Arc::new(Part)),
        ),
        (
            CommandInfo::new("me", CommandType::Chat).with_help("me <action> - 送出動作"),
            Command::Chat(Arc::new(Me)),
        ),
    ];

    for (info, command) in builtins {
        if let Err(e) = session.commands().register_command(info, command) {
            warn!("無法註冊內建指令: {}", e);
        }
    }
}

fn usage(origin: &dyn Window, text: &str) {
    origin.add_line("commandUsage", &[text.to_string()]);
}

struct Echo;

impl GlobalCommand for Echo {
    fn execute(&self, origin: &dyn Window, silent: bool, args: &CommandArguments) {
        if !silent {
            origin.add_line("commandOutput", &[args.arguments_as_string().to_string()]);
        }
    }
}

struct Set(Weak<Session>);

impl GlobalCommand for Set {
    fn execute(&self, origin: &dyn Window, silent: bool, args: &CommandArguments) {
        let Some(session) = self.0.upgrade() else {
            return;
        };
        let config = session.config();

        match args.arguments().as_slice() {
            [] | [_] => {
                let domain = args.arguments().first().copied().unwrap_or("general");
                let mut options: Vec<_> = config.options(domain).into_iter().collect();
                options.sort();
                for (key, value) in options {
                    origin.add_line("commandOutput", &[format!("{}.{} = {}", domain, key, value)]);
                }
            }
            [domain, key] => {
                let value = config.option(domain, key).unwrap_or_default();
                origin.add_line("commandOutput", &[format!("{}.{} = {}", domain, key, value)]);
            }
            [domain, key, ..] => {
                let value = args.arguments_as_string_from(2).to_string();
                config.set_option(domain, key, value.clone());
                if !silent {
                    origin.add_line("commandOutput", &[format!("{}.{} = {}", domain, key, value)]);
                }
            }
        }
    }
}

struct Unset(Weak<Session>);

impl GlobalCommand for Unset {
    fn execute(&self, origin: &dyn Window, silent: bool, args: &CommandArguments) {
        let Some(session) = self.0.upgrade() else {
            return;
        };
        let arguments = args.arguments();
        let removed = session.config().unset_option(arguments[0], arguments[1]);
        if !silent && removed.is_none() {
            origin.add_line("commandError", &[format!("{}.{} 不存在", arguments[0], arguments[1])]);
        }
    }
}

struct Help(Weak<Session>);

impl GlobalCommand for Help {
    fn execute(&self, origin: &dyn Window, _silent: bool, _args: &CommandArguments) {
        let Some(session) = self.0.upgrade() else {
            return;
        };
        let command_char = session.config().command_char();
        for info in session.commands().commands(None) {
            if info.show_in_help {
                origin.add_line(
                    "commandOutput",
                    &[format!("{}{} [{}] {}", command_char, info.name, info.command_type, info.help)],
                );
            }
        }
    }
}

struct SwitchWindow(Weak<Session>);

impl GlobalCommand for SwitchWindow {
    fn execute(&self, origin: &dyn Window, _silent: bool, args: &CommandArguments) {
        let Some(session) = self.0.upgrade() else {
            return;
        };
        let name = args.arguments_as_string().trim();
        if session.set_active(name) {
            origin.add_line("windowChanged", &[session.active_name()]);
        } else {
            origin.add_line("commandError", &[format!("沒有名為 {} 的視窗", name)]);
        }
    }
}

struct Actions(Weak<Session>);

impl GlobalCommand for Actions {
    fn execute(&self, origin: &dyn Window, _silent: bool, args: &CommandArguments) {
        let Some(session) = self.0.upgrade() else {
            return;
        };
        let actions = session.actions();

        let sub = args.arguments().first().map(|a| a.to_lowercase());
        match sub.as_deref() {
            Some("triggers") => {
                for trigger in CoreActionType::ALL {
                    origin.add_line(
                        "commandOutput",
                        &[format!("{} ({}) - {}", trigger.name(), trigger.arg_names().join(", "), trigger.description())],
                    );
                }
                return;
            }
            Some("components") => {
                for component in CoreActionComponent::ALL {
                    origin.add_line(
                        "commandOutput",
                        &[format!("{} [{:?}] - {}", component.name(), component.applies_to(), component.description())],
                    );
                }
                return;
            }
            _ => {}
        }

        if sub.as_deref() == Some("reload") {
            for group in actions.groups() {
                actions.remove_group(&group);
            }
            match actions.load_actions(ShellConfig::actions_dir()) {
                Ok(n) => origin.add_line("commandOutput", &[format!("已載入 {} 個動作", n)]),
                Err(e) => origin.add_line("commandError", &[e.to_string()]),
            }
            return;
        }

        for group in actions.groups() {
            for action in actions.group(&group) {
                let triggers: Vec<&str> = action.triggers().iter().map(|t| t.name()).collect();
                origin.add_line(
                    "commandOutput",
                    &[format!("{}/{} ({})", group, action.name(), triggers.join(", "))],
                );
            }
        }
    }
}

struct Options(Weak<Session>);

impl GlobalCommand for Options {
    fn execute(&self, origin: &dyn Window, silent: bool, args: &CommandArguments) {
        let Some(session) = self.0.upgrade() else {
            return;
        };
        let path = ShellConfig::options_path();
        let result = match args.arguments()[0].to_lowercase().as_str() {
            "save" => session.save_options(&path),
            "reload" => session.reload_options(&path),
            _ => {
                usage(origin, "options <save|reload>");
                return;
            }
        };
        match result {
            Ok(()) if !silent => origin.add_line("commandOutput", &[path.display().to_string()]),
            Ok(()) => {}
            Err(e) => origin.add_line("commandError", &[e.to_string()]),
        }
    }
}

struct Away;

impl ServerCommand for Away {
    fn execute(&self, origin: &dyn Window, server: &Arc<dyn Server>, _silent: bool, args: &CommandArguments) {
        let reason = args.arguments_as_string();
        if reason.is_empty() {
            usage(origin, "away <reason>");
            return;
        }
        server.send_line(&format!("AWAY :{}", reason));
    }
}

struct Back;

impl ServerCommand for Back {
    fn execute(&self, _origin: &dyn Window, server: &Arc<dyn Server>, _silent: bool, _args: &CommandArguments) {
        server.send_line("AWAY");
    }
}

struct Raw;

impl ServerCommand for Raw {
    fn execute(&self, origin: &dyn Window, server: &Arc<dyn Server>, _silent: bool, args: &CommandArguments) {
        match args.arguments_as_string() {
            "" => usage(origin, "raw <line>"),
            line => server.send_line(line),
        }
    }
}

struct Join;

impl ServerCommand for Join {
    fn execute(&self, origin: &dyn Window, server: &Arc<dyn Server>, _silent: bool, args: &CommandArguments) {
        let channels: Vec<&str> = args
            .arguments()
            .into_iter()
            .filter(|c| server.is_valid_channel_name(c))
            .collect();
        if channels.is_empty() {
            usage(origin, "join <#channel>");
            return;
        }
        server.send_line(&format!("JOIN {}", channels.join(",")));
    }
}

struct Nick;

impl ServerCommand for Nick {
    fn execute(&self, _origin: &dyn Window, server: &Arc<dyn Server>, _silent: bool, args: &CommandArguments) {
        server.send_line(&format!("NICK {}", args.arguments_as_string()));
    }
}

struct Msg;

impl ServerCommand for Msg {
    fn execute(&self, origin: &dyn Window, server: &Arc<dyn Server>, _silent: bool, args: &CommandArguments) {
        if args.argument_count() < 2 {
            usage(origin, "msg <target> <text>");
            return;
        }
        let target = args.arguments()[0];
        let text = args.arguments_as_string_from(1);
        match server.channel(target) {
            Some(channel) => channel.send_message(text),
            None => server.send_line(&format!("PRIVMSG {} :{}", target, text)),
        }
    }
}

struct Inject(Weak<Session>);

impl ServerCommand for Inject {
    fn execute(&self, _origin: &dyn Window, _server: &Arc<dyn Server>, _silent: bool, args: &CommandArguments) {
        if let Some(session) = self.0.upgrade() {
            session.server().receive(args.arguments_as_string());
        }
    }
}

struct Part;

impl ChannelCommand for Part {
    fn execute(
        &self,
        _origin: &dyn Window,
        server: &Arc<dyn Server>,
        channel: &Arc<dyn Channel>,
        _silent: bool,
        args: &CommandArguments,
    ) {
        let reason = args.arguments_as_string();
        if reason.is_empty() {
            server.send_line(&format!("PART {}", channel.name()));
        } else {
            server.send_line(&format!("PART {} :{}", channel.name(), reason));
        }
    }
}

struct Me;

impl ChatCommand for Me {
    fn execute(
        &self,
        origin: &dyn Window,
        _server: &Arc<dyn Server>,
        target: ChatTarget<'_>,
        _silent: bool,
        args: &CommandArguments,
    ) {
        match args.arguments_as_string() {
            "" => usage(origin, "me <action>"),
            text => target.send_action(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use irccore::command::Dispatch;
    use tokio::sync::mpsc;

    fn session() -> (Arc<Session>, mpsc::UnboundedReceiver<String>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = ShellConfig {
            nickname: "tester".to_string(),
            channels: vec!["#rust".to_string()],
            ..ShellConfig::default()
        };
        let session = Session::new(&config, tx);
        session.connect();
        while rx.try_recv().is_ok() {}
        (session, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_away_and_back() {
        let (session, mut rx) = session();
        session.handle_line("/away lunch");
        assert_eq!(session.server().away_message().as_deref(), Some("lunch"));
        assert_eq!(drain(&mut rx), vec!["[send] AWAY :lunch"]);

        session.handle_line("/back");
        assert_eq!(session.server().away_message(), None);
    }

    #[test]
    fn test_channel_window_and_me() {
        let (session, mut rx) = session();
        assert!(session.set_active("#rust"));
        assert!(matches!(session.handle_line("/me waves"), Dispatch::Executed { .. }));
        let lines = drain(&mut rx);
        assert_eq!(lines[0], "[send] PRIVMSG #rust :\u{1}ACTION waves\u{1}");
        assert_eq!(lines[1], "[channelSelfAction] #rust tester waves");

        session.handle_line("/part bye");
        assert!(session.server().channel_by_name("#rust").is_none());
    }

    #[test]
    fn test_set_changes_command_char() {
        let (session, mut rx) = session();
        session.handle_line("/.set general commandchar !");
        assert!(matches!(session.handle_line("!echo hi"), Dispatch::Executed { .. }));
        assert_eq!(drain(&mut rx), vec!["[commandOutput] hi"]);
    }

    #[test]
    fn test_unknown_command_line() {
        let (session, mut rx) = session();
        session.handle_line("/nosuch a b");
        assert_eq!(drain(&mut rx), vec!["[unknownCommand] nosuch/2"]);
    }

    #[test]
    fn test_actions_catalog() {
        let (session, mut rx) = session();
        session.handle_line("/actions triggers");
        let lines = drain(&mut rx);
        assert_eq!(lines.len(), CoreActionType::ALL.len());
        assert!(lines.contains(&"[commandOutput] UNKNOWN_COMMAND (command, arguments) - unknown command entered".to_string()));

        session.handle_line("/actions components");
        assert_eq!(drain(&mut rx).len(), CoreActionComponent::ALL.len());
    }

    #[test]
    fn test_options_save_and_reload() {
        let (session, _rx) = session();
        let path = std::env::temp_dir().join(format!("ircshell-options-{}.json", std::process::id()));

        session.handle_line("/.set general commandchar !");
        session.save_options(&path).unwrap();

        session.config().set_option("general", "commandchar", "#");
        session.config().set_option("actions", "greeting", "hi");
        session.reload_options(&path).unwrap();
        assert_eq!(session.config().command_char(), '!');
        assert_eq!(session.config().option("actions", "greeting"), None);

        let _ = std::fs::remove_file(&path);
        assert!(session.reload_options(&path).is_err());
        assert_eq!(session.config().command_char(), '!');
    }

    #[test]
    fn test_inject_opens_query() {
        let (session, mut rx) = session();
        session.handle_line("/inject :friend!f@example.org PRIVMSG tester :hello there");
        assert!(session.server().query_by_name("friend").is_some());
        assert_eq!(drain(&mut rx), vec!["[queryMessage] friend hello there"]);
    }
}
