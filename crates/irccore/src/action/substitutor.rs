//! 動作變數替換
//!
//! 支援的語法：
//! - `\$` 與 `\\`：跳脫字元，其他反斜線保持原樣
//! - `$N`、`$N-`、`$N-M`：訊息參數的第 N 個字（從 1 開始）或字的範圍
//! - `${N.COMPONENT...}`：第 N 個參數（從 0 開始）經元件串接後的值
//! - `$name`、`${name}`：`actions` 網域的設定值，值本身會再被替換
//! - `${SERVER_...}`：第一個參數所屬伺服器的元件
//!
//! `${...}` 內的文字會先替換再查詢，因此可以巢狀使用；
//! 巢狀或設定值遞迴超過 `MAX_DEPTH` 層時停止展開。
//! 元件與取字的結果不會再次替換。

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::action_type::CoreActionType;
use super::component::ComponentChain;
use super::value::{ActionArgument, ValueType};
use crate::config::ConfigProvider;

/// 元件不存在或型別不符
pub const ILLEGAL_COMPONENT: &str = "illegal_component";
/// 變數未定義
pub const NOT_DEFINED: &str = "not_defined";
/// 需要連線但伺服器不存在或未連線
pub const NOT_CONNECTED: &str = "not_connected";

/// 巢狀 `${...}` 與設定值遞迴替換的深度上限
const MAX_DEPTH: usize = 16;

/// 變數所在的設定網域
const ACTIONS_DOMAIN: &str = "actions";

lazy_static::lazy_static! {
    static ref WORD_RANGE: Regex = Regex::new(r"^([0-9]+)(-([0-9]+)?)?$").expect("word range pattern");
    static ref ARGUMENT_COMPONENT: Regex =
        Regex::new(r"^([0-9]+)\.([A-Z_]+(?:\.[A-Z_]+)*)$").expect("argument component pattern");
    static ref SERVER_COMPONENT: Regex =
        Regex::new(r"^[A-Z_]+(?:\.[A-Z_]+)*$").expect("server component pattern");
}

/// 特定觸發類型的變數替換器
pub struct ActionSubstitutor {
    action_type: CoreActionType,
    config: Arc<dyn ConfigProvider>,
}

impl ActionSubstitutor {
    pub fn new(action_type: CoreActionType, config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            action_type,
            config,
        }
    }

    pub fn action_type(&self) -> CoreActionType {
        self.action_type
    }

    /// 替換 `text` 中的所有變數
    pub fn substitute(&self, text: &str, args: &[ActionArgument]) -> String {
        self.substitute_at(text, args, 0)
    }

    fn substitute_at(&self, text: &str, args: &[ActionArgument], depth: usize) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '\\' => match chars.get(i + 1) {
                    Some(&next @ ('$' | '\\')) => {
                        out.push(next);
                        i += 2;
                    }
                    _ => {
                        out.push('\\');
                        i += 1;
                    }
                },
                '$' => {
                    let (consumed, replacement) = self.variable_at(&chars[i..], args, depth);
                    out.push_str(&replacement);
                    i += consumed;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        out
    }

    /// 解析 `$` 開頭的變數，回傳（消耗的字元數，替換結果）
    fn variable_at(&self, chars: &[char], args: &[ActionArgument], depth: usize) -> (usize, String) {
        let literal = |len: usize| (len, chars[..len].iter().collect::<String>());

        match chars.get(1) {
            Some('{') => {
                let Some(close) = matching_brace(chars, 1) else {
                    return literal(1);
                };
                if depth >= MAX_DEPTH {
                    debug!("巢狀變數過深，保留原文");
                    return literal(close + 1);
                }
                let inner: String = chars[2..close].iter().collect();
                let key = self.substitute_at(&inner, args, depth + 1);
                match self.resolve(&key, args, depth) {
                    Some(value) => (close + 1, value),
                    None => literal(close + 1),
                }
            }
            Some(c) if c.is_ascii_digit() => {
                let mut end = 1 + count_while(&chars[1..], |c| c.is_ascii_digit());
                if chars.get(end) == Some(&'-') {
                    end += 1;
                    end += count_while(&chars[end..], |c| c.is_ascii_digit());
                }
                let key: String = chars[1..end].iter().collect();
                match self.resolve(&key, args, depth) {
                    Some(value) => (end, value),
                    None => literal(end),
                }
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let end = 1 + count_while(&chars[1..], |c| c.is_ascii_alphanumeric() || c == '_');
                let key: String = chars[1..end].iter().collect();
                match self.resolve(&key, args, depth) {
                    Some(value) => (end, value),
                    None => literal(end),
                }
            }
            _ => literal(1),
        }
    }

    /// 查詢變數值；None 表示保留原文
    fn resolve(&self, key: &str, args: &[ActionArgument], depth: usize) -> Option<String> {
        if let Some(caps) = WORD_RANGE.captures(key) {
            let start = caps.get(1)?.as_str().parse::<usize>().ok()?;
            let end = match (caps.get(2), caps.get(3)) {
                (None, _) => Some(start),
                (Some(_), None) => None,
                (Some(_), Some(m)) => Some(m.as_str().parse::<usize>().ok()?),
            };
            return self.words(args, start, end);
        }

        if let Some(caps) = ARGUMENT_COMPONENT.captures(key) {
            let index = caps.get(1)?.as_str();
            let chain = caps.get(2)?.as_str();
            return Some(argument_component(args, index, chain));
        }

        if let Some(value) = self.config.option(ACTIONS_DOMAIN, key) {
            if depth >= MAX_DEPTH {
                debug!("變數 '{}' 遞迴過深", key);
                return Some(NOT_DEFINED.to_string());
            }
            return Some(self.substitute_at(&value, args, depth + 1));
        }

        if SERVER_COMPONENT.is_match(key) {
            return Some(server_component(args, key));
        }

        Some(NOT_DEFINED.to_string())
    }

    /// 訊息參數的第 `start` 到第 `end` 個字（從 1 開始，`end` 為 None 表示到最後）
    fn words(&self, args: &[ActionArgument], start: usize, end: Option<usize>) -> Option<String> {
        let message = self
            .action_type
            .message_argument()
            .and_then(|i| args.get(i))
            .and_then(ActionArgument::as_str)?;
        let words: Vec<&str> = message.split_whitespace().collect();

        if start == 0 || start > words.len() {
            return None;
        }
        let last = end.unwrap_or(words.len()).min(words.len());
        if last < start {
            return None;
        }
        Some(words[start - 1..last].join(" "))
    }
}

fn argument_component(args: &[ActionArgument], index: &str, chain: &str) -> String {
    let Some(arg) = index.parse::<usize>().ok().and_then(|i| args.get(i)) else {
        return ILLEGAL_COMPONENT.to_string();
    };
    let Ok(chain) = ComponentChain::parse(arg.value_type(), chain) else {
        return ILLEGAL_COMPONENT.to_string();
    };
    if chain.requires_connection() && !arg.server().is_some_and(|s| s.is_connected()) {
        return NOT_CONNECTED.to_string();
    }
    chain
        .get(arg)
        .map(|v| v.to_string())
        .unwrap_or_else(|| ILLEGAL_COMPONENT.to_string())
}

fn server_component(args: &[ActionArgument], key: &str) -> String {
    let Ok(chain) = ComponentChain::parse(ValueType::Server, key) else {
        return ILLEGAL_COMPONENT.to_string();
    };
    let Some(server) = args.first().and_then(ActionArgument::server) else {
        return NOT_CONNECTED.to_string();
    };
    if chain.requires_connection() && !server.is_connected() {
        return NOT_CONNECTED.to_string();
    }
    chain
        .get(&ActionArgument::Server(server))
        .map(|v| v.to_string())
        .unwrap_or_else(|| ILLEGAL_COMPONENT.to_string())
}

/// 找出與 `open` 位置的 `{` 對應的 `}`
fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in chars.iter().enumerate().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn count_while(chars: &[char], pred: impl Fn(char) -> bool) -> usize {
    chars.iter().take_while(|c| pred(**c)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::testing::{MockChannel, MockServer, MockUser};

    fn substitutor() -> (ActionSubstitutor, Vec<ActionArgument>, Arc<MockServer>) {
        let config = Arc::new(ConfigStore::new());
        config.set_option("actions", "alpha", "A");
        config.set_option("actions", "bravo", "$alpha");
        config.set_option("actions", "charlie", "${bravo}");
        config.set_option("actions", "delta", "${${bravo}${bravo}}");
        config.set_option("actions", "AA", "win!");

        let server = MockServer::disconnected("irc.example.net");
        server.set_protocol("$alpha");
        server.set_away("foo");
        let channel = MockChannel::join(&server, "#test");
        let user = MockUser::new("nick");

        let args = vec![
            ActionArgument::Channel(channel),
            ActionArgument::User(user),
            ActionArgument::from("1 2 3 fourth_word_here 5 6 7"),
        ];
        (
            ActionSubstitutor::new(CoreActionType::ChannelMessage, config),
            args,
            server,
        )
    }

    #[test]
    fn test_substitutions() {
        let (sub, args, _server) = substitutor();
        let cases = [
            ("no subs here!", "no subs here!"),
            ("$alpha", "A"),
            ("--$alpha--", "--A--"),
            ("$1", "1"),
            ("$4", "fourth_word_here"),
            ("$5-", "5 6 7"),
            ("${2.STRING_LENGTH}", "28"),
            ("${2.STRING_STRING}", "1 2 3 fourth_word_here 5 6 7"),
            ("${SERVER_MYAWAYREASON}", "foo"),
            ("${1}${2.STRING_LENGTH}$alpha", "128A"),
            ("$alpha$4${SERVER_MYAWAYREASON}", "Afourth_word_herefoo"),
            ("${alpha}", "A"),
            ("\\$alpha", "$alpha"),
            ("$bravo", "A"),
            ("$charlie", "A"),
            ("$delta", "win!"),
            ("$sigma", "not_defined"),
            ("$5-6", "5 6"),
            ("${5-6}", "5 6"),
            ("${5-$6}", "5 6"),
            ("${5-${${6}}}", "5 6"),
            ("${2.STRING_STRING.STRING_LENGTH}", "28"),
            ("${2.STRING_FLUB.STRING_LENGTH}", "illegal_component"),
            ("${SERVER_NETWORKFOO}", "illegal_component"),
            ("${SERVER_NETWORK}", "not_connected"),
            ("${SERVER_PROTOCOL}", "$alpha"),
            ("\\$1", "$1"),
            ("\\$alpha $alpha", "$alpha A"),
            ("\\$$1", "$1"),
            ("\\\\$4", "\\fourth_word_here"),
            ("\\\\${4}", "\\fourth_word_here"),
            ("\\\\\\$4", "\\$4"),
            ("${0.CHANNEL_NAME}", "#test"),
            ("${1.USER_NAME}", "nick"),
            ("${1.STRING_LENGTH}", "illegal_component"),
            ("${9.STRING_LENGTH}", "illegal_component"),
            ("$ 1", "$ 1"),
        ];

        for (input, expected) in cases {
            assert_eq!(sub.substitute(input, &args), expected, "替換 '{}'", input);
        }
    }

    #[test]
    fn test_out_of_range_words_kept_literal() {
        let (sub, args, _server) = substitutor();
        assert_eq!(sub.substitute("$8", &args), "$8");
        assert_eq!(sub.substitute("${0}", &args), "${0}");
        assert_eq!(sub.substitute("$7-100", &args), "7");
        assert_eq!(sub.substitute("$5-2", &args), "$5-2");
    }

    #[test]
    fn test_connected_server_components() {
        let (sub, args, server) = substitutor();
        server.set_connected(true);
        server.set_network("ExampleNet");
        assert_eq!(sub.substitute("${SERVER_NETWORK}", &args), "ExampleNet");
        assert_eq!(sub.substitute("on ${SERVER_NAME}", &args), "on irc.example.net");
    }

    #[test]
    fn test_unbalanced_brace_is_literal() {
        let (sub, args, _server) = substitutor();
        assert_eq!(sub.substitute("${alpha", &args), "${alpha");
        assert_eq!(sub.substitute("cost: $", &args), "cost: $");
    }

    #[test]
    fn test_self_reference_terminates() {
        let config = Arc::new(ConfigStore::new());
        config.set_option("actions", "loop", "$loop");
        let sub = ActionSubstitutor::new(CoreActionType::ServerConnected, config);
        assert_eq!(sub.substitute("$loop", &[]), "not_defined");
    }

    #[test]
    fn test_deep_braces_stop_expanding() {
        let (sub, args, _server) = substitutor();
        let deep = format!("{}alpha{}", "${".repeat(100_000), "}".repeat(100_000));
        assert_eq!(sub.substitute(&deep, &args), "not_defined");

        let nested = format!("{}1{}", "${".repeat(4), "}".repeat(4));
        assert_eq!(sub.substitute(&nested, &args), "1");
        assert_eq!(sub.substitute("${${alpha}A}", &args), "win!");
    }

    #[test]
    fn test_no_server_argument() {
        let config = Arc::new(ConfigStore::new());
        let sub = ActionSubstitutor::new(CoreActionType::UnknownCommand, config);
        let args = [
            ActionArgument::from("foo"),
            ActionArgument::StringArray(vec!["a".into(), "b".into()]),
        ];
        assert_eq!(sub.substitute("${SERVER_NAME}", &args), "not_connected");
        assert_eq!(sub.substitute("$1 ${1.STRINGARRAY_LENGTH}", &args), "foo 2");
    }
}
