//! 動作比較

use std::fmt;

use regex::Regex;
use tracing::warn;

use super::value::{ActionArgument, ValueType};

/// 內建比較
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreActionComparison {
    StringRegex,
    StringEquals,
    StringNotEquals,
    StringStartsWith,
    StringContains,
    StringNotContains,
    BoolIs,
    IntEquals,
    IntGreater,
    IntLess,
}

impl CoreActionComparison {
    pub const ALL: [CoreActionComparison; 10] = [
        CoreActionComparison::StringRegex,
        CoreActionComparison::StringEquals,
        CoreActionComparison::StringNotEquals,
        CoreActionComparison::StringStartsWith,
        CoreActionComparison::StringContains,
        CoreActionComparison::StringNotContains,
        CoreActionComparison::BoolIs,
        CoreActionComparison::IntEquals,
        CoreActionComparison::IntGreater,
        CoreActionComparison::IntLess,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CoreActionComparison::StringRegex => "STRING_REGEX",
            CoreActionComparison::StringEquals => "STRING_EQUALS",
            CoreActionComparison::StringNotEquals => "STRING_NEQUALS",
            CoreActionComparison::StringStartsWith => "STRING_STARTSWITH",
            CoreActionComparison::StringContains => "STRING_CONTAINS",
            CoreActionComparison::StringNotContains => "STRING_NCONTAINS",
            CoreActionComparison::BoolIs => "BOOL_IS",
            CoreActionComparison::IntEquals => "INT_EQUALS",
            CoreActionComparison::IntGreater => "INT_GREATER",
            CoreActionComparison::IntLess => "INT_LESS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// 可比較的值型別
    pub fn applies_to(self) -> ValueType {
        match self {
            CoreActionComparison::BoolIs => ValueType::Bool,
            CoreActionComparison::IntEquals
            | CoreActionComparison::IntGreater
            | CoreActionComparison::IntLess => ValueType::Int,
            _ => ValueType::String,
        }
    }

    /// 比較 `value` 與 `target`
    ///
    /// 型別不符、整數 / 布林目標無法解析或正則錯誤時視為不成立。
    pub fn test(self, value: &ActionArgument, target: &str) -> bool {
        match (self, value) {
            (CoreActionComparison::StringRegex, ActionArgument::String(s)) => match Regex::new(target) {
                Ok(re) => re.is_match(s),
                Err(e) => {
                    warn!("無效的正則表達式 '{}': {}", target, e);
                    false
                }
            },
            (CoreActionComparison::StringEquals, ActionArgument::String(s)) => s.eq_ignore_ascii_case(target),
            (CoreActionComparison::StringNotEquals, ActionArgument::String(s)) => !s.eq_ignore_ascii_case(target),
            (CoreActionComparison::StringStartsWith, ActionArgument::String(s)) => {
                s.to_lowercase().starts_with(&target.to_lowercase())
            }
            (CoreActionComparison::StringContains, ActionArgument::String(s)) => {
                s.to_lowercase().contains(&target.to_lowercase())
            }
            (CoreActionComparison::StringNotContains, ActionArgument::String(s)) => {
                !s.to_lowercase().contains(&target.to_lowercase())
            }
            (CoreActionComparison::BoolIs, ActionArgument::Bool(b)) => {
                target.trim().parse::<bool>().map_or(false, |t| *b == t)
            }
            (CoreActionComparison::IntEquals, ActionArgument::Int(n)) => parse_int(target).map_or(false, |t| *n == t),
            (CoreActionComparison::IntGreater, ActionArgument::Int(n)) => parse_int(target).map_or(false, |t| *n > t),
            (CoreActionComparison::IntLess, ActionArgument::Int(n)) => parse_int(target).map_or(false, |t| *n < t),
            _ => false,
        }
    }
}

fn parse_int(target: &str) -> Option<i64> {
    target.trim().parse().ok()
}

impl fmt::Display for CoreActionComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> ActionArgument {
        ActionArgument::from(v)
    }

    #[test]
    fn test_string_comparisons() {
        assert!(CoreActionComparison::StringEquals.test(&s("Hello"), "hello"));
        assert!(CoreActionComparison::StringNotEquals.test(&s("Hello"), "world"));
        assert!(CoreActionComparison::StringStartsWith.test(&s("Hello world"), "HELLO"));
        assert!(CoreActionComparison::StringContains.test(&s("Hello world"), "o w"));
        assert!(CoreActionComparison::StringNotContains.test(&s("Hello world"), "xyz"));
    }

    #[test]
    fn test_regex_comparison() {
        assert!(CoreActionComparison::StringRegex.test(&s("abc123"), r"^[a-z]+\d+$"));
        assert!(!CoreActionComparison::StringRegex.test(&s("abc"), r"^\d+$"));
        // 無效的正則不成立
        assert!(!CoreActionComparison::StringRegex.test(&s("abc"), "(unclosed"));
    }

    #[test]
    fn test_int_comparisons() {
        let v = ActionArgument::Int(28);
        assert!(CoreActionComparison::IntEquals.test(&v, "28"));
        assert!(CoreActionComparison::IntGreater.test(&v, "10"));
        assert!(CoreActionComparison::IntLess.test(&v, " 30 "));
        assert!(!CoreActionComparison::IntEquals.test(&v, "abc"));
    }

    #[test]
    fn test_type_mismatch_is_false() {
        assert!(!CoreActionComparison::IntEquals.test(&s("28"), "28"));
        assert!(!CoreActionComparison::StringEquals.test(&ActionArgument::Int(1), "1"));
        assert!(CoreActionComparison::BoolIs.test(&ActionArgument::Bool(true), "true"));
        assert!(!CoreActionComparison::BoolIs.test(&ActionArgument::Bool(true), "maybe"));
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(
            CoreActionComparison::from_name("STRING_NCONTAINS"),
            Some(CoreActionComparison::StringNotContains)
        );
        assert_eq!(CoreActionComparison::from_name("STRING_FOO"), None);
        assert_eq!(CoreActionComparison::IntLess.applies_to(), ValueType::Int);
    }
}
