//! 條件樹
//!
//! 以布林運算式組合動作的多個條件，例如 `(0&1)|!2`：
//! - 數字為條件索引（從 0 開始）
//! - `!` 為否定，`&` 與 `|` 無優先順序之分，一律由左至右結合
//! - 空白會被忽略，空字串代表永遠成立
//! - 巢狀深度（括號、否定與連續運算子）超過 `MAX_DEPTH` 視為格式錯誤

use std::fmt;

/// 樹的最大深度
const MAX_DEPTH: usize = 256;

/// 條件樹節點
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionTree {
    /// 空樹，永遠成立
    Noop,
    /// 第 n 個條件
    Var(usize),
    Not(Box<ConditionTree>),
    And(Box<ConditionTree>, Box<ConditionTree>),
    Or(Box<ConditionTree>, Box<ConditionTree>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Number(usize),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl ConditionTree {
    /// 解析條件運算式，格式錯誤時回傳 None
    pub fn parse(input: &str) -> Option<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Some(ConditionTree::Noop);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let tree = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return None;
        }
        Some(tree)
    }

    /// 所有條件皆成立（`0&1&...&n-1`）
    pub fn conjunction(count: usize) -> Self {
        Self::chain(count, |l, r| ConditionTree::And(Box::new(l), Box::new(r)))
    }

    /// 任一條件成立（`0|1|...|n-1`）
    pub fn disjunction(count: usize) -> Self {
        Self::chain(count, |l, r| ConditionTree::Or(Box::new(l), Box::new(r)))
    }

    fn chain(count: usize, join: impl Fn(Self, Self) -> Self) -> Self {
        (1..count).fold(
            if count == 0 {
                ConditionTree::Noop
            } else {
                ConditionTree::Var(0)
            },
            |acc, i| join(acc, ConditionTree::Var(i)),
        )
    }

    /// 以條件結果求值
    ///
    /// # Panics
    ///
    /// 樹中引用的索引超出 `args` 時 panic，呼叫前應以 `max_argument` 檢查。
    pub fn evaluate(&self, args: &[bool]) -> bool {
        match self {
            ConditionTree::Noop => true,
            ConditionTree::Var(i) => args[*i],
            ConditionTree::Not(inner) => !inner.evaluate(args),
            ConditionTree::And(l, r) => l.evaluate(args) && r.evaluate(args),
            ConditionTree::Or(l, r) => l.evaluate(args) || r.evaluate(args),
        }
    }

    /// 樹中引用的最大條件索引
    pub fn max_argument(&self) -> Option<usize> {
        match self {
            ConditionTree::Noop => None,
            ConditionTree::Var(i) => Some(*i),
            ConditionTree::Not(inner) => inner.max_argument(),
            ConditionTree::And(l, r) | ConditionTree::Or(l, r) => {
                l.max_argument().max(r.max_argument())
            }
        }
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionTree::Noop => Ok(()),
            ConditionTree::Var(i) => write!(f, "{}", i),
            ConditionTree::Not(inner) => write!(f, "!{}", inner),
            ConditionTree::And(l, r) => write!(f, "({}&{})", l, r),
            ConditionTree::Or(l, r) => write!(f, "({}|{})", l, r),
        }
    }
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '!' => Token::Not,
            '&' => Token::And,
            '|' => Token::Or,
            '(' => Token::Open,
            ')' => Token::Close,
            '0'..='9' => {
                let mut digits = String::from(c);
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                // 超出 u32 範圍視為格式錯誤
                let n: u32 = digits.parse().ok()?;
                Token::Number(n as usize)
            }
            _ => return None,
        };
        tokens.push(token);
    }

    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// 目前節點深度的上界
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// 深度加一，超過上限時回傳 None
    fn descend(&mut self) -> Option<()> {
        self.depth += 1;
        (self.depth <= MAX_DEPTH).then_some(())
    }

    /// expr := term (('&' | '|') term)*
    fn expr(&mut self) -> Option<ConditionTree> {
        let base = self.depth;
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    self.descend()?;
                    let right = self.term()?;
                    left = ConditionTree::And(Box::new(left), Box::new(right));
                }
                Some(Token::Or) => {
                    self.pos += 1;
                    self.descend()?;
                    let right = self.term()?;
                    left = ConditionTree::Or(Box::new(left), Box::new(right));
                }
                _ => {
                    self.depth = base;
                    return Some(left);
                }
            }
        }
    }

    /// term := '!' term | '(' expr ')' | number
    fn term(&mut self) -> Option<ConditionTree> {
        let base = self.depth;
        let tree = match self.next()? {
            Token::Not => {
                self.descend()?;
                ConditionTree::Not(Box::new(self.term()?))
            }
            Token::Open => {
                self.descend()?;
                let inner = self.expr()?;
                match self.next()? {
                    Token::Close => inner,
                    _ => return None,
                }
            }
            Token::Number(n) => ConditionTree::Var(n),
            _ => return None,
        };
        self.depth = base;
        Some(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(value: u32, count: usize) -> Vec<bool> {
        (0..count).map(|i| value & (1 << i) != 0).collect()
    }

    #[test]
    fn test_truth_table() {
        let tree = ConditionTree::parse("((0&1&2)|3)&(!4)").unwrap();

        for value in 0..32u32 {
            let args = bits(value, 5);
            let expected = ((args[0] && args[1] && args[2]) || args[3]) && !args[4];
            assert_eq!(tree.evaluate(&args), expected, "輸入 {:05b}", value);
        }
    }

    #[test]
    fn test_empty_is_noop() {
        let tree = ConditionTree::parse("").unwrap();
        assert_eq!(tree, ConditionTree::Noop);
        assert!(tree.evaluate(&[]));
        assert_eq!(tree.to_string(), "");
        assert_eq!(ConditionTree::parse("   "), Some(ConditionTree::Noop));
    }

    #[test]
    fn test_malformed_rejected() {
        for input in ["(0", "0)", "!", "!xy", "0|", "0|!", "0/1", "()", "9999999999999999", "1 2"] {
            assert_eq!(ConditionTree::parse(input), None, "'{}' 應為格式錯誤", input);
        }
    }

    #[test]
    fn test_redundant_parentheses() {
        assert_eq!(
            ConditionTree::parse("(1&3)"),
            ConditionTree::parse("((1&(3)))")
        );
        assert_ne!(ConditionTree::parse("1&3"), ConditionTree::parse("1|3"));
    }

    #[test]
    fn test_left_to_right_without_precedence() {
        // 0|1&2 == (0|1)&2
        let tree = ConditionTree::parse("0|1&2").unwrap();
        assert_eq!(tree.to_string(), "((0|1)&2)");
        assert!(!tree.evaluate(&[true, false, false]));
    }

    #[test]
    fn test_display_roundtrip() {
        for input in ["0", "!0", "0&1", "(0|!1)&2", "!(0&(1|2))", "0 & 1 | 2"] {
            let tree = ConditionTree::parse(input).unwrap();
            let reparsed = ConditionTree::parse(&tree.to_string()).unwrap();
            assert_eq!(tree, reparsed, "'{}' -> '{}'", input, tree);
        }
    }

    #[test]
    fn test_max_argument() {
        assert_eq!(ConditionTree::Noop.max_argument(), None);
        assert_eq!(ConditionTree::parse("0&!(7|2)").unwrap().max_argument(), Some(7));
    }

    #[test]
    fn test_conjunction_and_disjunction() {
        assert_eq!(ConditionTree::conjunction(0), ConditionTree::Noop);
        assert_eq!(ConditionTree::conjunction(1), ConditionTree::Var(0));
        assert_eq!(ConditionTree::conjunction(3).to_string(), "((0&1)&2)");
        assert_eq!(ConditionTree::disjunction(2).to_string(), "(0|1)");

        assert!(ConditionTree::conjunction(3).evaluate(&[true, true, true]));
        assert!(!ConditionTree::conjunction(3).evaluate(&[true, false, true]));
        assert!(ConditionTree::disjunction(3).evaluate(&[false, false, true]));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let negations = format!("{}0", "!".repeat(500_000));
        assert_eq!(ConditionTree::parse(&negations), None);

        let parens = format!("{}0{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(ConditionTree::parse(&parens), None);

        let chain = vec!["0"; 10_000].join("&");
        assert_eq!(ConditionTree::parse(&chain), None);

        let shallow = format!("{}0{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(ConditionTree::parse(&shallow), Some(ConditionTree::Var(0)));
        assert!(ConditionTree::parse(&format!("{}0", "!".repeat(200))).is_some());
    }

    #[test]
    #[should_panic]
    fn test_evaluate_out_of_range_panics() {
        ConditionTree::Var(3).evaluate(&[true]);
    }
}
