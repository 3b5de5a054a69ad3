//! 輸入行切分
//!
//! 將一行輸入切為以空白分隔的「字」；「參數」為去掉第一個字（指令名稱）後的部分。

use std::ops::Range;
use std::sync::OnceLock;

/// 一行輸入及其解析結果
#[derive(Debug, Clone)]
pub struct CommandArguments {
    /// 原始輸入
    line: String,
    command_char: char,
    silence_char: char,
    /// 每個字在 `line` 中的位元組範圍（延遲計算，只算一次）
    spans: OnceLock<Vec<Range<usize>>>,
}

impl CommandArguments {
    /// 以指定的指令字元與靜音字元解析一行輸入
    pub fn new(line: impl Into<String>, command_char: char, silence_char: char) -> Self {
        Self {
            line: line.into(),
            command_char,
            silence_char,
            spans: OnceLock::new(),
        }
    }

    /// 由字串列表組成（以單一空白連接）
    pub fn from_words<I, S>(words: I, command_char: char, silence_char: char) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = words
            .into_iter()
            .map(|w| w.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(line, command_char, silence_char)
    }

    /// 原始輸入（含指令字元）
    pub fn line(&self) -> &str {
        &self.line
    }

    /// 是否為指令（非空且以指令字元開頭）
    pub fn is_command(&self) -> bool {
        self.line.starts_with(self.command_char)
    }

    /// 是否為靜音指令（指令字元後緊接靜音字元）
    pub fn is_silent(&self) -> bool {
        self.is_command() && self.line.chars().nth(1) == Some(self.silence_char)
    }

    /// 指令字元與靜音字元佔用的字元數
    fn prefix_len(&self) -> usize {
        match (self.is_command(), self.is_silent()) {
            (true, true) => 2,
            (true, false) => 1,
            _ => 0,
        }
    }

    /// 去掉指令字元與靜音字元後的輸入
    pub fn stripped_line(&self) -> &str {
        skip_chars(&self.line, self.prefix_len())
    }

    /// 指令名稱（第一個字去掉前綴）
    pub fn command_name(&self) -> &str {
        self.word(0)
            .map(|w| skip_chars(w, self.prefix_len()))
            .unwrap_or("")
    }

    fn spans(&self) -> &[Range<usize>] {
        self.spans.get_or_init(|| word_spans(&self.line))
    }

    fn word(&self, index: usize) -> Option<&str> {
        self.spans().get(index).map(|r| &self.line[r.clone()])
    }

    /// 所有字（第一個為含前綴的指令名稱）
    pub fn words(&self) -> Vec<&str> {
        self.spans().iter().map(|r| &self.line[r.clone()]).collect()
    }

    /// 字數
    pub fn word_count(&self) -> usize {
        self.spans().len()
    }

    /// 參數（不含指令名稱）
    pub fn arguments(&self) -> Vec<&str> {
        self.words().into_iter().skip(1).collect()
    }

    /// 參數個數
    pub fn argument_count(&self) -> usize {
        self.word_count().saturating_sub(1)
    }

    /// 所有參數，保留原始空白
    pub fn arguments_as_string(&self) -> &str {
        self.arguments_as_string_from(0)
    }

    /// 從第 `start` 個參數開始，保留原始空白
    pub fn arguments_as_string_from(&self, start: usize) -> &str {
        let end = start.max(self.word_count().saturating_sub(2));
        self.arguments_as_string_range(start, end)
    }

    /// 第 `start` 到第 `end` 個參數（含），保留原始空白
    ///
    /// # Panics
    ///
    /// `start > end` 時 panic。
    pub fn arguments_as_string_range(&self, start: usize, end: usize) -> &str {
        self.words_as_string_range(start + 1, end + 1)
    }

    /// 從第 `start` 個字開始，保留原始空白
    pub fn words_as_string_from(&self, start: usize) -> &str {
        let end = start.max(self.word_count().saturating_sub(1));
        self.words_as_string_range(start, end)
    }

    /// 第 `start` 到第 `end` 個字（含），保留原始空白
    ///
    /// 範圍超出字數（`end` 不小於字數）時回傳空字串。
    /// 包含最後一個字時，行尾的空白也會保留。
    ///
    /// # Panics
    ///
    /// `start > end` 時 panic（呼叫端錯誤）。
    pub fn words_as_string_range(&self, start: usize, end: usize) -> &str {
        assert!(
            start <= end,
            "word range start ({start}) must not exceed end ({end})"
        );

        let spans = self.spans();
        if end >= spans.len() {
            return "";
        }

        let from = spans[start].start;
        let to = if end == spans.len() - 1 {
            self.line.len()
        } else {
            spans[end].end
        };
        &self.line[from..to]
    }
}

/// 略過前 n 個字元
fn skip_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

/// 計算每個非空白片段的位元組範圍
fn word_spans(line: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;

    for (idx, c) in line.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push(s..idx);
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(s) = start {
        spans.push(s..line.len());
    }

    spans
}
