//! Tab 補全索引

use std::collections::BTreeSet;
use std::sync::Mutex;

/// 補全索引所屬的視窗範圍
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionScope {
    Global,
    Server,
    Channel,
    Query,
}

/// 單一視窗的 Tab 補全索引
#[derive(Debug, Default)]
pub struct TabCompleter {
    entries: Mutex<BTreeSet<String>>,
}

impl TabCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&self, entry: impl Into<String>) {
        self.lock().insert(entry.into());
    }

    pub fn remove_entry(&self, entry: &str) {
        self.lock().remove(entry);
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.lock().contains(entry)
    }

    /// 以前綴補全（不分大小寫）
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        self.lock()
            .iter()
            .filter(|e| e.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_prefix() {
        let completer = TabCompleter::new();
        completer.add_entry("/away");
        completer.add_entry("/back");
        completer.add_entry("/Amsg");

        assert_eq!(completer.complete("/a"), vec!["/Amsg", "/away"]);
        assert_eq!(completer.complete("/b"), vec!["/back"]);

        completer.remove_entry("/back");
        assert!(completer.complete("/b").is_empty());
    }
}
