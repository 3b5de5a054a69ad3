//! 動作管理器
//!
//! 依觸發類型與群組保存動作，事件發生時依序檢查並執行。
//! 動作檔存放在 `<dir>/<群組>/<名稱>.json`。

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::action_type::CoreActionType;
use super::model::{Action, ActionRecord};
use super::substitutor::ActionSubstitutor;
use super::value::ActionArgument;
use super::ActionError;
use crate::command::CommandParser;
use crate::config::ConfigProvider;
use crate::context::Window;

/// 動作回應再觸發事件的最大巢狀層數
const MAX_EVENT_NESTING: usize = 8;

/// 進行中的事件層數，離開時自動遞減
struct EventNesting<'a>(&'a AtomicUsize);

impl<'a> EventNesting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Option<Self> {
        if counter.fetch_add(1, Ordering::SeqCst) >= MAX_EVENT_NESTING {
            counter.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(Self(counter))
    }
}

impl Drop for EventNesting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Registry {
    by_trigger: HashMap<CoreActionType, Vec<Arc<Action>>>,
    groups: BTreeMap<String, Vec<Arc<Action>>>,
}

/// 動作管理器
pub struct ActionManager {
    config: Arc<dyn ConfigProvider>,
    /// 參數沒有對應視窗時使用
    global_window: Arc<dyn Window>,
    global_parser: Arc<CommandParser>,
    registry: RwLock<Registry>,
    nesting: AtomicUsize,
}

impl ActionManager {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        global_window: Arc<dyn Window>,
        global_parser: Arc<CommandParser>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            global_window,
            global_parser,
            registry: RwLock::new(Registry::default()),
            nesting: AtomicUsize::new(0),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 註冊動作（同群組同名者會被取代）
    pub fn register(&self, action: Action) -> Arc<Action> {
        self.unregister(action.group(), action.name());

        let action = Arc::new(action);
        let mut registry = self.write();
        for trigger in action.triggers() {
            registry
                .by_trigger
                .entry(*trigger)
                .or_default()
                .push(Arc::clone(&action));
        }
        registry
            .groups
            .entry(action.group().to_string())
            .or_default()
            .push(Arc::clone(&action));

        info!("註冊動作 {}/{}", action.group(), action.name());
        action
    }

    /// 移除動作，回傳是否存在
    pub fn unregister(&self, group: &str, name: &str) -> bool {
        let mut registry = self.write();

        let Some(list) = registry.groups.get_mut(group) else {
            return false;
        };
        let before = list.len();
        list.retain(|a| a.name() != name);
        if list.len() == before {
            return false;
        }

        for actions in registry.by_trigger.values_mut() {
            actions.retain(|a| !(a.group() == group && a.name() == name));
        }

        info!("移除動作 {}/{}", group, name);
        true
    }

    /// 移除整個群組，回傳移除的動作數
    pub fn remove_group(&self, group: &str) -> usize {
        let mut registry = self.write();
        let Some(list) = registry.groups.remove(group) else {
            return 0;
        };
        for actions in registry.by_trigger.values_mut() {
            actions.retain(|a| a.group() != group);
        }
        list.len()
    }

    /// 群組名稱（已排序）
    pub fn groups(&self) -> Vec<String> {
        self.read().groups.keys().cloned().collect()
    }

    /// 群組內的動作
    pub fn group(&self, group: &str) -> Vec<Arc<Action>> {
        self.read().groups.get(group).cloned().unwrap_or_default()
    }

    /// 指定觸發類型的動作（依註冊順序）
    pub fn actions_for(&self, trigger: CoreActionType) -> Vec<Arc<Action>> {
        self.read().by_trigger.get(&trigger).cloned().unwrap_or_default()
    }

    /// 處理事件：依序檢查並執行符合的動作，回傳是否有動作執行
    ///
    /// `format` 為呼叫端的輸出格式名稱，動作可以將其取代。
    pub fn process_event(
        &self,
        trigger: CoreActionType,
        format: Option<&mut String>,
        args: &[ActionArgument],
    ) -> bool {
        self.process_event_from(None, trigger, format, args)
    }

    /// 同 `process_event`，並指定事件來源視窗
    ///
    /// 第一個參數不是視窗時，回應會送到來源視窗的解析器。
    pub fn process_event_from(
        &self,
        source: Option<&dyn Window>,
        trigger: CoreActionType,
        mut format: Option<&mut String>,
        args: &[ActionArgument],
    ) -> bool {
        if self.config.option_bool("actions", "killswitch", false) {
            debug!("動作已全部停用，略過 {}", trigger);
            return false;
        }

        let types: Vec<_> = args.iter().map(ActionArgument::value_type).collect();
        if types != trigger.arg_types() {
            warn!("{} 的參數不符: {:?}", trigger, types);
            return false;
        }

        let _nesting = match EventNesting::enter(&self.nesting) {
            Some(guard) => guard,
            None => {
                warn!("{} 的動作巢狀過深，停止觸發", trigger);
                return false;
            }
        };

        let actions = self.actions_for(trigger);
        let mut triggered = false;

        for action in actions {
            let substitutor = ActionSubstitutor::new(trigger, Arc::clone(&self.config));
            if !action.test(&substitutor, args) {
                continue;
            }

            debug!("執行動作 {}/{}", action.group(), action.name());
            for line in action.response() {
                self.dispatch(&substitutor.substitute(line, args), source, args);
            }

            if let (Some(buffer), Some(new_format)) = (format.as_mut(), action.new_format()) {
                buffer.clear();
                buffer.push_str(new_format);
            }
            triggered = true;
        }

        triggered
    }

    /// 回應送到第一個參數的視窗，其次為來源視窗，都沒有解析器時送到全域解析器
    fn dispatch(&self, line: &str, source: Option<&dyn Window>, args: &[ActionArgument]) {
        let target = args.first().and_then(ActionArgument::window).or(source);
        if let Some(window) = target {
            if let Some(parser) = window.command_parser() {
                parser.handle(window, line);
                return;
            }
        }
        self.global_parser.handle(self.global_window.as_ref(), line);
    }

    /// 從目錄載入所有動作，回傳成功載入的數量
    ///
    /// 格式錯誤的動作檔會被略過並記錄警告。
    pub fn load_actions(&self, dir: impl AsRef<Path>) -> Result<usize, ActionError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(0);
        }

        let mut loaded = 0;
        for group_entry in fs::read_dir(dir)?.flatten() {
            let group_path = group_entry.path();
            if !group_path.is_dir() {
                continue;
            }
            let group = group_entry.file_name().to_string_lossy().to_string();

            for entry in fs::read_dir(&group_path)?.flatten() {
                let path = entry.path();
                if path.extension().map_or(true, |ext| ext != "json") {
                    continue;
                }
                let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };

                match load_action(&path, &group, &name) {
                    Ok(action) => {
                        self.register(action);
                        loaded += 1;
                    }
                    Err(e) => warn!("略過動作 {}: {}", path.display(), e),
                }
            }
        }

        info!("從 {} 載入 {} 個動作", dir.display(), loaded);
        Ok(loaded)
    }

    /// 儲存動作到 `<dir>/<群組>/<名稱>.json`
    pub fn save_action(&self, dir: impl AsRef<Path>, action: &Action) -> Result<(), ActionError> {
        let group_dir = dir.as_ref().join(action.group());
        fs::create_dir_all(&group_dir)?;
        let content = serde_json::to_string_pretty(&action.to_record())?;
        fs::write(group_dir.join(format!("{}.json", action.name())), content)?;
        Ok(())
    }
}

fn load_action(path: &Path, group: &str, name: &str) -> Result<Action, ActionError> {
    let content = fs::read_to_string(path)?;
    let record: ActionRecord = serde_json::from_str(&content)?;
    Action::from_record(group, name, &record)
}
