//! 動作條件

use serde::{Deserialize, Serialize};

use super::action_type::CoreActionType;
use super::comparison::CoreActionComparison;
use super::component::ComponentChain;
use super::substitutor::ActionSubstitutor;
use super::value::ActionArgument;
use super::ActionError;

/// 單一條件：取第 `arg` 個參數，經元件串接後與目標比較
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCondition {
    arg: usize,
    chain: ComponentChain,
    comparison: CoreActionComparison,
    target: String,
}

/// 條件的檔案格式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub arg: usize,
    /// 以 `.` 分隔的元件名稱
    pub component: String,
    pub comparison: String,
    #[serde(default)]
    pub target: String,
}

impl ActionCondition {
    /// 建立並檢查條件是否適用於指定的觸發類型
    pub fn new(
        action_type: CoreActionType,
        arg: usize,
        component: &str,
        comparison: CoreActionComparison,
        target: impl Into<String>,
    ) -> Result<Self, ActionError> {
        let arg_type = action_type
            .arg_types()
            .get(arg)
            .copied()
            .ok_or(ActionError::ArgumentOutOfRange {
                index: arg,
                arity: action_type.arity(),
            })?;

        let chain = ComponentChain::parse(arg_type, component)?;
        if comparison.applies_to() != chain.value_type() {
            return Err(ActionError::ComparisonMismatch {
                comparison: comparison.name().to_string(),
                value: chain.value_type(),
            });
        }

        Ok(Self {
            arg,
            chain,
            comparison,
            target: target.into(),
        })
    }

    /// 從檔案格式建立
    pub fn from_record(action_type: CoreActionType, record: &ConditionRecord) -> Result<Self, ActionError> {
        let comparison = CoreActionComparison::from_name(&record.comparison)
            .ok_or_else(|| ActionError::UnknownComparison(record.comparison.clone()))?;
        Self::new(action_type, record.arg, &record.component, comparison, record.target.clone())
    }

    pub fn to_record(&self) -> ConditionRecord {
        ConditionRecord {
            arg: self.arg,
            component: self.chain.to_string(),
            comparison: self.comparison.name().to_string(),
            target: self.target.clone(),
        }
    }

    pub fn arg(&self) -> usize {
        self.arg
    }

    pub fn chain(&self) -> &ComponentChain {
        &self.chain
    }

    pub fn comparison(&self) -> CoreActionComparison {
        self.comparison
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// 以觸發參數檢查條件；目標會先經過變數替換
    pub fn test(&self, substitutor: &ActionSubstitutor, args: &[ActionArgument]) -> bool {
        let Some(value) = args.get(self.arg).and_then(|a| self.chain.get(a)) else {
            return false;
        };
        let target = substitutor.substitute(&self.target, args);
        self.comparison.test(&value, &target)
    }
}
