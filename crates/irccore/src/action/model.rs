//! 動作定義與檔案格式

use serde::{Deserialize, Serialize};

use super::action_type::CoreActionType;
use super::condition::{ActionCondition, ConditionRecord};
use super::condition_tree::ConditionTree;
use super::substitutor::ActionSubstitutor;
use super::value::ActionArgument;
use super::ActionError;

/// 動作的 JSON 檔案格式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// 觸發類型名稱
    pub triggers: Vec<String>,
    /// 觸發時依序執行的輸入行
    pub response: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
    /// 條件樹，省略時為所有條件皆成立
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_tree: Option<String>,
    /// 取代原本的輸出格式
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// 已驗證的動作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    group: String,
    name: String,
    triggers: Vec<CoreActionType>,
    response: Vec<String>,
    conditions: Vec<ActionCondition>,
    condition_tree: Option<ConditionTree>,
    new_format: Option<String>,
}

impl Action {
    /// 建立動作
    ///
    /// 所有觸發類型的參數型別必須相同，回應不可為空，
    /// 條件樹引用的索引必須在條件數量之內。
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        triggers: Vec<CoreActionType>,
        response: Vec<String>,
        conditions: Vec<ActionCondition>,
        condition_tree: Option<ConditionTree>,
        new_format: Option<String>,
    ) -> Result<Self, ActionError> {
        let first = *triggers.first().ok_or(ActionError::NoTriggers)?;
        if let Some(other) = triggers.iter().find(|t| t.arg_types() != first.arg_types()) {
            return Err(ActionError::IncompatibleTriggers {
                first: first.name().to_string(),
                other: other.name().to_string(),
            });
        }

        if response.is_empty() {
            return Err(ActionError::NoResponse);
        }

        if let Some(max) = condition_tree.as_ref().and_then(ConditionTree::max_argument) {
            if max >= conditions.len() {
                return Err(ActionError::TreeOutOfRange {
                    index: max,
                    conditions: conditions.len(),
                });
            }
        }

        Ok(Self {
            group: group.into(),
            name: name.into(),
            triggers,
            response,
            conditions,
            condition_tree,
            new_format,
        })
    }

    /// 從檔案格式建立並驗證
    pub fn from_record(
        group: impl Into<String>,
        name: impl Into<String>,
        record: &ActionRecord,
    ) -> Result<Self, ActionError> {
        let triggers = record
            .triggers
            .iter()
            .map(|t| CoreActionType::from_name(t).ok_or_else(|| ActionError::UnknownTrigger(t.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let primary = *triggers.first().ok_or(ActionError::NoTriggers)?;

        let conditions = record
            .conditions
            .iter()
            .map(|c| ActionCondition::from_record(primary, c))
            .collect::<Result<Vec<_>, _>>()?;

        let condition_tree = match &record.condition_tree {
            Some(text) => Some(
                ConditionTree::parse(text).ok_or_else(|| ActionError::InvalidConditionTree(text.clone()))?,
            ),
            None => None,
        };

        Self::new(
            group,
            name,
            triggers,
            record.response.clone(),
            conditions,
            condition_tree,
            record.format.clone(),
        )
    }

    pub fn to_record(&self) -> ActionRecord {
        ActionRecord {
            triggers: self.triggers.iter().map(|t| t.name().to_string()).collect(),
            response: self.response.clone(),
            conditions: self.conditions.iter().map(ActionCondition::to_record).collect(),
            condition_tree: self.condition_tree.as_ref().map(ToString::to_string),
            format: self.new_format.clone(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triggers(&self) -> &[CoreActionType] {
        &self.triggers
    }

    /// 主要觸發類型（決定參數型別與變數替換）
    pub fn primary_trigger(&self) -> CoreActionType {
        self.triggers[0]
    }

    pub fn response(&self) -> &[String] {
        &self.response
    }

    pub fn conditions(&self) -> &[ActionCondition] {
        &self.conditions
    }

    pub fn new_format(&self) -> Option<&str> {
        self.new_format.as_deref()
    }

    /// 實際使用的條件樹（未指定時為所有條件的交集）
    pub fn effective_condition_tree(&self) -> ConditionTree {
        self.condition_tree
            .clone()
            .unwrap_or_else(|| ConditionTree::conjunction(self.conditions.len()))
    }

    /// 檢查此動作是否應該執行
    pub fn test(&self, substitutor: &ActionSubstitutor, args: &[ActionArgument]) -> bool {
        let results: Vec<bool> = self
            .conditions
            .iter()
            .map(|c| c.test(substitutor, args))
            .collect();
        self.effective_condition_tree().evaluate(&results)
    }
}
