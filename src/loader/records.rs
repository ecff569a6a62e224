//! Raw content records as authored in JSON.
//!
//! Conditions and actions are internally tagged on `id`, e.g.
//! `{ "id": "GiveItem", "item": "rope", "amount": 2 }`. Events carry their
//! own id in the same field, so they are plain structs. Expressions are
//! written as numbers or strings ([`ExprSource`]). Unknown fields are
//! rejected everywhere, so a misspelled optional field is an error rather
//! than a silent default.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::core::{DefinitionError, PersistedNumber, PersistedVariable};
use crate::effects::ModifierKind;
use crate::expr::ExprSource;
use crate::triggers::EventId;

fn one() -> ExprSource {
    ExprSource::Number(1.0)
}

/// A condition record.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "id", rename_all_fields = "camelCase", deny_unknown_fields)]
pub enum ConditionRecord {
    Expression {
        expression: ExprSource,
    },
    Not {
        condition: Box<ConditionRecord>,
    },
    All {
        conditions: Vec<ConditionRecord>,
    },
    Any {
        conditions: Vec<ConditionRecord>,
    },
    Some {
        conditions: Vec<ConditionRecord>,
        min: ExprSource,
        max: ExprSource,
    },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChoiceRecord {
    pub text: String,
    #[serde(default)]
    pub requirement: Option<ConditionRecord>,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GroupRecord {
    pub weight: ExprSource,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BranchRecord {
    pub condition: ConditionRecord,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRecord {
    pub variable: String,
    pub value: ExprSource,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemAmountRecord {
    pub item: String,
    #[serde(default = "one")]
    pub amount: ExprSource,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerRecord {
    pub trigger: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default = "one")]
    pub probability: ExprSource,
}

/// An action record.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "id", rename_all_fields = "camelCase", deny_unknown_fields)]
pub enum ActionRecord {
    DisplayMessage {
        message: String,
        #[serde(default)]
        confirm: Option<String>,
        #[serde(default)]
        icon: Option<String>,
        #[serde(default)]
        fx: Option<String>,
    },
    DisplayRandomMessage {
        messages: Vec<String>,
        #[serde(default)]
        confirm: Option<String>,
        #[serde(default)]
        icon: Option<String>,
    },
    DisplayChoices {
        message: String,
        #[serde(default)]
        icon: Option<String>,
        choices: Vec<ChoiceRecord>,
    },
    Random {
        groups: Vec<GroupRecord>,
    },
    CoinFlip {
        probability: ExprSource,
        #[serde(default)]
        success: Vec<ActionRecord>,
        #[serde(default)]
        fail: Vec<ActionRecord>,
    },
    Switch {
        branches: Vec<BranchRecord>,
    },
    Loop {
        actions: Vec<ActionRecord>,
        #[serde(default)]
        stop: Option<ConditionRecord>,
        #[serde(default)]
        max_iterations: u32,
        #[serde(default)]
        check_stop_condition_at_end: bool,
    },
    Stop {
        #[serde(default)]
        global: bool,
    },
    EndGame {
        #[serde(default)]
        outcome: Option<String>,
    },
    UpdateVariable {
        variable: String,
        value: ExprSource,
    },
    UpdateVariables {
        updates: Vec<UpdateRecord>,
    },
    UpdateVariableLimits {
        variable: String,
        #[serde(default)]
        min: Option<ExprSource>,
        #[serde(default)]
        max: Option<ExprSource>,
    },
    GiveItem {
        item: String,
        #[serde(default = "one")]
        amount: ExprSource,
    },
    UpdateItemAmounts {
        items: Vec<ItemAmountRecord>,
    },
    SetStatus {
        status: String,
        duration: ExprSource,
    },
    TriggerEvents {
        triggers: Vec<TriggerRecord>,
    },
    EnableEvents {
        events: Vec<EventId>,
    },
    DisableEvents {
        events: Vec<EventId>,
    },
}

/// An event record.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventRecord {
    pub id: String,
    pub trigger: String,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default = "one")]
    pub probability: ExprSource,
    #[serde(default)]
    pub exclusions: Vec<EventId>,
    #[serde(default)]
    pub once: bool,
    #[serde(default)]
    pub disabled_by_default: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModifierRecord {
    pub target: String,
    pub kind: ModifierKind,
    pub amount: ExprSource,
}

/// An item or status definition.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderRecord {
    pub id: String,
    #[serde(default)]
    pub modifiers: Vec<ModifierRecord>,
    #[serde(default)]
    pub max_stack: Option<u32>,
}

/// An attribute definition. Missing bounds are unbounded.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttributeRecord {
    pub id: String,
    pub base: PersistedNumber,
    #[serde(default)]
    pub min: Option<PersistedNumber>,
    #[serde(default)]
    pub max: Option<PersistedNumber>,
}

/// A content document.
///
/// Events stay as raw JSON until the factory builds them one by one, so a
/// malformed event is reported with its own id.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Content {
    /// Id to value, or to `[value, lower, upper]`.
    pub variables: BTreeMap<String, PersistedVariable>,
    pub attributes: Vec<AttributeRecord>,
    pub items: Vec<ProviderRecord>,
    pub statuses: Vec<ProviderRecord>,
    pub events: Vec<serde_json::Value>,
}

impl Content {
    /// Parse a content document.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).map_err(|source| DefinitionError::Malformed {
            context: "content".to_string(),
            source,
        })
    }
}
