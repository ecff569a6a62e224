//! Builds engine types from records.
//!
//! Every expression goes through one [`ExpressionCompiler`], so repeated
//! source text across the whole document shares one compiled instance.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

use crate::actions::{
    Action, ActionList, Branch, Choice, ItemAmount, LoopSpec, Message, TriggerRequest,
    VariableUpdate, WeightedGroup,
};
use crate::core::{valid_bounds, DefinitionError, Variable};
use crate::effects::{Attribute, EffectProvider, Modifier};
use crate::expr::{CompiledExpression, ExprSource, ExpressionCompiler};
use crate::triggers::{Condition, Event, EventId, TriggerId};

use super::records::{
    ActionRecord, AttributeRecord, ConditionRecord, Content, EventRecord, ProviderRecord,
};

/// Everything a content document defines, ready to register.
#[derive(Debug, Default)]
pub struct Definitions {
    pub variables: Vec<(String, Variable)>,
    pub attributes: Vec<Attribute>,
    pub items: Vec<EffectProvider>,
    pub statuses: Vec<EffectProvider>,
    pub events: Vec<Event>,
}

/// Record-to-engine factory.
pub struct Factory<'c> {
    compiler: &'c mut ExpressionCompiler,
}

impl<'c> Factory<'c> {
    pub fn new(compiler: &'c mut ExpressionCompiler) -> Self {
        Self { compiler }
    }

    /// Build a whole content document.
    pub fn content(&mut self, content: Content) -> Result<Definitions, DefinitionError> {
        let variables = content
            .variables
            .into_iter()
            .map(|(id, persisted)| {
                let variable = Variable::from(persisted);
                check_bounds(&format!("variable `{id}`"), variable.min, variable.max)?;
                Ok((id, variable))
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;
        let attributes = content
            .attributes
            .into_iter()
            .map(attribute)
            .collect::<Result<Vec<_>, _>>()?;
        let items = content
            .items
            .into_iter()
            .map(|record| self.provider(record, "item"))
            .collect::<Result<Vec<_>, _>>()?;
        let statuses = content
            .statuses
            .into_iter()
            .map(|record| self.provider(record, "status"))
            .collect::<Result<Vec<_>, _>>()?;
        let events = content
            .events
            .into_iter()
            .map(|value| self.event_value(value))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            events = events.len(),
            cached_expressions = self.compiler.cached(),
            "content built"
        );
        Ok(Definitions {
            variables,
            attributes,
            items,
            statuses,
            events,
        })
    }

    /// Build an event from JSON text.
    pub fn event_json(&mut self, json: &str) -> Result<Event, DefinitionError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|source| DefinitionError::Malformed {
                context: "event".to_string(),
                source,
            })?;
        self.event_value(value)
    }

    /// Build an event from a JSON value.
    ///
    /// Decode errors name the event id when the record has one.
    pub fn event_value(&mut self, value: serde_json::Value) -> Result<Event, DefinitionError> {
        let context = match value.get("id").and_then(serde_json::Value::as_str) {
            Some(id) => format!("event `{id}`"),
            None => "event".to_string(),
        };
        let record: EventRecord = serde_json::from_value(value)
            .map_err(|source| DefinitionError::Malformed {
                context: context.clone(),
                source,
            })?;
        self.event(record, &context)
    }

    fn event(&mut self, record: EventRecord, context: &str) -> Result<Event, DefinitionError> {
        let conditions = self.conditions(&record.conditions, context)?;
        let actions = self.actions(&record.actions, context)?;
        Ok(Event {
            id: EventId::new(record.id),
            trigger: TriggerId::new(record.trigger),
            conditions,
            actions,
            probability: self.expression(record.probability, "probability", context)?,
            exclusions: record.exclusions,
            once: record.once,
            disabled_by_default: record.disabled_by_default,
        })
    }

    fn provider(
        &mut self,
        record: ProviderRecord,
        kind: &str,
    ) -> Result<EffectProvider, DefinitionError> {
        let context = format!("{kind} `{}`", record.id);
        let modifiers = record
            .modifiers
            .into_iter()
            .map(|m| {
                let amount = self.expression(m.amount, "amount", &context)?;
                Ok(Modifier::new(m.target, m.kind, amount))
            })
            .collect::<Result<SmallVec<_>, DefinitionError>>()?;
        Ok(EffectProvider {
            id: record.id,
            modifiers,
            max_stack: record.max_stack,
        })
    }

    fn expression(
        &mut self,
        source: ExprSource,
        field: &'static str,
        context: &str,
    ) -> Result<Rc<CompiledExpression>, DefinitionError> {
        self.compiler
            .compile(source)
            .map_err(|source| DefinitionError::Field {
                context: context.to_string(),
                field,
                source: Box::new(source),
            })
    }

    fn optional_expression(
        &mut self,
        source: &Option<ExprSource>,
        field: &'static str,
        context: &str,
    ) -> Result<Option<Rc<CompiledExpression>>, DefinitionError> {
        source
            .clone()
            .map(|source| self.expression(source, field, context))
            .transpose()
    }

    fn conditions(
        &mut self,
        records: &[ConditionRecord],
        context: &str,
    ) -> Result<Vec<Condition>, DefinitionError> {
        records
            .iter()
            .map(|record| self.condition(record, context))
            .collect()
    }

    fn condition(
        &mut self,
        record: &ConditionRecord,
        context: &str,
    ) -> Result<Condition, DefinitionError> {
        Ok(match record {
            ConditionRecord::Expression { expression } => {
                Condition::Expression(self.expression(expression.clone(), "expression", context)?)
            }
            ConditionRecord::Not { condition } => Condition::not(self.condition(condition, context)?),
            ConditionRecord::All { conditions } => {
                Condition::All(self.conditions(conditions, context)?)
            }
            ConditionRecord::Any { conditions } => {
                Condition::Any(self.conditions(conditions, context)?)
            }
            ConditionRecord::Some {
                conditions,
                min,
                max,
            } => Condition::Some {
                conditions: self.conditions(conditions, context)?,
                min: self.expression(min.clone(), "min", context)?,
                max: self.expression(max.clone(), "max", context)?,
            },
        })
    }

    fn actions(
        &mut self,
        records: &[ActionRecord],
        context: &str,
    ) -> Result<ActionList, DefinitionError> {
        records
            .iter()
            .map(|record| self.action(record, context))
            .collect()
    }

    fn action(&mut self, record: &ActionRecord, context: &str) -> Result<Action, DefinitionError> {
        let action = match record {
            ActionRecord::DisplayMessage {
                message,
                confirm,
                icon,
                fx,
            } => Action::DisplayMessage(Message {
                text: message.clone(),
                confirm: confirm.clone(),
                icon: icon.clone(),
                fx: fx.clone(),
            }),

            ActionRecord::DisplayRandomMessage {
                messages,
                confirm,
                icon,
            } => {
                if messages.is_empty() {
                    return Err(invalid(context, "DisplayRandomMessage needs at least one message"));
                }
                Action::DisplayRandomMessage {
                    messages: messages.clone(),
                    confirm: confirm.clone(),
                    icon: icon.clone(),
                }
            }

            ActionRecord::DisplayChoices {
                message,
                icon,
                choices,
            } => Action::DisplayChoices {
                message: message.clone(),
                icon: icon.clone(),
                choices: choices
                    .iter()
                    .map(|choice| {
                        Ok(Choice {
                            text: choice.text.clone(),
                            requirement: choice
                                .requirement
                                .as_ref()
                                .map(|r| self.condition(r, context))
                                .transpose()?,
                            actions: self.actions(&choice.actions, context)?,
                        })
                    })
                    .collect::<Result<Vec<_>, DefinitionError>>()?,
            },

            ActionRecord::Random { groups } => {
                if groups.is_empty() {
                    return Err(invalid(context, "Random needs at least one group"));
                }
                Action::Random {
                    groups: groups
                        .iter()
                        .map(|group| {
                            Ok(WeightedGroup {
                                weight: self.expression(group.weight.clone(), "weight", context)?,
                                actions: self.actions(&group.actions, context)?,
                            })
                        })
                        .collect::<Result<Vec<_>, DefinitionError>>()?,
                }
            }

            ActionRecord::CoinFlip {
                probability,
                success,
                fail,
            } => Action::CoinFlip {
                probability: self.expression(probability.clone(), "probability", context)?,
                success: self.actions(success, context)?,
                fail: self.actions(fail, context)?,
            },

            ActionRecord::Switch { branches } => Action::Switch {
                branches: branches
                    .iter()
                    .map(|branch| {
                        Ok(Branch {
                            condition: self.condition(&branch.condition, context)?,
                            actions: self.actions(&branch.actions, context)?,
                        })
                    })
                    .collect::<Result<Vec<_>, DefinitionError>>()?,
            },

            ActionRecord::Loop {
                actions,
                stop,
                max_iterations,
                check_stop_condition_at_end,
            } => Action::Loop(LoopSpec {
                actions: self.actions(actions, context)?,
                stop: stop
                    .as_ref()
                    .map(|s| self.condition(s, context))
                    .transpose()?,
                max_iterations: *max_iterations,
                check_stop_at_end: *check_stop_condition_at_end,
            }),

            ActionRecord::Stop { global } => Action::Stop { global: *global },

            ActionRecord::EndGame { outcome } => Action::EndGame {
                outcome: outcome.clone(),
            },

            ActionRecord::UpdateVariable { variable, value } => Action::UpdateVariable {
                variable: variable.clone(),
                value: self.expression(value.clone(), "value", context)?,
            },

            ActionRecord::UpdateVariables { updates } => Action::UpdateVariables {
                updates: updates
                    .iter()
                    .map(|update| {
                        Ok(VariableUpdate {
                            variable: update.variable.clone(),
                            value: self.expression(update.value.clone(), "value", context)?,
                        })
                    })
                    .collect::<Result<Vec<_>, DefinitionError>>()?,
            },

            ActionRecord::UpdateVariableLimits { variable, min, max } => {
                Action::UpdateVariableLimits {
                    variable: variable.clone(),
                    min: self.optional_expression(min, "min", context)?,
                    max: self.optional_expression(max, "max", context)?,
                }
            }

            ActionRecord::GiveItem { item, amount } => Action::GiveItem {
                item: item.clone(),
                amount: self.expression(amount.clone(), "amount", context)?,
            },

            ActionRecord::UpdateItemAmounts { items } => Action::UpdateItemAmounts {
                items: items
                    .iter()
                    .map(|entry| {
                        Ok(ItemAmount {
                            item: entry.item.clone(),
                            amount: self.expression(entry.amount.clone(), "amount", context)?,
                        })
                    })
                    .collect::<Result<Vec<_>, DefinitionError>>()?,
            },

            ActionRecord::SetStatus { status, duration } => Action::SetStatus {
                status: status.clone(),
                duration: self.expression(duration.clone(), "duration", context)?,
            },

            ActionRecord::TriggerEvents { triggers } => Action::TriggerEvents {
                triggers: triggers
                    .iter()
                    .map(|request| {
                        Ok(TriggerRequest {
                            trigger: TriggerId::new(request.trigger.clone()),
                            priority: request.priority,
                            probability: self.expression(
                                request.probability.clone(),
                                "probability",
                                context,
                            )?,
                        })
                    })
                    .collect::<Result<Vec<_>, DefinitionError>>()?,
            },

            ActionRecord::EnableEvents { events } => Action::EnableEvents {
                events: events.clone(),
            },

            ActionRecord::DisableEvents { events } => Action::DisableEvents {
                events: events.clone(),
            },
        };
        Ok(action)
    }
}

fn attribute(record: AttributeRecord) -> Result<Attribute, DefinitionError> {
    let min = record.min.map_or(f64::NEG_INFINITY, |n| n.get());
    let max = record.max.map_or(f64::INFINITY, |n| n.get());
    check_bounds(&format!("attribute `{}`", record.id), min, max)?;
    Ok(Attribute::new(record.id, record.base.get(), min, max))
}

/// Rejects bounds that `f64::clamp` cannot take.
fn check_bounds(context: &str, min: f64, max: f64) -> Result<(), DefinitionError> {
    if valid_bounds(min, max) {
        Ok(())
    } else {
        Err(invalid(context, &format!("invalid bounds [{min}, {max}]")))
    }
}

fn invalid(context: &str, message: &str) -> DefinitionError {
    DefinitionError::Invalid {
        context: context.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Arity;

    fn compiler() -> ExpressionCompiler {
        ExpressionCompiler::new().with_function("item", Arity::Exact(1))
    }

    #[test]
    fn test_event_with_nested_actions() {
        let mut compiler = compiler();
        let event = Factory::new(&mut compiler)
            .event_json(
                r#"{
                    "id": "storm",
                    "trigger": "dawn",
                    "probability": 0.5,
                    "conditions": [{ "id": "Expression", "expression": "hope > 1" }],
                    "actions": [
                        { "id": "CoinFlip", "probability": "0.25",
                          "success": [{ "id": "GiveItem", "item": "rope" }] },
                        { "id": "Stop", "global": true }
                    ],
                    "once": true
                }"#,
            )
            .unwrap();

        assert_eq!(event.id.as_str(), "storm");
        assert_eq!(event.trigger.as_str(), "dawn");
        assert_eq!(event.conditions.len(), 1);
        assert_eq!(event.actions.len(), 2);
        assert!(event.once);
        assert!(!event.disabled_by_default);
        assert!(matches!(
            event.actions.iter().nth(1),
            Some(Action::Stop { global: true })
        ));
    }

    #[test]
    fn test_shared_sources_share_compilation() {
        let mut compiler = compiler();
        let event = Factory::new(&mut compiler)
            .event_json(
                r#"{
                    "id": "twice",
                    "trigger": "t",
                    "actions": [
                        { "id": "UpdateVariable", "variable": "x", "value": "x + 1" },
                        { "id": "UpdateVariable", "variable": "y", "value": "x + 1" }
                    ]
                }"#,
            )
            .unwrap();

        let values: Vec<_> = event
            .actions
            .iter()
            .filter_map(|action| match action {
                Action::UpdateVariable { value, .. } => Some(Rc::clone(value)),
                _ => None,
            })
            .collect();
        assert!(Rc::ptr_eq(&values[0], &values[1]));
    }

    #[test]
    fn test_unknown_tag_names_the_event() {
        let mut compiler = compiler();
        let err = Factory::new(&mut compiler)
            .event_json(r#"{ "id": "storm", "trigger": "t", "actions": [{ "id": "Explode" }] }"#)
            .unwrap_err();
        assert!(matches!(&err, DefinitionError::Malformed { context, .. } if context == "event `storm`"));
        assert!(err.to_string().contains("Explode"));
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut compiler = compiler();
        let err = Factory::new(&mut compiler)
            .event_json(r#"{ "id": "storm", "trigger": "t", "actions": [{ "id": "SetStatus", "status": "wet" }] }"#)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("storm"));
        assert!(message.contains("duration"));
    }

    #[test]
    fn test_bad_expression_names_the_field() {
        let mut compiler = compiler();
        let err = Factory::new(&mut compiler)
            .event_json(
                r#"{ "id": "storm", "trigger": "t",
                     "actions": [{ "id": "GiveItem", "item": "rope", "amount": "nope(1)" }] }"#,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Field { field: "amount", ref source, .. }
                if matches!(**source, DefinitionError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_empty_random_is_invalid() {
        let mut compiler = compiler();
        let err = Factory::new(&mut compiler)
            .event_json(r#"{ "id": "dice", "trigger": "t", "actions": [{ "id": "Random", "groups": [] }] }"#)
            .unwrap_err();
        assert!(matches!(err, DefinitionError::Invalid { .. }));
    }

    #[test]
    fn test_content_document() {
        let mut compiler = compiler();
        let content = Content::from_json(
            r#"{
                "variables": { "hope": [3, "-Infinity", 10], "day": 1 },
                "attributes": [{ "id": "strength", "base": 10, "min": 0 }],
                "items": [{ "id": "sword", "maxStack": 2,
                            "modifiers": [{ "target": "strength", "kind": "Absolute", "amount": 5 }] }],
                "statuses": [{ "id": "blessed" }],
                "events": [{ "id": "sunrise", "trigger": "dawn" }]
            }"#,
        )
        .unwrap();
        let built = Factory::new(&mut compiler).content(content).unwrap();

        assert_eq!(built.variables.len(), 2);
        let (_, hope) = built.variables.iter().find(|(id, _)| id == "hope").unwrap();
        assert_eq!(*hope, Variable::bounded(3.0, f64::NEG_INFINITY, 10.0));
        assert_eq!(built.attributes[0].max, f64::INFINITY);
        assert_eq!(built.items[0].max_stack, Some(2));
        assert_eq!(built.items[0].modifiers.len(), 1);
        assert_eq!(built.statuses[0].id, "blessed");
        assert_eq!(built.events[0].id.as_str(), "sunrise");
    }
}
