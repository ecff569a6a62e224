//! Action execution.
//!
//! Lists and actions return boxed local futures so nested lists can recurse.
//! The only awaits are on the [`UiProxy`]; everything between two awaits is
//! synchronous against the engine state.

use futures_util::future::{FutureExt, LocalBoxFuture};
use tracing::{trace, warn};

use crate::core::{draw, gate, weighted_sample, Result, UsageError};
use crate::engine::EngineState;

use super::action::{Action, ActionList, Flow, LoopSpec};
use super::ui::{ChoiceOption, ChoicePrompt, Message, UiProxy};

impl ActionList {
    /// Run every action in order.
    ///
    /// `StopLocal` ends this list and reports `Continue`. `StopGlobal`
    /// propagates.
    pub fn run<'a>(
        &'a self,
        state: &'a mut EngineState,
        ui: &'a dyn UiProxy,
    ) -> LocalBoxFuture<'a, Result<Flow>> {
        self.run_in_order(state, ui).boxed_local()
    }

    async fn run_in_order(&self, state: &mut EngineState, ui: &dyn UiProxy) -> Result<Flow> {
        for action in self.iter() {
            match action.execute(&mut *state, ui).await? {
                Flow::Continue => {}
                Flow::StopLocal => return Ok(Flow::Continue),
                Flow::StopGlobal => return Ok(Flow::StopGlobal),
            }
        }
        Ok(Flow::Continue)
    }
}

impl Action {
    /// Execute this action against the engine state.
    pub fn execute<'a>(
        &'a self,
        state: &'a mut EngineState,
        ui: &'a dyn UiProxy,
    ) -> LocalBoxFuture<'a, Result<Flow>> {
        self.apply(state, ui).boxed_local()
    }

    async fn apply(&self, state: &mut EngineState, ui: &dyn UiProxy) -> Result<Flow> {
        trace!(action = self.kind(), "executing action");

        match self {
            Action::DisplayMessage(message) => {
                ui.display_message(message).await;
                Ok(Flow::Continue)
            }

            Action::DisplayRandomMessage {
                messages,
                confirm,
                icon,
            } => {
                if messages.is_empty() {
                    return Ok(Flow::Continue);
                }
                let roll = draw(state.rng())?;
                let index = ((roll * messages.len() as f64) as usize).min(messages.len() - 1);
                let message = Message {
                    text: messages[index].clone(),
                    confirm: confirm.clone(),
                    icon: icon.clone(),
                    fx: None,
                };
                ui.display_message(&message).await;
                Ok(Flow::Continue)
            }

            Action::DisplayChoices {
                message,
                icon,
                choices,
            } => {
                let mut options = Vec::with_capacity(choices.len());
                for (index, choice) in choices.iter().enumerate() {
                    let eligible = match &choice.requirement {
                        Some(requirement) => requirement.check(&*state)?,
                        None => true,
                    };
                    if eligible {
                        options.push(ChoiceOption {
                            label: choice.text.clone(),
                            index,
                        });
                    }
                }
                if options.is_empty() {
                    warn!(prompt = %message, "no eligible choice, skipping prompt");
                    return Ok(Flow::Continue);
                }

                let prompt = ChoicePrompt {
                    text: message.clone(),
                    icon: icon.clone(),
                    options,
                };
                let chosen = ui.display_choices(&prompt).await;
                if !prompt.offered().any(|index| index == chosen) {
                    return Err(UsageError::InvalidChoice {
                        index: chosen,
                        offered: prompt.offered().collect(),
                    }
                    .into());
                }
                trace!(choice = chosen, "choice resolved");
                choices[chosen].actions.run(state, ui).await
            }

            Action::Random { groups } => {
                let weights = groups
                    .iter()
                    .map(|group| group.weight.eval(&*state))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let index = weighted_sample(&weights, state.rng())?;
                groups[index].actions.run(state, ui).await
            }

            Action::CoinFlip {
                probability,
                success,
                fail,
            } => {
                let p = probability.eval(&*state)?;
                if gate(state.rng(), p)? {
                    success.run(state, ui).await
                } else {
                    fail.run(state, ui).await
                }
            }

            Action::Switch { branches } => {
                for branch in branches {
                    if branch.condition.check(&*state)? {
                        return branch.actions.run(state, ui).await;
                    }
                }
                Ok(Flow::Continue)
            }

            Action::Loop(spec) => run_loop(spec, state, ui).await,

            Action::Stop { global: true } => Ok(Flow::StopGlobal),
            Action::Stop { global: false } => Ok(Flow::StopLocal),

            Action::EndGame { outcome } => {
                state.end_game(outcome.clone());
                Ok(Flow::StopGlobal)
            }

            Action::UpdateVariable { variable, value } => {
                let value = value.eval(&*state)?;
                state.set_variable(variable, value)?;
                Ok(Flow::Continue)
            }

            Action::UpdateVariables { updates } => {
                let values = updates
                    .iter()
                    .map(|update| update.value.eval(&*state))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                for (update, value) in updates.iter().zip(values) {
                    state.set_variable(&update.variable, value)?;
                }
                Ok(Flow::Continue)
            }

            Action::UpdateVariableLimits { variable, min, max } => {
                let min = min.as_ref().map(|e| e.eval(&*state)).transpose()?;
                let max = max.as_ref().map(|e| e.eval(&*state)).transpose()?;
                state.set_variable_bounds(variable, min, max)?;
                Ok(Flow::Continue)
            }

            Action::GiveItem { item, amount } => {
                let amount = amount.eval(&*state)?;
                state.give_item(item, amount)?;
                Ok(Flow::Continue)
            }

            Action::UpdateItemAmounts { items } => {
                for entry in items {
                    let amount = entry.amount.eval(&*state)?;
                    state.give_item(&entry.item, amount)?;
                }
                Ok(Flow::Continue)
            }

            Action::SetStatus { status, duration } => {
                let duration = duration.eval(&*state)?;
                state.set_status(status, duration)?;
                Ok(Flow::Continue)
            }

            Action::TriggerEvents { triggers } => {
                for request in triggers {
                    let probability = request.probability.eval(&*state)?;
                    let priority = request
                        .priority
                        .unwrap_or(state.config().default_trigger_priority);
                    state.enqueue(request.trigger.clone(), priority, probability);
                }
                Ok(Flow::Continue)
            }

            Action::EnableEvents { events } => {
                for event in events {
                    state.set_event_enabled(event.as_str(), true)?;
                }
                Ok(Flow::Continue)
            }

            Action::DisableEvents { events } => {
                for event in events {
                    state.set_event_enabled(event.as_str(), false)?;
                }
                Ok(Flow::Continue)
            }
        }
    }
}

/// While / do-while over the body. `max_iterations == 0` never caps.
async fn run_loop(spec: &LoopSpec, state: &mut EngineState, ui: &dyn UiProxy) -> Result<Flow> {
    let mut iterations: u32 = 0;
    loop {
        if spec.max_iterations > 0 && iterations >= spec.max_iterations {
            break;
        }
        if !spec.check_stop_at_end && stop_holds(spec, state)? {
            break;
        }

        if spec.actions.run(&mut *state, ui).await? == Flow::StopGlobal {
            return Ok(Flow::StopGlobal);
        }
        iterations = iterations.saturating_add(1);

        if spec.check_stop_at_end && stop_holds(spec, state)? {
            break;
        }
    }
    trace!(iterations, "loop finished");
    Ok(Flow::Continue)
}

fn stop_holds(spec: &LoopSpec, state: &EngineState) -> Result<bool> {
    match &spec.stop {
        Some(stop) => Ok(stop.check(state)?),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use futures_util::FutureExt;

    use super::*;
    use crate::actions::HeadlessUi;
    use crate::core::{EngineConfig, EngineError, Variable};
    use crate::expr::CompiledExpression;

    fn state() -> EngineState {
        let mut state = EngineState::new(EngineConfig::default());
        state.define_variable("x", Variable::new(0.0));
        state
    }

    fn constant(value: f64) -> Rc<CompiledExpression> {
        Rc::new(CompiledExpression::constant(value))
    }

    fn run(list: &ActionList, state: &mut EngineState) -> Result<Flow> {
        list.run(state, &HeadlessUi)
            .now_or_never()
            .expect("headless execution never suspends")
    }

    #[test]
    fn test_stop_local_only_ends_nested_list() {
        let nested = ActionList::default()
            .with(Action::set("x", constant(1.0)))
            .with(Action::stop())
            .with(Action::set("x", constant(99.0)));
        let outer = ActionList::default()
            .with(Action::Switch {
                branches: vec![crate::actions::Branch {
                    condition: crate::triggers::Condition::expression(constant(1.0)),
                    actions: nested,
                }],
            })
            .with(Action::set("x", constant(2.0)));

        let mut state = state();
        assert_eq!(run(&outer, &mut state).unwrap(), Flow::Continue);
        assert_eq!(state.variables().value("x").unwrap(), 2.0);
    }

    #[test]
    fn test_stop_global_aborts_everything() {
        let nested = ActionList::default().with(Action::stop_global());
        let outer = ActionList::default()
            .with(Action::CoinFlip {
                probability: constant(1.0),
                success: nested,
                fail: ActionList::default(),
            })
            .with(Action::set("x", constant(5.0)));

        let mut state = state();
        assert_eq!(run(&outer, &mut state).unwrap(), Flow::StopGlobal);
        assert_eq!(state.variables().value("x").unwrap(), 0.0);
    }

    #[test]
    fn test_loop_respects_max_iterations() {
        let mut compiler = crate::expr::ExpressionCompiler::new();
        let increment = Action::set("x", compiler.compile("x + 1").unwrap());
        let list = ActionList::default().with(Action::Loop(LoopSpec {
            actions: ActionList::default().with(increment),
            stop: None,
            max_iterations: 3,
            check_stop_at_end: false,
        }));

        let mut state = state();
        assert_eq!(run(&list, &mut state).unwrap(), Flow::Continue);
        assert_eq!(state.variables().value("x").unwrap(), 3.0);
    }

    #[test]
    fn test_loop_while_and_do_while() {
        let mut compiler = crate::expr::ExpressionCompiler::new();
        let increment = compiler.compile("x + 1").unwrap();
        let body = || ActionList::default().with(Action::set("x", Rc::clone(&increment)));
        let stop = crate::triggers::Condition::expression(compiler.compile("x >= 0").unwrap());

        // Stop already holds: the while form never runs the body
        let while_loop = ActionList::default().with(Action::Loop(LoopSpec {
            actions: body(),
            stop: Some(stop.clone()),
            max_iterations: 0,
            check_stop_at_end: false,
        }));
        let mut state = state();
        run(&while_loop, &mut state).unwrap();
        assert_eq!(state.variables().value("x").unwrap(), 0.0);

        // The do-while form runs it once
        let do_while = ActionList::default().with(Action::Loop(LoopSpec {
            actions: body(),
            stop: Some(stop),
            max_iterations: 0,
            check_stop_at_end: true,
        }));
        run(&do_while, &mut state).unwrap();
        assert_eq!(state.variables().value("x").unwrap(), 1.0);
    }

    #[test]
    fn test_unknown_variable_is_fatal() {
        let list = ActionList::default().with(Action::set("missing", constant(1.0)));
        let mut state = state();
        assert!(matches!(
            run(&list, &mut state),
            Err(EngineError::Eval(crate::core::EvalError::UnknownVariable(_)))
        ));
    }
}
