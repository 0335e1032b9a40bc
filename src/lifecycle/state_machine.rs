use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::types::AgentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Rested,
    RightAcquired,
    LeftAcquired,
    Finished,
}

/// The fixed philosopher cycle:
/// Thinking -> Hungry -> GotRightUtensil -> Eating -> Thinking.
///
/// Taking the left utensil moves straight to Eating; `GotLeftUtensil` is
/// never entered.
pub struct AgentStateMachine;

impl AgentStateMachine {
    pub fn next(state: AgentState, event: LifecycleEvent) -> Result<AgentState> {
        let new_state = match (state, event) {
            (AgentState::Thinking, LifecycleEvent::Rested) => AgentState::Hungry,
            (AgentState::Hungry, LifecycleEvent::RightAcquired) => AgentState::GotRightUtensil,
            (AgentState::GotRightUtensil, LifecycleEvent::LeftAcquired) => AgentState::Eating,
            (AgentState::Eating, LifecycleEvent::Finished) => AgentState::Thinking,
            (from, event) => return Err(SimulationError::InvalidTransition { from, event }),
        };
        Ok(new_state)
    }

    pub fn transition(state: &mut AgentState, event: LifecycleEvent) -> Result<AgentState> {
        let new_state = Self::next(*state, event)?;
        *state = new_state;
        Ok(new_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut state = AgentState::Thinking;
        let events = [
            LifecycleEvent::Rested,
            LifecycleEvent::RightAcquired,
            LifecycleEvent::LeftAcquired,
            LifecycleEvent::Finished,
        ];
        let mut visited = vec![state];
        for event in events {
            visited.push(AgentStateMachine::transition(&mut state, event).unwrap());
        }

        assert_eq!(
            visited,
            vec![
                AgentState::Thinking,
                AgentState::Hungry,
                AgentState::GotRightUtensil,
                AgentState::Eating,
                AgentState::Thinking,
            ]
        );
    }

    #[test]
    fn test_left_acquired_skips_got_left() {
        let next =
            AgentStateMachine::next(AgentState::GotRightUtensil, LifecycleEvent::LeftAcquired)
                .unwrap();
        assert_eq!(next, AgentState::Eating);
    }

    #[test]
    fn test_got_left_has_no_exit() {
        for event in [
            LifecycleEvent::Rested,
            LifecycleEvent::RightAcquired,
            LifecycleEvent::LeftAcquired,
            LifecycleEvent::Finished,
        ] {
            assert!(AgentStateMachine::next(AgentState::GotLeftUtensil, event).is_err());
        }
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut state = AgentState::Hungry;
        let result = AgentStateMachine::transition(&mut state, LifecycleEvent::Finished);
        assert!(result.is_err());
        assert_eq!(state, AgentState::Hungry);
    }
}
