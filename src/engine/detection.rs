use crate::types::AgentState;

pub struct DeadlockDetector;

impl DeadlockDetector {
    /// Circular wait for right-then-left acquisition: every philosopher holds
    /// its right utensil and waits for the left one. An empty table is never
    /// deadlocked.
    pub fn is_deadlocked<I>(states: I) -> bool
    where
        I: IntoIterator<Item = AgentState>,
    {
        let mut seen = false;
        for state in states {
            if state != AgentState::GotRightUtensil {
                return false;
            }
            seen = true;
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = AgentState> {
        prop_oneof![
            Just(AgentState::Thinking),
            Just(AgentState::Hungry),
            Just(AgentState::GotRightUtensil),
            Just(AgentState::GotLeftUtensil),
            Just(AgentState::Eating),
        ]
    }

    #[test]
    fn test_all_holding_right_is_deadlock() {
        let states = vec![AgentState::GotRightUtensil; 5];
        assert!(DeadlockDetector::is_deadlocked(states));
    }

    #[test]
    fn test_single_philosopher_holding_right() {
        assert!(DeadlockDetector::is_deadlocked([AgentState::GotRightUtensil]));
    }

    #[test]
    fn test_one_eating_is_not_deadlock() {
        let states = [
            AgentState::GotRightUtensil,
            AgentState::Eating,
            AgentState::GotRightUtensil,
        ];
        assert!(!DeadlockDetector::is_deadlocked(states));
    }

    #[test]
    fn test_empty_table_is_not_deadlock() {
        assert!(!DeadlockDetector::is_deadlocked(Vec::new()));
    }

    proptest! {
        #[test]
        fn prop_deadlock_iff_all_got_right(states in prop::collection::vec(any_state(), 1..40)) {
            let expected = states.iter().all(|s| *s == AgentState::GotRightUtensil);
            prop_assert_eq!(DeadlockDetector::is_deadlocked(states), expected);
        }
    }
}
