use crate::types::State;

/// The zero value folded before any events are applied.
pub fn create_empty_state() -> State {
    State::default()
}
