//! Directional routing between layer queues
//!
//! Two fixed tables. A queue with no entry in a direction is the end of the
//! line for that direction: callers must not publish.

use crate::types::{Direction, Queue};

/// Southbound: controller → aspirational → … → task prosecution.
pub const BUSSES_DOWN: [(Queue, Queue); 6] = [
    (Queue::Controller, Queue::Aspirational),
    (Queue::Aspirational, Queue::GlobalStrategy),
    (Queue::GlobalStrategy, Queue::AgentModel),
    (Queue::AgentModel, Queue::ExecutiveFunction),
    (Queue::ExecutiveFunction, Queue::CognitiveControl),
    (Queue::CognitiveControl, Queue::TaskProsecution),
];

/// Northbound: task prosecution → … → aspirational. The controller is never
/// a destination.
pub const BUSSES_UP: [(Queue, Queue); 5] = [
    (Queue::TaskProsecution, Queue::CognitiveControl),
    (Queue::CognitiveControl, Queue::ExecutiveFunction),
    (Queue::ExecutiveFunction, Queue::AgentModel),
    (Queue::AgentModel, Queue::GlobalStrategy),
    (Queue::GlobalStrategy, Queue::Aspirational),
];

pub fn table(direction: Direction) -> &'static [(Queue, Queue)] {
    match direction {
        Direction::Southbound => &BUSSES_DOWN,
        Direction::Northbound => &BUSSES_UP,
    }
}

/// Next queue for `source` in `direction`, or `None` at a terminal end.
pub fn next_hop(direction: Direction, source: Queue) -> Option<Queue> {
    table(direction)
        .iter()
        .find(|(from, _)| *from == source)
        .map(|(_, to)| *to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn southbound_walk_visits_every_layer_once() {
        let mut seen = HashSet::new();
        let mut current = Queue::Controller;
        seen.insert(current);
        while let Some(next) = next_hop(Direction::Southbound, current) {
            assert!(seen.insert(next), "cycle at {}", next);
            current = next;
        }
        assert_eq!(current, Queue::TaskProsecution);
        assert_eq!(seen.len(), Queue::ALL.len());
    }

    #[test]
    fn terminal_ends_have_no_hop() {
        assert_eq!(next_hop(Direction::Southbound, Queue::TaskProsecution), None);
        assert_eq!(next_hop(Direction::Northbound, Queue::Aspirational), None);
        assert_eq!(next_hop(Direction::Northbound, Queue::Controller), None);
    }
}
