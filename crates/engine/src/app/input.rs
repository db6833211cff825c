use std::collections::VecDeque;

use tracing::warn;

use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Regenerate,
    Quit,
}

const ACTION_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::Regenerate => 0,
            InputAction::Quit => 1,
        }
    }
}

/// One buffered pointer transition, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Vec2 },
    Move { position: Vec2, delta: Vec2 },
    Up { position: Vec2 },
}

pub const POINTER_QUEUE_CAPACITY: usize = 64;

/// Host callbacks push here; the simulation drains once per tick. Events are
/// never handed to a scene mid-frame. On overflow the oldest event is dropped
/// so a stalled simulation cannot grow the queue without bound.
#[derive(Debug)]
pub(crate) struct PointerEventQueue {
    events: VecDeque<PointerEvent>,
    capacity: usize,
    dropped_total: u64,
    overflow_warned: bool,
}

impl Default for PointerEventQueue {
    fn default() -> Self {
        Self::with_capacity(POINTER_QUEUE_CAPACITY)
    }
}

impl PointerEventQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            dropped_total: 0,
            overflow_warned: false,
        }
    }

    pub(crate) fn push(&mut self, event: PointerEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.dropped_total = self.dropped_total.saturating_add(1);
            if !self.overflow_warned {
                self.overflow_warned = true;
                warn!(
                    capacity = self.capacity,
                    "pointer_queue_overflow_dropping_oldest"
                );
            }
        }
        self.events.push_back(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<PointerEvent> {
        self.events.drain(..).collect()
    }

    #[cfg(test)]
    pub(crate) fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_at(x: f32) -> PointerEvent {
        PointerEvent::Down {
            position: Vec2 { x, y: 0.0 },
        }
    }

    #[test]
    fn drain_returns_events_in_push_order_and_empties_queue() {
        let mut queue = PointerEventQueue::with_capacity(8);
        queue.push(down_at(1.0));
        queue.push(down_at(2.0));

        let drained = queue.drain();
        assert_eq!(drained, vec![down_at(1.0), down_at(2.0)]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn overflow_drops_oldest_and_keeps_newest() {
        let mut queue = PointerEventQueue::with_capacity(3);
        for x in 0..5 {
            queue.push(down_at(x as f32));
        }

        let drained = queue.drain();
        assert_eq!(drained, vec![down_at(2.0), down_at(3.0), down_at(4.0)]);
        assert_eq!(queue.dropped_total(), 2);
    }

    #[test]
    fn capacity_zero_is_clamped_to_one() {
        let mut queue = PointerEventQueue::with_capacity(0);
        queue.push(down_at(1.0));
        queue.push(down_at(2.0));
        assert_eq!(queue.drain(), vec![down_at(2.0)]);
    }
}
