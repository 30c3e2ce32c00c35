use crate::domain::model::Snapshot;
use crate::domain::ports::DrawObserver;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawEvent {
    DrawStarted,
    NumberSampled(i64),
    DrawStopped { number: i64, tier_index: usize },
    TierAdvanced(usize),
    AllFinished,
    StateChanged(Snapshot),
}

/// Observer that queues every callback as a [`DrawEvent`].
///
/// Clones share the same queue, so one handle can be registered with the
/// engine while another is polled by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<DrawEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DrawEvent> {
        self.events.borrow().clone()
    }

    /// Events other than `StateChanged`, which fires after every operation.
    pub fn transitions(&self) -> Vec<DrawEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|event| !matches!(event, DrawEvent::StateChanged(_)))
            .cloned()
            .collect()
    }

    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.events.borrow().iter().rev().find_map(|event| match event {
            DrawEvent::StateChanged(snapshot) => Some(snapshot.clone()),
            _ => None,
        })
    }

    fn push(&self, event: DrawEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl DrawObserver for EventLog {
    fn on_draw_start(&mut self) {
        self.push(DrawEvent::DrawStarted);
    }

    fn on_number_sampled(&mut self, number: i64) {
        self.push(DrawEvent::NumberSampled(number));
    }

    fn on_draw_stop(&mut self, winning_number: i64, tier_index: usize) {
        self.push(DrawEvent::DrawStopped {
            number: winning_number,
            tier_index,
        });
    }

    fn on_tier_advanced(&mut self, new_index: usize) {
        self.push(DrawEvent::TierAdvanced(new_index));
    }

    fn on_all_finished(&mut self) {
        self.push(DrawEvent::AllFinished);
    }

    fn on_state_changed(&mut self, snapshot: &Snapshot) {
        self.push(DrawEvent::StateChanged(snapshot.clone()));
    }
}
