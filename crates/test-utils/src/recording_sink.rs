use std::sync::{Arc, Mutex};

use stagedag::engine::{EventSink, SchedulerEvent, SkipReason};

/// Event sink that keeps every event in emission order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SchedulerEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names from `TaskStarted`, in order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SchedulerEvent::TaskStarted { task } => Some(task),
                _ => None,
            })
            .collect()
    }

    /// `(task, reason)` for every `TaskSkipped`.
    pub fn skipped(&self) -> Vec<(String, SkipReason)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SchedulerEvent::TaskSkipped { task, reason } => Some((task, reason)),
                _ => None,
            })
            .collect()
    }

    /// Position of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&SchedulerEvent) -> bool) -> Option<usize> {
        self.events().iter().position(pred)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SchedulerEvent) {
        self.events.lock().unwrap().push(event);
    }
}
