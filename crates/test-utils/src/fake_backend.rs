use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagedag::exec::{ExecutorBackend, TaskFuture};

#[derive(Debug, Clone)]
enum Outcome {
    Succeed,
    Fail(String),
    Panic(String),
}

#[derive(Default)]
struct Shared {
    names: HashSet<String>,
    outcomes: Mutex<HashMap<String, Outcome>>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Mutex<Option<Duration>>,
    invocations: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

/// A fake backend that:
/// - records which tasks were invoked, in invocation order
/// - succeeds by default, or fails / panics for configured tasks
/// - optionally sleeps, and tracks the peak number of concurrent bodies.
///
/// Clones share their recordings, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Clone)]
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    /// A backend with a body bound for every name in `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shared: Arc::new(Shared {
                names: names.into_iter().map(Into::into).collect(),
                ..Shared::default()
            }),
        }
    }

    pub fn failing(self, task: &str) -> Self {
        self.set_outcome(task, Outcome::Fail(format!("{task} failed on purpose")));
        self
    }

    pub fn panicking(self, task: &str) -> Self {
        self.set_outcome(task, Outcome::Panic(format!("{task} panicked on purpose")));
        self
    }

    /// Make `task` succeed again (e.g. between two runs).
    pub fn succeeding(self, task: &str) -> Self {
        self.set_outcome(task, Outcome::Succeed);
        self
    }

    pub fn with_delay(self, task: &str, delay: Duration) -> Self {
        self.shared
            .delays
            .lock()
            .unwrap()
            .insert(task.to_string(), delay);
        self
    }

    /// Delay used for tasks without their own delay.
    pub fn with_default_delay(self, delay: Duration) -> Self {
        *self.shared.default_delay.lock().unwrap() = Some(delay);
        self
    }

    fn set_outcome(&self, task: &str, outcome: Outcome) {
        self.shared
            .outcomes
            .lock()
            .unwrap()
            .insert(task.to_string(), outcome);
    }

    pub fn invocations(&self) -> Vec<String> {
        self.shared.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self, task: &str) -> usize {
        self.invocations().iter().filter(|t| *t == task).count()
    }

    pub fn clear_invocations(&self) {
        self.shared.invocations.lock().unwrap().clear();
    }

    /// Highest number of bodies that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }
}

impl ExecutorBackend for FakeBackend {
    fn has_task(&self, task: &str) -> bool {
        self.shared.names.contains(task)
    }

    fn invoke(&self, task: &str) -> TaskFuture {
        self.shared
            .invocations
            .lock()
            .unwrap()
            .push(task.to_string());

        let outcome = self
            .shared
            .outcomes
            .lock()
            .unwrap()
            .get(task)
            .cloned()
            .unwrap_or(Outcome::Succeed);
        let delay = self
            .shared
            .delays
            .lock()
            .unwrap()
            .get(task)
            .copied()
            .or(*self.shared.default_delay.lock().unwrap());
        let shared = Arc::clone(&self.shared);

        Box::pin(async move {
            let now = shared.running.fetch_add(1, Ordering::SeqCst) + 1;
            shared.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            shared.running.fetch_sub(1, Ordering::SeqCst);

            match outcome {
                Outcome::Succeed => Ok(()),
                Outcome::Fail(msg) => Err(anyhow::anyhow!(msg)),
                Outcome::Panic(msg) => panic!("{msg}"),
            }
        })
    }
}
