//! Lifecycle events for a run.
//!
//! The runner reports progress through an [`EventSink`]. [`EventEmitter`]
//! forwards events over an unbounded [`tokio::sync::mpsc`] channel so the
//! renderer can consume them on its own task without ever blocking the run.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use stepcheck_types::{ResponseVariable, StepResult, SubmissionVerdict};
use tokio::sync::mpsc;

/// Which executor a step runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Command,
    Http,
}

/// Events emitted while running or replaying a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    StepStarted {
        index: usize,
        kind: StepKind,
        /// Interpolated command line, or `METHOD url`.
        display: String,
        response_variables: Vec<ResponseVariable>,
        stdout_filter: Option<String>,
    },
    TestStarted {
        step_index: usize,
        test_index: usize,
        text: String,
    },
    /// `passed` is `None` outside of verdict replay.
    TestResolved {
        step_index: usize,
        test_index: usize,
        passed: Option<bool>,
    },
    StepResolved {
        index: usize,
        passed: Option<bool>,
        result: Option<Box<StepResult>>,
    },
    Waiting {
        duration_ms: u64,
    },
    /// Terminal event. Nothing is emitted after it.
    RunDone {
        verdict: Option<SubmissionVerdict>,
        is_submit: bool,
    },
}

/// Receiver of run events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Event emitter wrapping an unbounded mpsc sender.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for EventEmitter {
    /// Events sent after the receiver is dropped are discarded.
    fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }
}

/// Sink that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: RunEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
