//! Event log for flow executions
//!
//! Bounded audit trail of the executions an executor runs.
//! - Event: envelope with id + timestamp + execution id + kind
//! - EventKind: one variant per executor state transition
//! - EventLog: thread-safe ring buffer, shared by concurrent executions

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    /// Execution this event belongs to
    pub execution_id: Arc<str>,
    /// Event type and data
    pub kind: EventKind,
}

/// Executor transitions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    FlowStarted {
        flow: Arc<str>,
        input: Value,
    },
    InputRejected {
        flow: Arc<str>,
        violations: usize,
    },
    PromptRendered {
        flow: Arc<str>,
        prompt_len: usize,
    },
    ModelCalled {
        flow: Arc<str>,
        provider: String,
        round: u32,
        tools_offered: usize,
    },
    ModelResponded {
        flow: Arc<str>,
        tool_calls: usize,
        tokens_used: Option<u32>,
    },
    ToolInvoked {
        flow: Arc<str>,
        tool: String,
        output: Value,
    },
    /// Tool call refused: undeclared tool or input outside its schema
    ToolRejected {
        flow: Arc<str>,
        tool: String,
        reason: String,
    },
    FallbackApplied {
        flow: Arc<str>,
        reason: String,
    },
    FlowCompleted {
        flow: Arc<str>,
        fallback: bool,
        duration_ms: u64,
    },
}

impl EventKind {
    pub fn flow(&self) -> &str {
        match self {
            Self::FlowStarted { flow, .. }
            | Self::InputRejected { flow, .. }
            | Self::PromptRendered { flow, .. }
            | Self::ModelCalled { flow, .. }
            | Self::ModelResponded { flow, .. }
            | Self::ToolInvoked { flow, .. }
            | Self::ToolRejected { flow, .. }
            | Self::FallbackApplied { flow, .. }
            | Self::FlowCompleted { flow, .. } => flow,
        }
    }

    /// Ends an execution
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FlowCompleted { .. } | Self::InputRejected { .. })
    }
}

/// Events retained by [`EventLog::new`]
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Thread-safe event log keeping the most recent `capacity` events
///
/// Once full, every emit evicts the oldest event. Long-lived callers can
/// [`drain`](EventLog::drain) it to ship events elsewhere.
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<VecDeque<Event>>>,
    capacity: usize,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
    evicted: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Log retaining at most `capacity` events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let initial = capacity.min(DEFAULT_EVENT_CAPACITY);
        Self {
            events: Arc::new(RwLock::new(VecDeque::with_capacity(initial))),
            capacity,
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped to stay within capacity
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, execution_id: &Arc<str>, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            execution_id: Arc::clone(execution_id),
            kind,
        };

        let mut events = self.events.write();
        if events.len() == self.capacity {
            events.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        events.push_back(event);
        id
    }

    /// Get all retained events (cloned), oldest first
    pub fn events(&self) -> Vec<Event> {
        self.events.read().iter().cloned().collect()
    }

    /// Take every retained event, leaving the log empty
    pub fn drain(&self) -> Vec<Event> {
        self.events.write().drain(..).collect()
    }

    /// Events of one execution, in emission order
    pub fn filter_execution(&self, execution_id: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| &*e.execution_id == execution_id)
            .cloned()
            .collect()
    }

    /// Events of every execution of one flow
    pub fn filter_flow(&self, flow: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind.flow() == flow)
            .cloned()
            .collect()
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
