//! Step execution engine for stepcheck lessons.
//!
//! This crate runs a lesson's steps: `${name}` template substitution, jq
//! queries over JSON documents, command and HTTP executors, assertion
//! descriptions, lifecycle events, and the run orchestrator with verdict
//! replay.

pub mod block;
pub mod describe;
pub mod events;
pub mod executor;
pub mod jq;
pub mod runner;
pub mod template;

pub use block::extract_block;
pub use describe::{describe_command, describe_http};
pub use events::{EventEmitter, EventSink, RecordingSink, RunEvent, StepKind};
pub use executor::{CommandExecutor, HttpExecutor, ShellConfig, MAX_BODY_CHARS};
pub use jq::{evaluate, run_stdout_query, value_from_path, QueryError};
pub use runner::{replay_verdict, RunConfig, Runner, DEFAULT_LOCALE};
pub use template::substitute;
