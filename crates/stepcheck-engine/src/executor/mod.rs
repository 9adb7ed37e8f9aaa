//! Step executors: one per step kind.
//!
//! Executors never fail. Spawn errors, transport errors, and unreadable
//! bodies are recorded inside the returned result.

pub mod command;
pub mod http;

pub use command::{CommandExecutor, ShellConfig};
pub use http::{canonical_header_name, truncate_body, HttpExecutor, MAX_BODY_CHARS};
