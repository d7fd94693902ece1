//! # Ilves Core
//!
//! Ilves (Finnish for lynx) is a patient, single-minded command runner for AI
//! agents. It executes one shell command through a pluggable terminal backend
//! and collapses the command's whole asynchronous lifecycle into one
//! deterministic answer: was the call handed back to the operator, and what
//! should the agent read about what happened.
//!
//! ## Core Mission
//!
//! An agent loop that shells out needs more than `Command::output()`. The
//! command streams output line by line, the operator may interrupt it while it
//! runs, a timeout may fire first, and the process may die from a signal
//! instead of exiting. `ilves_core` waits on all of these at once, lets the
//! first one win, and reduces every ending to the same normalized outcome so
//! the caller never has to reason about which path was taken.
//!
//! ## Key Functional Requirements
//!
//! - **One command, one verdict**: `CommandExecutor::execute_command` returns
//!   a `(rejected, report)` pair. `rejected` is true only when the operator
//!   interrupted the command with feedback.
//! - **Three-way race**: terminal completion, an optional timeout, and an
//!   optional live operator interruption compete; losers are cancelled or
//!   abandoned, and output produced before the winner fired is preserved.
//! - **Exactly-once history**: every call that reaches execution emits one
//!   `commandExecuted` lifecycle event, whatever the ending.
//! - **Borrowed terminals**: terminal handles come from a keyed registry pool
//!   and go back to it after the call, alive or detached.
//!
//! ## Architecture & Core Concepts
//!
//! ### The execution race
//!
//! The terminal drives a callback surface (`on_line`, start/complete
//! notifications); the orchestrator funnels those callbacks into a channel and
//! `select!`s over the channel, a timeout timer, and a pending operator ask.
//! The timer abort is forceful (the process is killed); the operator
//! interruption is deliberate detachment (the process keeps running, since it
//! may still be doing useful work).
//!
//! ### Provider kinds
//!
//! Both terminal backends satisfy the same `Terminal` trait. Selection between
//! the shell-integration-capable backend and the plain spawned-process backend
//! is a pure function of one configuration flag; the orchestrator never looks
//! behind the trait.
//!
//! ## Modules
//!
//! - **`executor`**: The orchestrator tying everything below together.
//! - **`workdir`**: Working-directory resolution and existence validation.
//! - **`registry`**: Keyed terminal pool; terminals are borrowed per call.
//! - **`terminal`**: The backend capability traits and callback surface.
//! - **`process`**: The plain spawned-process terminal backend.
//! - **`outcome`**: Normalization of exit codes and signals into one shape.
//! - **`report`**: Caller-facing report assembly and output compression.
//! - **`events`**: Lifecycle event payloads and sink implementations.
//! - **`operator`**: The ask/say channel to the human behind the agent.
//! - **`config`**: Execution defaults, loadable from TOML.

// Public modules
pub mod config;
pub mod events;
pub mod executor;
pub mod operator;
pub mod outcome;
pub mod process;
pub mod registry;
pub mod report;
pub mod terminal;
pub mod utils;
pub mod workdir;

// Internal concurrency core; its surface is `executor`.
mod race;

// Re-export main types for easier use
pub use executor::{CommandExecutor, CommandVerdict, ExecutionContext, ExecutionRequest};
