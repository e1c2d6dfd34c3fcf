//! # forecast-core
//!
//! Pure logic for forecast sync (no I/O, instant tests).
//!
//! This crate implements the connection state machine and the consumer's
//! held state without any network or runtime dependency.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O is performed by `forecast-client`, which interprets the
//! actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod failure;
pub mod latest;
pub mod state;

pub use failure::{ConnectionFailure, FailureCode, SuspendCause};
pub use latest::LatestForecast;
pub use state::{Action, ConnectionEvent, ConnectionState, Event};
