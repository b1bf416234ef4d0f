//! Nixie Core
//!
//! Core types, errors, and constants for the Nixie actor runtime.
//!
//! # Overview
//!
//! Nixie is an in-process actor runtime: isolated actors with sequential
//! mailboxes, single-assignment reply futures, a drift-compensating
//! scheduler, and a pluggable concurrency substrate.
//!
//! # TigerStyle
//!
//! This crate follows [TigerStyle](https://github.com/tigerbeetle/tigerbeetle/blob/main/docs/TIGER_STYLE.md)
//! engineering principles:
//! - Safety > Performance > Developer Experience
//! - Explicit limits with big-endian naming (e.g., `SCHEDULE_DELAY_MS_MAX`)
//! - 2+ assertions per function
//! - No recursion (bounded iteration only)

pub mod constants;
pub mod error;
pub mod future;
pub mod runtime;
pub mod telemetry;

pub use constants::*;
pub use error::{Error, Result};
pub use future::ActorFuture;
pub use runtime::{ActorRuntime, Instant, JoinError, JoinHandle, TimerHandle, TokioRuntime};
pub use telemetry::{init_telemetry, TelemetryConfig};
