//! Nixie Runtime
//!
//! The actor engine for Nixie: per-actor dispatch loops, actor references,
//! the process-wide registry, and the cancellable scheduler.
//!
//! # Overview
//!
//! Actors own private state and communicate only by asynchronous message
//! passing through strict-FIFO mailboxes. Exactly one concurrency unit runs
//! an actor's dispatch loop, so no two messages for one actor are ever
//! processed concurrently, on any substrate.
//!
//! ```rust,ignore
//! use nixie_runtime::{Actor, ActorSystem};
//!
//! let system = ActorSystem::new();
//! let counter = system.start(Counter::default());
//! counter.tell(Command::Increment)?;
//! let count = counter.ask(Command::Get).await?;
//! system.shutdown().await;
//! ```
//!
//! # TigerStyle
//!
//! This crate follows [TigerStyle](https://github.com/tigerbeetle/tigerbeetle/blob/main/docs/TIGER_STYLE.md)
//! engineering principles:
//! - Safety > Performance > Developer Experience
//! - Explicit limits with big-endian naming
//! - 2+ assertions per function
//! - No recursion (bounded iteration only)

pub mod actor;
pub mod actor_ref;
pub mod dispatch;
pub mod mailbox;
pub mod registry;
pub mod scheduler;
pub mod system;

pub use actor::{Actor, ActorState};
pub use actor_ref::{ActorHandle, ActorRef};
pub use dispatch::{ActorCell, Step};
pub use mailbox::{Envelope, MailboxClosedError, MailboxReceiver, MailboxSender};
pub use registry::ActorRegistry;
pub use scheduler::{Cancellable, Scheduler};
pub use system::ActorSystem;
