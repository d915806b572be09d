//! lanes-core: issue workflow and synchronization engine.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` errors in library code, each mapped to an
//!   [`error::ErrorCode`]; `anyhow::Result` only for config loading.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`). Ignored
//!   intents log at debug, applied changes at info, recovered failures at
//!   warn.
//! - **Time**: nothing reads the system clock directly; see [`clock`].

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod lock;
pub mod model;
pub mod notify;
pub mod policy;
pub mod recent;
pub mod schedule;
pub mod store;
pub mod sync;
pub mod workflow;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gateway::{InMemoryGateway, IssueGateway, JsonFileGateway};
pub use model::{Issue, IssueUpdate, Priority, Severity, Status};
pub use policy::{AccessPolicy, Actor, Role};
pub use store::{EditOutcome, IgnoreReason, IssueStore, StatusChange, StoreConfig};
