//! Common utilities and shared types for polis.
//!
//! This crate provides foundational components used across all polis crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Clock**: Injectable wall clock via [`Clock`], with [`SystemClock`] and [`ManualClock`]
//!
//! # Example
//!
//! ```no_run
//! use polis_common::{AppResult, Clock, Config, IdGenerator, SystemClock};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID {} at {}", id, SystemClock.now());
//!     println!("Polls accept up to {} options", config.poll.max_options);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{Config, PollConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
