//! Domain layer — pure deployment types, capacity planning, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod capacity;
pub mod config;
pub mod error;
pub mod slot;
pub mod swap;

pub use capacity::{RetryPolicy, ScaleDirection, ScaleStep, UnitCounts, plan_changes};
pub use config::{AppConfig, DeployMode, Hook, Settings, Target};
pub use error::{ConfigError, SwapError};
pub use slot::{SlotPair, SlotRoles};
pub use swap::{SwapMachine, SwapPhase};
