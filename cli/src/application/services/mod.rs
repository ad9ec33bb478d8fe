//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod pre_deploy;
pub mod reconcile;
pub mod slots;
pub mod swap;

/// Exit code returned by `pre` and `swap` when the orchestration aborts.
pub const EXIT_ABORTED: i32 = 2;

/// Environment variable carrying the deploy tag, on the slot and for hooks.
pub const TAG_ENV: &str = "TAG";
