//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: HTTP calls to the control
//! plane and notification endpoints, process execution, and config loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod control_plane;
pub mod deployer;
pub mod hooks;
pub mod notify;
