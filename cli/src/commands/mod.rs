//! Command implementations

pub mod pre;
pub mod status;
pub mod swap;
