//! Slot naming and live/idle role resolution.
//!
//! Pure functions only: the cname lookups are done by the caller.

/// Suffix of the primary slot.
pub const PRIMARY_SUFFIX: &str = "blue";
/// Suffix of the secondary slot.
pub const SECONDARY_SUFFIX: &str = "green";

/// The two application slots derived from the configured base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPair {
    /// `<name>-blue`
    pub primary: String,
    /// `<name>-green`
    pub secondary: String,
}

impl SlotPair {
    #[must_use]
    pub fn from_base(name: &str) -> Self {
        Self {
            primary: format!("{name}-{PRIMARY_SUFFIX}"),
            secondary: format!("{name}-{SECONDARY_SUFFIX}"),
        }
    }
}

/// Which slot currently takes traffic, and which one is free for deploys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRoles {
    pub live: String,
    pub idle: String,
    /// Hostnames bound to the live slot, `None` when no slot holds a binding.
    pub cname: Option<Vec<String>>,
    /// Hostnames still bound to the idle slot. Only set when both slots hold
    /// a binding.
    pub stray_cname: Option<Vec<String>>,
}

impl SlotRoles {
    /// Whether both slots hold a binding.
    #[must_use]
    pub fn both_bound(&self) -> bool {
        self.stray_cname.is_some()
    }
}

/// Decide slot roles from the cname bindings of both slots.
///
/// A bound secondary is live. Otherwise the primary is live, bound or not.
/// When both hold a binding the secondary still wins and the primary's
/// binding is reported in [`SlotRoles::stray_cname`].
#[must_use]
pub fn resolve_roles(
    pair: &SlotPair,
    primary_cname: Option<Vec<String>>,
    secondary_cname: Option<Vec<String>>,
) -> SlotRoles {
    let primary_cname = primary_cname.filter(|c| !c.is_empty());
    let secondary_cname = secondary_cname.filter(|c| !c.is_empty());

    match secondary_cname {
        Some(cname) => SlotRoles {
            live: pair.secondary.clone(),
            idle: pair.primary.clone(),
            cname: Some(cname),
            stray_cname: primary_cname,
        },
        None => SlotRoles {
            live: pair.primary.clone(),
            idle: pair.secondary.clone(),
            cname: primary_cname,
            stray_cname: None,
        },
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
