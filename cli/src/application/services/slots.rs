//! Application service — live/idle slot resolution.

use anyhow::{Context, Result};
use tracing::warn;

use crate::application::ports::ControlPlane;
use crate::domain::slot::{self, SlotPair, SlotRoles};

/// Query the cname of both slots and decide which one is live.
///
/// Both slots holding a binding is tolerated: the secondary is taken as live
/// and a warning names the stray binding on the primary.
///
/// # Errors
///
/// Returns an error if a cname lookup fails at the transport level.
pub async fn resolve(cp: &impl ControlPlane, pair: &SlotPair) -> Result<SlotRoles> {
    let primary = cp
        .get_cname(&pair.primary)
        .await
        .with_context(|| format!("reading cname of {}", pair.primary))?;
    let secondary = cp
        .get_cname(&pair.secondary)
        .await
        .with_context(|| format!("reading cname of {}", pair.secondary))?;

    let roles = slot::resolve_roles(pair, primary, secondary);
    if let Some(stray) = &roles.stray_cname {
        warn!(
            live = %roles.live,
            idle = %roles.idle,
            stray = %stray.join(","),
            "both slots hold a cname, treating {} as live",
            roles.live
        );
    }
    tracing::debug!(live = %roles.live, idle = %roles.idle, "resolved slots");
    Ok(roles)
}
