// Role synchronization: turn a member's new point total into role grants.
//
// The platform side (actually granting a role, posting an announcement) sits
// behind the `RolePlatform` port so the rules here can be tested without Discord.

use super::role_tiers::{RoleTier, TierTable};
use crate::core::award::{GuildPresence, Participant};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures reported by the chat platform.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Missing permissions: {0}")]
    PermissionDenied(String),

    #[error("Platform request failed: {0}")]
    Unavailable(String),
}

/// What the synchronizer needs from the chat platform.
#[async_trait]
pub trait RolePlatform: Send + Sync {
    async fn grant_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Tell the guild that `member` just earned `tier`.
    async fn announce_tier(
        &self,
        guild_id: u64,
        member: &Participant,
        role_name: &str,
        tier: &RoleTier,
    ) -> Result<(), PlatformError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted { user_id: u64, role_id: u64 },
    Denied { user_id: u64, role_id: u64 },
    Failed { user_id: u64, role_id: u64 },
}

/// Grants that succeeded recently.
///
/// The member snapshot we check roles against can lag behind a grant we just
/// made, so a grant that went through is not retried (or re-announced) until
/// `ttl` has passed.
pub struct RecentGrants {
    ttl: Duration,
    granted: DashMap<(u64, u64, u64), Instant>,
}

impl RecentGrants {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            granted: DashMap::new(),
        }
    }

    pub fn is_recent(&self, guild_id: u64, user_id: u64, role_id: u64) -> bool {
        self.granted
            .get(&(guild_id, user_id, role_id))
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    pub fn remember(&self, guild_id: u64, user_id: u64, role_id: u64) {
        let ttl = self.ttl;
        self.granted.retain(|_, at| at.elapsed() < ttl);
        self.granted
            .insert((guild_id, user_id, role_id), Instant::now());
    }
}

pub struct RoleSynchronizer {
    tiers: TierTable,
    recent: RecentGrants,
}

impl RoleSynchronizer {
    pub fn new(tiers: TierTable, debounce: Duration) -> Self {
        Self {
            tiers,
            recent: RecentGrants::new(debounce),
        }
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Grant every tier `member` qualifies for at `total` and does not hold yet.
    ///
    /// Each tier is independent: a failure is logged and the next tier is
    /// still attempted.
    pub async fn sync<P: RolePlatform + ?Sized>(
        &self,
        platform: &P,
        guild: &GuildPresence,
        member: &Participant,
        total: u64,
    ) -> Vec<GrantOutcome> {
        let mut outcomes = Vec::new();
        let user_id = member.user_id;

        for tier in self.tiers.satisfied_by(total) {
            let role_id = tier.role_id;
            let Some(role_name) = guild.roles.get(&role_id) else {
                continue;
            };
            if member.held_roles.contains(&role_id)
                || self.recent.is_recent(guild.guild_id, user_id, role_id)
            {
                continue;
            }

            let reason = format!("Reached {} points", tier.threshold);
            match platform
                .grant_role(guild.guild_id, user_id, role_id, &reason)
                .await
            {
                Ok(()) => {
                    self.recent.remember(guild.guild_id, user_id, role_id);
                    tracing::info!("{} received the role {}", member.display_name, role_name);

                    if let Err(e) = platform
                        .announce_tier(guild.guild_id, member, role_name, tier)
                        .await
                    {
                        tracing::warn!(
                            "Failed to announce {} for {}: {}",
                            role_name,
                            member.display_name,
                            e
                        );
                    }
                    outcomes.push(GrantOutcome::Granted { user_id, role_id });
                }
                Err(PlatformError::PermissionDenied(detail)) => {
                    tracing::warn!(
                        "Unable to add {} to {}: {}",
                        role_name,
                        member.display_name,
                        detail
                    );
                    outcomes.push(GrantOutcome::Denied { user_id, role_id });
                }
                Err(e) => {
                    tracing::warn!("Discord error for {}: {}", member.display_name, e);
                    outcomes.push(GrantOutcome::Failed { user_id, role_id });
                }
            }
        }

        outcomes
    }
}
