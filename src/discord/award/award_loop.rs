// The Discord side of the award loop: a timer that runs one core tick per
// period, and the `AwardPlatform` implementation the tick talks to.

use crate::core::award::{AwardPlatform, GuildPresence, Participant, VoiceGroup};
use crate::core::roles::{PlatformError, RolePlatform, RoleTier};
use crate::discord::leaderboard_board::{guild_has_channel, publish_leaderboard};
use crate::discord::tier_announcements::send_tier_announcement;
use crate::discord::Data;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

/// Start the award loop unless it is already running.
///
/// Ticks that were missed (e.g. while the gateway was reconnecting) are
/// skipped, never replayed.
pub fn start_award_loop(ctx: &serenity::Context, data: &Data) {
    if !data.awards.mark_running() {
        tracing::debug!("Award loop already running");
        return;
    }

    let awards = Arc::clone(&data.awards);
    let period = data.config.award_interval;
    let platform = DiscordPlatform {
        ctx: ctx.clone(),
        data: data.clone(),
    };

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match awards.tick(&platform).await {
                Ok(report) if report.changed() => {
                    for award in &report.awards {
                        tracing::debug!(
                            guild_id = award.guild_id,
                            user_id = award.user_id,
                            total = award.new_total,
                            "Voice point awarded"
                        );
                    }
                    tracing::debug!(
                        awards = report.awards.len(),
                        grants = report.grants.len(),
                        leaderboards = report.leaderboards_refreshed,
                        "Award tick finished"
                    );
                }
                Ok(_) => tracing::debug!("Award tick finished with nobody co-present"),
                Err(e) => tracing::error!("Award tick aborted: {}", e),
            }
        }
    });

    tracing::info!("Award loop started ({:?} period)", period);
}

pub struct DiscordPlatform {
    ctx: serenity::Context,
    data: Data,
}

/// Map a serenity error onto the two cases the role synchronizer cares about.
fn classify(err: serenity::Error) -> PlatformError {
    let forbidden = match &err {
        serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()) == Some(403),
        _ => false,
    };

    if forbidden {
        PlatformError::PermissionDenied(err.to_string())
    } else {
        PlatformError::Unavailable(err.to_string())
    }
}

/// Snapshot one guild's voice channels from the cache.
fn guild_presence(guild: &serenity::Guild) -> GuildPresence {
    let mut groups: HashMap<serenity::ChannelId, Vec<Participant>> = HashMap::new();

    for (user_id, state) in &guild.voice_states {
        let Some(channel_id) = state.channel_id else {
            continue;
        };
        let is_voice = guild
            .channels
            .get(&channel_id)
            .map(|c| c.kind == serenity::ChannelType::Voice)
            .unwrap_or(false);
        if !is_voice {
            continue;
        }
        // Without the member we can't tell a bot from a human.
        let Some(member) = guild.members.get(user_id).or(state.member.as_ref()) else {
            continue;
        };

        groups.entry(channel_id).or_default().push(Participant {
            user_id: user_id.get(),
            display_name: member.display_name().to_string(),
            is_bot: member.user.bot,
            held_roles: member.roles.iter().map(|r| r.get()).collect(),
        });
    }

    let mut voice_groups: Vec<VoiceGroup> = groups
        .into_iter()
        .map(|(channel_id, mut participants)| {
            participants.sort_by_key(|p| p.user_id);
            VoiceGroup {
                channel_id: channel_id.get(),
                participants,
            }
        })
        .collect();
    voice_groups.sort_by_key(|g| g.channel_id);

    GuildPresence {
        guild_id: guild.id.get(),
        roles: guild
            .roles
            .iter()
            .map(|(id, role)| (id.get(), role.name.clone()))
            .collect(),
        voice_groups,
    }
}

#[async_trait]
impl RolePlatform for DiscordPlatform {
    async fn grant_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.ctx
            .http
            .add_member_role(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some(reason),
            )
            .await
            .map_err(classify)
    }

    async fn announce_tier(
        &self,
        guild_id: u64,
        member: &Participant,
        role_name: &str,
        tier: &RoleTier,
    ) -> Result<(), PlatformError> {
        let Some(channel_id) = self.data.config.announce_channel_id else {
            return Ok(());
        };
        let channel_id = serenity::ChannelId::new(channel_id);
        if !guild_has_channel(&self.ctx, serenity::GuildId::new(guild_id), channel_id) {
            return Ok(());
        }

        send_tier_announcement(&self.ctx, channel_id, member, role_name, tier)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl AwardPlatform for DiscordPlatform {
    async fn voice_presence(&self) -> Vec<GuildPresence> {
        let cache = &self.ctx.cache;
        cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| cache.guild(guild_id).map(|guild| guild_presence(&guild)))
            .collect()
    }

    async fn publish_leaderboard(&self, guild_id: u64) -> Result<(), PlatformError> {
        publish_leaderboard(&self.ctx, &self.data, serenity::GuildId::new(guild_id))
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::Unavailable(e.to_string()))
    }
}
