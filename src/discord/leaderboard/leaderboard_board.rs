// Publishing the leaderboard pyramid. Ranking and text live in
// core::leaderboard; this file only decides whether to edit the bot's last
// leaderboard message or post a fresh one.

use crate::core::leaderboard::{self, LEADERBOARD_SIZE, LEADERBOARD_TITLE};
use crate::core::points::UserRecord;
use crate::core::roles::TierTable;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// How far back to look for the previous leaderboard message.
const HISTORY_SCAN_LIMIT: u8 = 50;

pub fn guild_has_channel(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
) -> bool {
    ctx.cache
        .guild(guild_id)
        .map(|g| g.channels.contains_key(&channel_id))
        .unwrap_or(false)
}

/// Render the leaderboard in `guild_id`'s leaderboard channel.
///
/// Returns `Ok(false)` when the guild has no such channel.
pub async fn publish_leaderboard(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
) -> Result<bool, Error> {
    let channel_id = serenity::ChannelId::new(data.config.leaderboard_channel_id);

    // Keep the cache guard out of the awaits below.
    let icon_url = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return Ok(false);
        };
        if !guild.channels.contains_key(&channel_id) {
            return Ok(false);
        }
        guild.icon_url()
    };

    let ranked = leaderboard::rank(data.points.all_records().await?, LEADERBOARD_SIZE);
    let embed = build_leaderboard_embed(&ranked, data.awards.roles().tiers(), icon_url);

    let bot_id = ctx.cache.current_user().id;
    let mut history = channel_id
        .messages(ctx, serenity::GetMessages::new().limit(HISTORY_SCAN_LIMIT))
        .await?;

    let previous = history
        .iter()
        .position(|m| is_leaderboard_message(m, bot_id))
        .map(|i| history.swap_remove(i));

    match previous {
        Some(mut previous) => {
            previous
                .edit(ctx, serenity::EditMessage::new().embed(embed))
                .await?;
        }
        None => {
            channel_id
                .send_message(ctx, serenity::CreateMessage::new().embed(embed))
                .await?;
        }
    }

    Ok(true)
}

/// Re-render the leaderboard in every guild the bot is in.
/// Failures are logged per guild.
pub async fn refresh_leaderboards(ctx: &serenity::Context, data: &Data) -> usize {
    let mut refreshed = 0;

    for guild_id in ctx.cache.guilds() {
        match publish_leaderboard(ctx, data, guild_id).await {
            Ok(true) => refreshed += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(guild_id = guild_id.get(), "Failed to refresh leaderboard: {}", e),
        }
    }

    refreshed
}

fn is_leaderboard_message(message: &serenity::Message, bot_id: serenity::UserId) -> bool {
    is_leaderboard_post(
        message.author.id.get(),
        bot_id.get(),
        message.embeds.iter().map(|e| e.title.as_deref()),
    )
}

/// A previous leaderboard is one the bot itself posted with the leaderboard
/// embed attached. Anything else in the channel is left alone.
fn is_leaderboard_post<'a>(
    author_id: u64,
    bot_id: u64,
    mut embed_titles: impl Iterator<Item = Option<&'a str>>,
) -> bool {
    author_id == bot_id && embed_titles.any(|title| title == Some(LEADERBOARD_TITLE))
}

fn build_leaderboard_embed(
    ranked: &[UserRecord],
    tiers: &TierTable,
    icon_url: Option<String>,
) -> serenity::CreateEmbed {
    let mut footer = serenity::CreateEmbedFooter::new(leaderboard::tier_footer(tiers));
    if let Some(url) = icon_url {
        footer = footer.icon_url(url);
    }

    serenity::CreateEmbed::new()
        .title(LEADERBOARD_TITLE)
        .description(leaderboard::render_pyramid(ranked))
        .color(serenity::Colour::DARK_RED)
        .footer(footer)
}
