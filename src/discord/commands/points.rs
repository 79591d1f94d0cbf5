// Discord commands for the points ledger.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::config::BotConfig;
use crate::core::award::AwardService;
use crate::core::points::{Comparison, MemberRef, PointsError, PointsService};
use crate::discord::leaderboard_board::{guild_has_channel, refresh_leaderboards};
use crate::infra::points::JsonPointsStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Show your points or another member's.
#[poise::command(prefix_command, slash_command, guild_only, user_cooldown = 30)]
pub async fn points(
    ctx: Context<'_>,
    #[description = "Member to check (defaults to you)"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let (user_id, name) = match &member {
        Some(m) => (m.user.id, m.display_name().to_string()),
        None => (ctx.author().id, author_display_name(ctx).await),
    };
    let id = user_id.get().to_string();

    let record = ctx.data().points.record(MemberRef::new(&id, &name)).await?;

    let embed = serenity::CreateEmbed::new()
        .title(format!("🔹 Points of {}", record.name))
        .description(format!("**{} points**", record.points))
        .color(serenity::Colour::DARK_BLUE);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Give some of your points to another member.
#[poise::command(prefix_command, slash_command, guild_only, user_cooldown = 60)]
pub async fn givepoints(
    ctx: Context<'_>,
    #[description = "Member receiving the points"] member: serenity::Member,
    #[description = "How many points to give"] amount: i64,
) -> Result<(), Error> {
    let author_id = ctx.author().id.get().to_string();
    let author_name = author_display_name(ctx).await;
    let target_id = member.user.id.get().to_string();
    let target_name = member.display_name().to_string();

    let result = ctx
        .data()
        .points
        .transfer(
            MemberRef::new(&author_id, &author_name),
            MemberRef::new(&target_id, &target_name),
            member.user.bot,
            amount,
        )
        .await;

    match result {
        Ok(receipt) => {
            ctx.say(format!(
                "🎁 {} gave {} points to {}.",
                author_name, receipt.amount, target_name
            ))
            .await?;
        }
        Err(e) if e.is_user_error() => {
            ctx.say(rejection_message(&e)).await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// (Admin) Set a member's points.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn setpoints(
    ctx: Context<'_>,
    #[description = "Member to update"] member: serenity::Member,
    #[description = "New point total"] amount: u64,
) -> Result<(), Error> {
    let id = member.user.id.get().to_string();
    let name = member.display_name().to_string();

    ctx.data()
        .points
        .set_points(MemberRef::new(&id, &name), amount)
        .await?;

    ctx.say(format!("✅ Points of {} set to **{}**.", name, amount))
        .await?;

    Ok(())
}

/// Compare your points with another member's.
#[poise::command(prefix_command, slash_command, guild_only, user_cooldown = 60)]
pub async fn compare(
    ctx: Context<'_>,
    #[description = "Member to compare with"] member: serenity::Member,
) -> Result<(), Error> {
    let my_id = ctx.author().id.get().to_string();
    let my_name = author_display_name(ctx).await;
    let their_id = member.user.id.get().to_string();
    let their_name = member.display_name().to_string();

    let comparison = ctx
        .data()
        .points
        .compare(
            MemberRef::new(&my_id, &my_name),
            MemberRef::new(&their_id, &their_name),
        )
        .await?;

    let embed = serenity::CreateEmbed::new()
        .description(comparison_message(&my_name, &their_name, comparison))
        .color(serenity::Colour::GOLD);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Refresh the leaderboard pyramid right now.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn top(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    ctx.defer().await?;
    refresh_leaderboards(ctx.serenity_context(), ctx.data()).await;

    let channel_id = serenity::ChannelId::new(ctx.data().config.leaderboard_channel_id);
    if guild_has_channel(ctx.serenity_context(), guild_id, channel_id) {
        ctx.say(format!(
            "📜 The leaderboard pyramid has been updated in <#{}>.",
            channel_id.get()
        ))
        .await?;
    } else {
        ctx.say("This server has no leaderboard channel.").await?;
    }

    Ok(())
}

/// Guild nickname if we can see it, account display name otherwise.
async fn author_display_name(ctx: Context<'_>) -> String {
    match ctx.author_member().await {
        Some(member) => member.display_name().to_string(),
        None => ctx.author().display_name().to_string(),
    }
}

fn rejection_message(error: &PointsError) -> String {
    match error {
        PointsError::InvalidAmount(_) | PointsError::BotTarget => {
            "⛔ Invalid amount or bot member.".to_string()
        }
        PointsError::SelfTransfer => "⛔ You can't give points to yourself.".to_string(),
        PointsError::InsufficientPoints { available, .. } => {
            format!("⛔ Not enough points. You only have {}.", available)
        }
        PointsError::StorageError(_) => "⛔ Something went wrong, try again later.".to_string(),
    }
}

fn comparison_message(me: &str, them: &str, comparison: Comparison) -> String {
    match comparison {
        Comparison::Ahead(diff) => format!("{} has **{} points more** than {}", me, diff, them),
        Comparison::Behind(diff) => format!("{} has **{} points fewer** than {}", me, diff, them),
        Comparison::Equal => format!("{} and {} have **the same number of points**.", me, them),
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and to the award loop.
#[derive(Clone)]
pub struct Data {
    pub points: Arc<PointsService<JsonPointsStore>>,
    pub awards: Arc<AwardService<JsonPointsStore>>,
    pub config: Arc<BotConfig>,
}
