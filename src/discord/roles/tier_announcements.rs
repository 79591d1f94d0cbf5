use crate::core::award::Participant;
use crate::core::roles::RoleTier;
use poise::serenity_prelude::{self as serenity, builder::CreateMessage};
use rand::seq::SliceRandom;

/// Announce a freshly earned rank in `channel_id`.
pub async fn send_tier_announcement(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
    member: &Participant,
    role_name: &str,
    tier: &RoleTier,
) -> Result<(), serenity::Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Rank Up!")
        .description(format!(
            "🎉 **{}** just reached the **{}** role!",
            member.display_name, role_name
        ))
        .color(tier_color(tier.threshold))
        .field("Points", format!("{}+", tier.threshold), true)
        .footer(serenity::CreateEmbedFooter::new(random_flavor_line()));

    channel_id
        .send_message(ctx, CreateMessage::new().embed(embed))
        .await
        .map(|_| ())
}

fn tier_color(threshold: u64) -> serenity::Colour {
    if threshold >= 50_000 {
        serenity::Colour::DARK_PURPLE
    } else if threshold >= 10_000 {
        serenity::Colour::DARK_RED
    } else if threshold >= 5_000 {
        serenity::Colour::GOLD
    } else if threshold >= 1_500 {
        serenity::Colour::BLURPLE
    } else {
        serenity::Colour::LIGHT_GREY
    }
}

fn random_flavor_line() -> &'static str {
    const FLAVOR_LINES: [&str; 4] = [
        "The pack grows stronger.",
        "Time well spent together.",
        "Another step up the pyramid.",
        "Honor to the Ōkami Clan!",
    ];

    FLAVOR_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FLAVOR_LINES[0])
}
