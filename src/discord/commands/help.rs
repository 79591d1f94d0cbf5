use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// (name, description) for every command, in the order they are listed.
const COMMAND_GUIDE: &[(&str, &str)] = &[
    ("⚔️ !points [@member]", "Show your points or a member's."),
    ("🏆 !top", "Refresh the top 15 leaderboard pyramid."),
    ("🛡️ !setpoints @member X", "(Admin) Set a member's points."),
    ("🧭 !compare @member", "Compare your points with another member."),
    ("🎁 !givepoints @member X", "Give some of your points to another member."),
    ("📜 !aide", "Show this message."),
];

/// Show what the bot can do.
#[poise::command(prefix_command, slash_command, aliases("help"))]
pub async fn aide(ctx: Context<'_>) -> Result<(), Error> {
    let icon_url = ctx.guild().and_then(|g| g.icon_url());

    let mut footer = serenity::CreateEmbedFooter::new("🐺 Honor the Ōkami Clan and climb the pyramid!");
    if let Some(url) = icon_url {
        footer = footer.icon_url(url);
    }

    let embed = COMMAND_GUIDE
        .iter()
        .fold(
            serenity::CreateEmbed::new()
                .title("🌕 **Ōkami Clan Commands** 🐺")
                .description("Master your rank and your points with these commands:")
                .color(serenity::Colour::DARK_PURPLE),
            |embed, (name, value)| embed.field(*name, *value, false),
        )
        .footer(footer);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
