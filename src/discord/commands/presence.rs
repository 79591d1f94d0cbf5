// Bot presence. Discord-layer glue only: the status line tells members how
// to reach the help command.

use poise::serenity_prelude as serenity;

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::watching("voice channels | !aide");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}
