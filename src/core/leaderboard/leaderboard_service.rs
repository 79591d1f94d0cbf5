// Leaderboard ranking and rendering. Pure functions over ledger records;
// posting or editing the message is the Discord layer's job.

use crate::core::points::UserRecord;
use crate::core::roles::TierTable;

/// How many members the leaderboard shows.
pub const LEADERBOARD_SIZE: usize = 15;

/// Members per indentation step of the pyramid.
const GROUP_SIZE: usize = 3;

/// Deepest indentation level (the fifth group of three).
const MAX_INDENT: usize = 4;

pub const LEADERBOARD_TITLE: &str = "🎌 Ōkami Clan Leaderboard";

const MEDALS: [&str; LEADERBOARD_SIZE] = [
    "🥇", "🥈", "🥉", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟", "🏅", "🏅", "🏅", "🏅", "🏅",
];

/// Sort by points (highest first), break ties by id so the order is stable,
/// and keep the top `limit`.
pub fn rank(mut records: Vec<UserRecord>, limit: usize) -> Vec<UserRecord> {
    records.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id)));
    records.truncate(limit);
    records
}

/// Render ranked records as the pyramid: groups of three, each group one
/// space deeper than the one above.
pub fn render_pyramid(ranked: &[UserRecord]) -> String {
    if ranked.is_empty() {
        return "Nobody has earned points yet. Hop into a voice channel together!".to_string();
    }

    ranked
        .iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(i, record)| {
            let indent = " ".repeat((i / GROUP_SIZE).min(MAX_INDENT));
            format!(
                "{}{} {}: **{} pts**",
                indent, MEDALS[i], record.name, record.points
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Footer listing every rank and the points it takes.
pub fn tier_footer(tiers: &TierTable) -> String {
    let ranks = tiers
        .iter()
        .map(|t| format!("{}: {} pts", t.label, t.threshold))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("🐺 {}", ranks)
}
