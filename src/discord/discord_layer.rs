// Discord layer - commands, the award loop timer, and everything that posts
// to channels.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "award/award_loop.rs"]
pub mod award_loop;

#[path = "leaderboard/leaderboard_board.rs"]
pub mod leaderboard_board;

#[path = "roles/tier_announcements.rs"]
pub mod tier_announcements;

// Re-export command types for convenience
pub use commands::points::{Context, Data, Error};
