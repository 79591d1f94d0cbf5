// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "points/points_service.rs"]
pub mod points;

#[path = "roles/mod.rs"]
pub mod roles;

#[path = "award/mod.rs"]
pub mod award;

#[path = "leaderboard/leaderboard_service.rs"]
pub mod leaderboard;
