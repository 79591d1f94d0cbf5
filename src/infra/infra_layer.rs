// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "points/points_store.rs"]
pub mod points;

#[path = "health/health_server.rs"]
pub mod health;
