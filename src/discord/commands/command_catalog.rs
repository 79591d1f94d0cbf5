// Discord commands module.
// Each feature gets its own command file.

pub mod points;

pub mod help;

// Bot presence management
pub mod presence;
