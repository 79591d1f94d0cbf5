pub mod role_sync;
pub mod role_tiers;

pub use role_sync::{GrantOutcome, PlatformError, RolePlatform, RoleSynchronizer};
pub use role_tiers::{RoleTier, TierParseError, TierTable};
