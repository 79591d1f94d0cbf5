pub mod award_models;
pub mod award_service;

pub use award_models::{GuildPresence, Participant, VoiceGroup};
pub use award_service::{AwardPlatform, AwardService};
