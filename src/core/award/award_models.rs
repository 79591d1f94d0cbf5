use crate::core::roles::GrantOutcome;
use std::collections::HashMap;

/// Someone connected to a voice channel when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: u64,
    pub display_name: String,
    pub is_bot: bool,
    /// Role ids the member held at snapshot time.
    pub held_roles: Vec<u64>,
}

/// Everyone sitting in one voice channel.
#[derive(Debug, Clone)]
pub struct VoiceGroup {
    pub channel_id: u64,
    pub participants: Vec<Participant>,
}

impl VoiceGroup {
    /// Humans who count as co-present: at least two non-bot members in the
    /// channel. A member sitting alone (or only with bots) earns nothing.
    pub fn co_present_humans(&self) -> Vec<&Participant> {
        let humans: Vec<&Participant> = self.participants.iter().filter(|p| !p.is_bot).collect();
        if humans.len() >= 2 {
            humans
        } else {
            Vec::new()
        }
    }
}

/// Voice activity and known roles for one guild.
#[derive(Debug, Clone, Default)]
pub struct GuildPresence {
    pub guild_id: u64,
    /// role id -> role name
    pub roles: HashMap<u64, String>,
    pub voice_groups: Vec<VoiceGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointAward {
    pub guild_id: u64,
    pub user_id: u64,
    pub new_total: u64,
}

/// Summary of one award loop tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub awards: Vec<PointAward>,
    pub grants: Vec<GrantOutcome>,
    pub leaderboards_refreshed: usize,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        !self.awards.is_empty()
    }
}
