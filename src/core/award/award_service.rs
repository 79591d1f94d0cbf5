// The award loop: every tick, members who share a voice channel with at least
// one other human earn a point, roles are synchronized, and the leaderboard is
// refreshed if anything changed.
//
// The loop itself (the timer) lives in the Discord layer. This service only
// knows how to run ONE tick against an `AwardPlatform`.

use super::award_models::{GuildPresence, PointAward, TickReport};
use crate::core::points::{MemberRef, PointsError, PointsService, PointsStore};
use crate::core::roles::{PlatformError, RolePlatform, RoleSynchronizer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Points earned per tick of co-presence.
pub const POINTS_PER_TICK: u64 = 1;

/// Everything a tick needs from the chat platform.
#[async_trait]
pub trait AwardPlatform: RolePlatform {
    /// Current voice activity across every guild the bot is in.
    async fn voice_presence(&self) -> Vec<GuildPresence>;

    /// Re-render the leaderboard for one guild.
    async fn publish_leaderboard(&self, guild_id: u64) -> Result<(), PlatformError>;
}

pub struct AwardService<S: PointsStore> {
    points: Arc<PointsService<S>>,
    roles: RoleSynchronizer,
    running: AtomicBool,
}

impl<S: PointsStore> AwardService<S> {
    pub fn new(points: Arc<PointsService<S>>, roles: RoleSynchronizer) -> Self {
        Self {
            points,
            roles,
            running: AtomicBool::new(false),
        }
    }

    pub fn roles(&self) -> &RoleSynchronizer {
        &self.roles
    }

    /// Flip the loop from stopped to running.
    /// Returns false if it was already running, in which case the caller must
    /// not start a second timer.
    pub fn mark_running(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Run one tick.
    ///
    /// Role and leaderboard failures are logged and skipped. A storage error
    /// aborts the tick and is returned.
    pub async fn tick<P: AwardPlatform + ?Sized>(
        &self,
        platform: &P,
    ) -> Result<TickReport, PointsError> {
        let presence = platform.voice_presence().await;
        let mut report = TickReport::default();

        for guild in &presence {
            for group in &guild.voice_groups {
                for member in group.co_present_humans() {
                    let id = member.user_id.to_string();
                    let new_total = self
                        .points
                        .award(MemberRef::new(&id, &member.display_name), POINTS_PER_TICK)
                        .await?;

                    report.awards.push(PointAward {
                        guild_id: guild.guild_id,
                        user_id: member.user_id,
                        new_total,
                    });

                    let outcomes = self.roles.sync(platform, guild, member, new_total).await;
                    report.grants.extend(outcomes);
                }
            }
        }

        if report.changed() {
            for guild in &presence {
                match platform.publish_leaderboard(guild.guild_id).await {
                    Ok(()) => report.leaderboards_refreshed += 1,
                    Err(e) => tracing::warn!(
                        guild_id = guild.guild_id,
                        "Failed to refresh leaderboard: {}",
                        e
                    ),
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::award::{Participant, VoiceGroup};
    use crate::core::roles::{GrantOutcome, RoleTier, TierTable};
    use crate::infra::points::InMemoryPointsStore;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    const GUILD: u64 = 10;
    const TIER_ROLE: u64 = 500_500;

    #[derive(Default)]
    struct FakePlatform {
        presence: Mutex<Vec<GuildPresence>>,
        denied_roles: HashSet<u64>,
        grants: Mutex<Vec<(u64, u64)>>,
        announcements: Mutex<Vec<(u64, String)>>,
        leaderboards: Mutex<Vec<u64>>,
    }

    impl FakePlatform {
        fn with_groups(groups: Vec<VoiceGroup>) -> Self {
            let roles = HashMap::from([(TIER_ROLE, "Peasants".to_string())]);
            Self {
                presence: Mutex::new(vec![GuildPresence {
                    guild_id: GUILD,
                    roles,
                    voice_groups: groups,
                }]),
                ..Default::default()
            }
        }

        fn give_role_in_snapshot(&self, user_id: u64, role_id: u64) {
            let mut presence = self.presence.lock().unwrap();
            for group in presence.iter_mut().flat_map(|g| g.voice_groups.iter_mut()) {
                for p in group.participants.iter_mut().filter(|p| p.user_id == user_id) {
                    p.held_roles.push(role_id);
                }
            }
        }
    }

    #[async_trait]
    impl RolePlatform for FakePlatform {
        async fn grant_role(
            &self,
            _guild_id: u64,
            user_id: u64,
            role_id: u64,
            _reason: &str,
        ) -> Result<(), PlatformError> {
            if self.denied_roles.contains(&role_id) {
                return Err(PlatformError::PermissionDenied("role above bot".into()));
            }
            self.grants.lock().unwrap().push((user_id, role_id));
            Ok(())
        }

        async fn announce_tier(
            &self,
            _guild_id: u64,
            member: &Participant,
            role_name: &str,
            _tier: &RoleTier,
        ) -> Result<(), PlatformError> {
            self.announcements
                .lock()
                .unwrap()
                .push((member.user_id, role_name.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl AwardPlatform for FakePlatform {
        async fn voice_presence(&self) -> Vec<GuildPresence> {
            self.presence.lock().unwrap().clone()
        }

        async fn publish_leaderboard(&self, guild_id: u64) -> Result<(), PlatformError> {
            self.leaderboards.lock().unwrap().push(guild_id);
            Ok(())
        }
    }

    fn human(user_id: u64) -> Participant {
        Participant {
            user_id,
            display_name: format!("member-{user_id}"),
            is_bot: false,
            held_roles: Vec::new(),
        }
    }

    fn bot(user_id: u64) -> Participant {
        Participant {
            is_bot: true,
            ..human(user_id)
        }
    }

    fn group(participants: Vec<Participant>) -> VoiceGroup {
        VoiceGroup {
            channel_id: 1,
            participants,
        }
    }

    fn make_service(debounce: Duration) -> AwardService<InMemoryPointsStore> {
        let tiers = TierTable::new(vec![RoleTier {
            threshold: 500,
            role_id: TIER_ROLE,
            label: "Peasants".into(),
        }])
        .unwrap();
        AwardService::new(
            Arc::new(PointsService::new(InMemoryPointsStore::new())),
            RoleSynchronizer::new(tiers, debounce),
        )
    }

    async fn points_of(service: &AwardService<InMemoryPointsStore>, user_id: u64) -> u64 {
        service
            .points
            .record(MemberRef::id_only(&user_id.to_string()))
            .await
            .unwrap()
            .points
    }

    #[tokio::test]
    async fn co_present_humans_earn_one_point_per_tick() {
        let service = make_service(Duration::from_secs(600));
        let platform = FakePlatform::with_groups(vec![group(vec![human(1), human(2), bot(3)])]);

        for _ in 0..3 {
            service.tick(&platform).await.unwrap();
        }

        assert_eq!(points_of(&service, 1).await, 3);
        assert_eq!(points_of(&service, 2).await, 3);
        assert_eq!(points_of(&service, 3).await, 0);
        assert_eq!(platform.leaderboards.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lone_member_with_a_bot_earns_nothing_and_leaderboard_is_left_alone() {
        let service = make_service(Duration::from_secs(600));
        let platform = FakePlatform::with_groups(vec![
            group(vec![human(1), bot(2)]),
            group(vec![human(3)]),
        ]);

        let report = service.tick(&platform).await.unwrap();

        assert!(!report.changed());
        assert_eq!(report.leaderboards_refreshed, 0);
        assert!(platform.leaderboards.lock().unwrap().is_empty());
        assert_eq!(points_of(&service, 1).await, 0);
    }

    #[tokio::test]
    async fn crossing_a_threshold_grants_and_announces_the_role() {
        let service = make_service(Duration::from_secs(600));
        service
            .points
            .set_points(MemberRef::id_only("1"), 499)
            .await
            .unwrap();
        let platform = FakePlatform::with_groups(vec![group(vec![human(1), human(2)])]);

        let report = service.tick(&platform).await.unwrap();

        assert_eq!(points_of(&service, 1).await, 500);
        assert_eq!(*platform.grants.lock().unwrap(), vec![(1, TIER_ROLE)]);
        assert_eq!(
            *platform.announcements.lock().unwrap(),
            vec![(1, "Peasants".to_string())]
        );
        assert_eq!(
            report.grants,
            vec![GrantOutcome::Granted {
                user_id: 1,
                role_id: TIER_ROLE
            }]
        );
    }

    #[tokio::test]
    async fn held_roles_are_never_granted_again() {
        // No debounce: only the held-role check prevents a second grant.
        let service = make_service(Duration::ZERO);
        service
            .points
            .set_points(MemberRef::id_only("1"), 600)
            .await
            .unwrap();
        let platform = FakePlatform::with_groups(vec![group(vec![human(1), human(2)])]);

        service.tick(&platform).await.unwrap();
        platform.give_role_in_snapshot(1, TIER_ROLE);
        service.tick(&platform).await.unwrap();
        service.tick(&platform).await.unwrap();

        assert_eq!(platform.grants.lock().unwrap().len(), 1);
        assert_eq!(platform.announcements.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_grant_is_not_repeated_while_snapshot_lags() {
        let service = make_service(Duration::from_secs(600));
        service
            .points
            .set_points(MemberRef::id_only("1"), 600)
            .await
            .unwrap();
        let platform = FakePlatform::with_groups(vec![group(vec![human(1), human(2)])]);

        service.tick(&platform).await.unwrap();
        service.tick(&platform).await.unwrap();

        assert_eq!(platform.grants.lock().unwrap().len(), 1);
        assert_eq!(platform.announcements.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn denied_grant_does_not_abort_the_tick() {
        let service = make_service(Duration::from_secs(600));
        for id in ["1", "2"] {
            service
                .points
                .set_points(MemberRef::id_only(id), 700)
                .await
                .unwrap();
        }
        let mut platform = FakePlatform::with_groups(vec![group(vec![human(1), human(2)])]);
        platform.denied_roles.insert(TIER_ROLE);

        let report = service.tick(&platform).await.unwrap();

        assert_eq!(report.awards.len(), 2);
        assert_eq!(points_of(&service, 2).await, 701);
        assert!(report
            .grants
            .iter()
            .all(|g| matches!(g, GrantOutcome::Denied { .. })));
        assert!(platform.announcements.lock().unwrap().is_empty());
        assert_eq!(report.leaderboards_refreshed, 1);
    }

    #[tokio::test]
    async fn roles_missing_from_the_guild_are_skipped() {
        let service = make_service(Duration::from_secs(600));
        service
            .points
            .set_points(MemberRef::id_only("1"), 999)
            .await
            .unwrap();
        let platform = FakePlatform::with_groups(vec![group(vec![human(1), human(2)])]);
        platform.presence.lock().unwrap()[0].roles.clear();

        let report = service.tick(&platform).await.unwrap();

        assert!(report.grants.is_empty());
        assert!(platform.grants.lock().unwrap().is_empty());
    }

    #[test]
    fn loop_can_only_be_started_once() {
        let service = make_service(Duration::from_secs(600));
        assert!(service.mark_running());
        assert!(!service.mark_running());
        assert!(!service.mark_running());
    }
}
