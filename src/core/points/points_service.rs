// The points ledger - every rule about how a member's points change lives here.
// Like the rest of `core/`, this module knows nothing about Discord: members are
// identified by opaque string ids and display names are plain strings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name stored for a member we have never seen a display name for.
pub const UNKNOWN_NAME: &str = "Unknown";

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// One row of the ledger. This is the only thing the bot persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub points: u64,
    /// Last observed display name. Informational only.
    pub name: String,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            points: 0,
            name: name.unwrap_or(UNKNOWN_NAME).to_string(),
        }
    }
}

/// A member as seen by whoever is calling into the ledger.
///
/// `name` is `None` when the caller only knows the id; the stored name is
/// then left alone.
#[derive(Debug, Clone, Copy)]
pub struct MemberRef<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
}

impl<'a> MemberRef<'a> {
    pub fn new(id: &'a str, name: &'a str) -> Self {
        Self {
            id,
            name: Some(name),
        }
    }

    #[cfg(test)]
    pub fn id_only(id: &'a str) -> Self {
        Self { id, name: None }
    }
}

/// Balances after a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub amount: u64,
    pub sender_total: u64,
    pub receiver_total: u64,
}

/// Outcome of `compare`, always from the point of view of the first member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Ahead(u64),
    Behind(u64),
    Equal,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PointsError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not enough points: {available} available, {requested} requested")]
    InsufficientPoints { available: u64, requested: u64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Bots cannot hold points")]
    BotTarget,

    #[error("Cannot transfer points to yourself")]
    SelfTransfer,
}

impl PointsError {
    /// True for errors caused by what the user typed, as opposed to the
    /// storage layer failing underneath us.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, PointsError::StorageError(_))
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for the points ledger.
///
/// Every method is a single atomic operation on the store. In particular a
/// transfer is never observed half-applied.
#[async_trait]
pub trait PointsStore: Send + Sync {
    /// Fetch a record, creating a zero-point one if the id is unknown.
    /// Refreshes the stored name when a different one is supplied.
    async fn get_or_create(&self, member: MemberRef<'_>) -> Result<UserRecord, PointsError>;

    /// Add `delta` to a member's total and return the new total.
    async fn add_points(&self, member: MemberRef<'_>, delta: u64) -> Result<u64, PointsError>;

    /// Overwrite a member's total.
    async fn set_points(&self, member: MemberRef<'_>, points: u64) -> Result<(), PointsError>;

    /// Move `amount` points from `from` to `to`.
    /// Fails with `InsufficientPoints` and changes nothing if `from` cannot cover it.
    async fn transfer_points(
        &self,
        from: MemberRef<'_>,
        to: MemberRef<'_>,
        amount: u64,
    ) -> Result<(u64, u64), PointsError>;

    /// Every record in the ledger, in store order.
    async fn all_records(&self) -> Result<Vec<UserRecord>, PointsError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct PointsService<S: PointsStore> {
    store: S,
}

impl<S: PointsStore> PointsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Look up a member's record (creating it on first sight).
    pub async fn record(&self, member: MemberRef<'_>) -> Result<UserRecord, PointsError> {
        self.store.get_or_create(member).await
    }

    /// Credit points earned by the award loop. Returns the new total.
    pub async fn award(&self, member: MemberRef<'_>, amount: u64) -> Result<u64, PointsError> {
        let total = self.store.add_points(member, amount).await?;
        tracing::info!(
            "{} received {} point(s). Total: {}",
            member.name.unwrap_or(member.id),
            amount,
            total
        );
        Ok(total)
    }

    /// Administrative override.
    pub async fn set_points(&self, member: MemberRef<'_>, points: u64) -> Result<(), PointsError> {
        self.store.set_points(member, points).await?;
        tracing::info!(
            "Points of {} set to {}",
            member.name.unwrap_or(member.id),
            points
        );
        Ok(())
    }

    /// Give part of `from`'s balance to `to`.
    ///
    /// `amount` is signed because it comes straight from user input; anything
    /// below 1 is rejected before the store is touched.
    pub async fn transfer(
        &self,
        from: MemberRef<'_>,
        to: MemberRef<'_>,
        to_is_bot: bool,
        amount: i64,
    ) -> Result<TransferReceipt, PointsError> {
        if amount <= 0 {
            return Err(PointsError::InvalidAmount(amount));
        }
        if to_is_bot {
            return Err(PointsError::BotTarget);
        }
        if from.id == to.id {
            return Err(PointsError::SelfTransfer);
        }

        let amount = amount.unsigned_abs();
        let (sender_total, receiver_total) = self.store.transfer_points(from, to, amount).await?;

        tracing::info!(
            "{} gave {} point(s) to {}",
            from.name.unwrap_or(from.id),
            amount,
            to.name.unwrap_or(to.id)
        );

        Ok(TransferReceipt {
            amount,
            sender_total,
            receiver_total,
        })
    }

    /// Compare two members' totals.
    pub async fn compare(
        &self,
        me: MemberRef<'_>,
        other: MemberRef<'_>,
    ) -> Result<Comparison, PointsError> {
        let mine = self.store.get_or_create(me).await?.points;
        let theirs = self.store.get_or_create(other).await?.points;

        Ok(match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => Comparison::Ahead(mine - theirs),
            std::cmp::Ordering::Less => Comparison::Behind(theirs - mine),
            std::cmp::Ordering::Equal => Comparison::Equal,
        })
    }

    /// Snapshot of the whole ledger for ranking.
    pub async fn all_records(&self) -> Result<Vec<UserRecord>, PointsError> {
        self.store.all_records().await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::points::InMemoryPointsStore;

    fn make_service() -> PointsService<InMemoryPointsStore> {
        PointsService::new(InMemoryPointsStore::new())
    }

    async fn seed(service: &PointsService<InMemoryPointsStore>, id: &str, points: u64) {
        service
            .set_points(MemberRef::new(id, id), points)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn transfer_moves_points_and_conserves_the_sum() {
        let service = make_service();
        seed(&service, "1", 100).await;
        seed(&service, "2", 20).await;

        let receipt = service
            .transfer(MemberRef::new("1", "alice"), MemberRef::new("2", "bob"), false, 30)
            .await
            .unwrap();

        assert_eq!(receipt.sender_total, 70);
        assert_eq!(receipt.receiver_total, 50);
        assert_eq!(receipt.sender_total + receipt.receiver_total, 120);
    }

    #[tokio::test]
    async fn zero_and_negative_transfers_are_rejected_without_mutation() {
        let service = make_service();
        seed(&service, "1", 100).await;
        seed(&service, "2", 0).await;

        for amount in [0, -5] {
            let err = service
                .transfer(MemberRef::id_only("1"), MemberRef::id_only("2"), false, amount)
                .await
                .unwrap_err();
            assert!(matches!(err, PointsError::InvalidAmount(a) if a == amount));
        }

        assert_eq!(service.record(MemberRef::id_only("1")).await.unwrap().points, 100);
        assert_eq!(service.record(MemberRef::id_only("2")).await.unwrap().points, 0);
    }

    #[tokio::test]
    async fn transfer_to_bot_or_self_is_rejected() {
        let service = make_service();
        seed(&service, "1", 100).await;

        let err = service
            .transfer(MemberRef::id_only("1"), MemberRef::id_only("9"), true, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, PointsError::BotTarget));

        let err = service
            .transfer(MemberRef::id_only("1"), MemberRef::id_only("1"), false, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, PointsError::SelfTransfer));

        assert_eq!(service.record(MemberRef::id_only("1")).await.unwrap().points, 100);
    }

    #[tokio::test]
    async fn insufficient_balance_leaves_both_members_untouched() {
        let service = make_service();
        seed(&service, "1", 5).await;
        seed(&service, "2", 7).await;

        let err = service
            .transfer(MemberRef::id_only("1"), MemberRef::id_only("2"), false, 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PointsError::InsufficientPoints {
                available: 5,
                requested: 6
            }
        ));

        assert_eq!(service.record(MemberRef::id_only("1")).await.unwrap().points, 5);
        assert_eq!(service.record(MemberRef::id_only("2")).await.unwrap().points, 7);
    }

    #[tokio::test]
    async fn compare_reports_signed_difference() {
        let service = make_service();
        seed(&service, "1", 40).await;
        seed(&service, "2", 15).await;

        let me = MemberRef::id_only("1");
        let other = MemberRef::id_only("2");
        assert_eq!(service.compare(me, other).await.unwrap(), Comparison::Ahead(25));
        assert_eq!(service.compare(other, me).await.unwrap(), Comparison::Behind(25));

        seed(&service, "2", 40).await;
        assert_eq!(service.compare(me, other).await.unwrap(), Comparison::Equal);
    }

    #[test]
    fn user_errors_are_distinguished_from_storage_errors() {
        assert!(PointsError::BotTarget.is_user_error());
        assert!(PointsError::InvalidAmount(0).is_user_error());
        assert!(!PointsError::StorageError("disk full".into()).is_user_error());
        assert!(PointsError::StorageError("disk full".into())
            .to_string()
            .contains("disk full"));
    }
}
