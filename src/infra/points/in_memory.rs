// In-memory implementation of PointsStore.
//
// Nothing is persisted, which makes it the store of choice for tests. It
// shares the `Ledger` table with the JSON store, so both behave identically
// apart from the file on disk.

use super::ledger::Ledger;
use crate::core::points::{MemberRef, PointsError, PointsStore, UserRecord};
use async_trait::async_trait;
use tokio::sync::RwLock;

pub struct InMemoryPointsStore {
    ledger: RwLock<Ledger>,
}

impl InMemoryPointsStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(Ledger::default()),
        }
    }
}

impl Default for InMemoryPointsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PointsStore for InMemoryPointsStore {
    async fn get_or_create(&self, member: MemberRef<'_>) -> Result<UserRecord, PointsError> {
        let (record, _) = self.ledger.write().await.get_or_create(member);
        Ok(record)
    }

    async fn add_points(&self, member: MemberRef<'_>, delta: u64) -> Result<u64, PointsError> {
        Ok(self.ledger.write().await.add_points(member, delta))
    }

    async fn set_points(&self, member: MemberRef<'_>, points: u64) -> Result<(), PointsError> {
        self.ledger.write().await.set_points(member, points);
        Ok(())
    }

    async fn transfer_points(
        &self,
        from: MemberRef<'_>,
        to: MemberRef<'_>,
        amount: u64,
    ) -> Result<(u64, u64), PointsError> {
        self.ledger.write().await.transfer(from, to, amount)
    }

    async fn all_records(&self) -> Result<Vec<UserRecord>, PointsError> {
        Ok(self.ledger.read().await.records())
    }
}
