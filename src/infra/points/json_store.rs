use super::ledger::Ledger;
use crate::core::points::{MemberRef, PointsError, PointsStore, UserRecord};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON-backed points store. The whole ledger lives in one document file and
/// is rewritten after every change.
///
/// The write lock is held until the file is in place, and the in-memory
/// ledger only changes once the write succeeded, so each operation is atomic
/// both in memory and on disk.
pub struct JsonPointsStore {
    path: PathBuf,
    ledger: RwLock<Ledger>,
}

impl JsonPointsStore {
    /// Open (or start) the ledger at `path`. An unreadable or corrupt file is
    /// an error rather than a silently empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PointsError> {
        let path = path.into();
        let ledger = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| PointsError::StorageError(e.to_string()))?;
            if raw.trim().is_empty() {
                Ledger::default()
            } else {
                Ledger::from_json(&raw)?
            }
        } else {
            Ledger::default()
        };

        tracing::info!(
            "Loaded {} point record(s) from {}",
            ledger.len(),
            path.display()
        );

        Ok(Self {
            path,
            ledger: RwLock::new(ledger),
        })
    }

    /// Write the ledger next to the database file, then move it into place,
    /// so a crash mid-write never leaves a truncated database behind.
    fn persist(&self, ledger: &Ledger) -> Result<(), PointsError> {
        let to_storage_error = |e: std::io::Error| PointsError::StorageError(e.to_string());
        let json = ledger.to_json()?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        std::fs::write(&staging, json).map_err(to_storage_error)?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(to_storage_error(e));
        }
        Ok(())
    }

    /// Apply `change` to a copy of the ledger and keep the copy only once it
    /// is safely on disk. The closure returns its result and whether anything
    /// needs writing.
    async fn commit<T, F>(&self, change: F) -> Result<T, PointsError>
    where
        F: FnOnce(&mut Ledger) -> Result<(T, bool), PointsError>,
    {
        let mut ledger = self.ledger.write().await;
        let mut draft = ledger.clone();
        let (result, changed) = change(&mut draft)?;
        if changed {
            self.persist(&draft)?;
            *ledger = draft;
        }
        Ok(result)
    }
}

#[async_trait]
impl PointsStore for JsonPointsStore {
    async fn get_or_create(&self, member: MemberRef<'_>) -> Result<UserRecord, PointsError> {
        self.commit(|ledger| Ok(ledger.get_or_create(member))).await
    }

    async fn add_points(&self, member: MemberRef<'_>, delta: u64) -> Result<u64, PointsError> {
        self.commit(|ledger| Ok((ledger.add_points(member, delta), true))).await
    }

    async fn set_points(&self, member: MemberRef<'_>, points: u64) -> Result<(), PointsError> {
        self.commit(|ledger| {
            ledger.set_points(member, points);
            Ok(((), true))
        })
        .await
    }

    async fn transfer_points(
        &self,
        from: MemberRef<'_>,
        to: MemberRef<'_>,
        amount: u64,
    ) -> Result<(u64, u64), PointsError> {
        self.commit(|ledger| Ok((ledger.transfer(from, to, amount)?, true)))
            .await
    }

    async fn all_records(&self) -> Result<Vec<UserRecord>, PointsError> {
        Ok(self.ledger.read().await.records())
    }
}
