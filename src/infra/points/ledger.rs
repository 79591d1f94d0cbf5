// The in-memory shape of the points table, shared by every store.
//
// It serializes to the same document layout the bot has always written:
//
//   { "users": { "1": { "id": "...", "points": 12, "name": "..." }, ... } }
//
// Keys are document ids handed out in insertion order. Other top-level tables
// found in an existing file are kept and written back untouched.

use crate::core::points::{MemberRef, PointsError, UserRecord};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

const USERS_TABLE: &str = "users";

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// document id -> record
    users: BTreeMap<u64, UserRecord>,
    other_tables: Map<String, Value>,
    /// user id -> document id
    index: HashMap<String, u64>,
}

fn corrupt(e: serde_json::Error) -> PointsError {
    PointsError::StorageError(format!("corrupt points file: {e}"))
}

impl Ledger {
    /// Parse a document file's contents.
    pub fn from_json(raw: &str) -> Result<Self, PointsError> {
        let mut tables: Map<String, Value> = serde_json::from_str(raw).map_err(corrupt)?;
        let users = match tables.remove(USERS_TABLE) {
            Some(table) => serde_json::from_value(table).map_err(corrupt)?,
            None => BTreeMap::new(),
        };

        let mut ledger = Ledger {
            users,
            other_tables: tables,
            index: HashMap::new(),
        };
        ledger.reindex()?;
        Ok(ledger)
    }

    pub fn to_json(&self) -> Result<String, PointsError> {
        let to_storage_error = |e: serde_json::Error| PointsError::StorageError(e.to_string());
        let mut tables = self.other_tables.clone();
        tables.insert(
            USERS_TABLE.to_string(),
            serde_json::to_value(&self.users).map_err(to_storage_error)?,
        );
        serde_json::to_string_pretty(&tables).map_err(to_storage_error)
    }

    fn reindex(&mut self) -> Result<(), PointsError> {
        self.index.clear();
        for (doc_id, record) in &self.users {
            if self.index.insert(record.id.clone(), *doc_id).is_some() {
                return Err(PointsError::StorageError(format!(
                    "user {} appears more than once",
                    record.id
                )));
            }
        }
        Ok(())
    }

    fn next_doc_id(&self) -> u64 {
        self.users.keys().next_back().map_or(1, |last| last + 1)
    }

    /// The record for `member`, created with zero points if missing.
    /// Also reports whether anything was written.
    fn entry(&mut self, member: MemberRef<'_>) -> (&mut UserRecord, bool) {
        let existing = self.index.get(member.id).copied();
        let created = existing.is_none();
        let doc_id = existing.unwrap_or_else(|| self.next_doc_id());
        if created {
            self.index.insert(member.id.to_string(), doc_id);
        }

        let record = self
            .users
            .entry(doc_id)
            .or_insert_with(|| UserRecord::new(member.id, member.name));

        let mut changed = created;
        if let Some(name) = member.name {
            if record.name != name {
                record.name = name.to_string();
                changed = true;
            }
        }
        (record, changed)
    }

    pub fn get(&self, id: &str) -> Option<&UserRecord> {
        self.index.get(id).and_then(|doc_id| self.users.get(doc_id))
    }

    /// Returns the record and whether the ledger changed.
    pub fn get_or_create(&mut self, member: MemberRef<'_>) -> (UserRecord, bool) {
        let (record, changed) = self.entry(member);
        (record.clone(), changed)
    }

    pub fn add_points(&mut self, member: MemberRef<'_>, delta: u64) -> u64 {
        let (record, _) = self.entry(member);
        record.points = record.points.saturating_add(delta);
        record.points
    }

    pub fn set_points(&mut self, member: MemberRef<'_>, points: u64) {
        let (record, _) = self.entry(member);
        record.points = points;
    }

    pub fn transfer(
        &mut self,
        from: MemberRef<'_>,
        to: MemberRef<'_>,
        amount: u64,
    ) -> Result<(u64, u64), PointsError> {
        let available = self.get(from.id).map_or(0, |r| r.points);
        if available < amount {
            return Err(PointsError::InsufficientPoints {
                available,
                requested: amount,
            });
        }

        let sender_total = {
            let (sender, _) = self.entry(from);
            sender.points -= amount;
            sender.points
        };
        let (receiver, _) = self.entry(to);
        receiver.points = receiver.points.saturating_add(amount);
        Ok((sender_total, receiver.points))
    }

    /// Records in document order.
    pub fn records(&self) -> Vec<UserRecord> {
        self.users.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_refreshes_names_only_when_they_change() {
        let mut ledger = Ledger::default();

        let (record, changed) = ledger.get_or_create(MemberRef::new("42", "Kenji"));
        assert!(changed);
        assert_eq!(record.points, 0);
        assert_eq!(record.name, "Kenji");

        let (_, changed) = ledger.get_or_create(MemberRef::new("42", "Kenji"));
        assert!(!changed);

        let (record, changed) = ledger.get_or_create(MemberRef::new("42", "Kenji-san"));
        assert!(changed);
        assert_eq!(record.name, "Kenji-san");

        let (record, changed) = ledger.get_or_create(MemberRef::id_only("42"));
        assert!(!changed);
        assert_eq!(record.name, "Kenji-san");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn unnamed_members_get_a_placeholder_name() {
        let mut ledger = Ledger::default();
        let (record, _) = ledger.get_or_create(MemberRef::id_only("7"));
        assert_eq!(record.name, crate::core::points::UNKNOWN_NAME);
    }

    #[test]
    fn set_points_keeps_the_name_when_none_is_given() {
        let mut ledger = Ledger::default();
        ledger.get_or_create(MemberRef::new("1", "Aiko"));
        ledger.set_points(MemberRef::id_only("1"), 30);

        let record = ledger.get("1").unwrap();
        assert_eq!(record.points, 30);
        assert_eq!(record.name, "Aiko");
    }

    #[test]
    fn transfer_without_funds_creates_nothing() {
        let mut ledger = Ledger::default();
        let err = ledger
            .transfer(MemberRef::id_only("1"), MemberRef::id_only("2"), 1)
            .unwrap_err();
        assert!(matches!(err, PointsError::InsufficientPoints { available: 0, .. }));
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn reads_the_legacy_document_layout() {
        let raw = r#"{
            "_default": {},
            "users": {
                "1": {"id": "111", "points": 12, "name": "Aiko"},
                "2": {"id": "222", "points": 540, "name": "Ren"}
            }
        }"#;

        let mut ledger = Ledger::from_json(raw).unwrap();
        assert_eq!(ledger.get("222").unwrap().points, 540);

        ledger.add_points(MemberRef::new("333", "Sora"), 1);
        let written: serde_json::Value = serde_json::from_str(&ledger.to_json().unwrap()).unwrap();
        assert_eq!(written["users"]["3"]["id"], "333");
        assert!(written.get("_default").is_some());
    }

    #[test]
    fn duplicate_ids_in_a_file_are_rejected() {
        let raw = r#"{"users": {
            "1": {"id": "111", "points": 1, "name": "a"},
            "2": {"id": "111", "points": 2, "name": "b"}
        }}"#;
        assert!(Ledger::from_json(raw).is_err());
    }
}
