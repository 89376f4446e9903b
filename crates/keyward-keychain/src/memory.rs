//! In-process secure store.
//!
//! [`MemoryStore`] implements [`SecureStore`] with the same observable rules
//! as the platform keychain: per-class attribute legality, per-class
//! uniqueness, first-match reads shaped by the return flags, and
//! multi-item update/delete. It is what the crate's tests run against and the
//! fallback on platforms without a keychain.
//!
//! An item saved without a sync flag is stored as not synchronized, and a
//! request without one only sees non-synchronized items.
//!
//! Nothing is encrypted or persisted. Items are dropped with the store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::attributes::{AttrKey, AttrValue, AttributeSet};
use crate::kind::ItemKind;
use crate::query::Query;
use crate::status::Status;
use crate::store::SecureStore;

/// Default payload size limit: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// A non-persistent [`SecureStore`] held in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    /// Stored items, each a flat attribute set including class and payload.
    items: Mutex<Vec<AttributeSet>>,
    /// Payloads longer than this are rejected with `DATA_TOO_LARGE`.
    max_payload: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a store that rejects payloads longer than `max_payload` bytes.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            max_payload,
        }
    }

    /// Number of stored items across all kinds.
    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Insert a raw item, bypassing every check. Lets tests plant records
    /// the public contract would refuse, such as an item without a payload.
    #[doc(hidden)]
    pub fn insert_raw(&self, item: AttributeSet) {
        self.items().push(item);
    }

    fn items(&self) -> MutexGuard<'_, Vec<AttributeSet>> {
        // A panic while holding the lock cannot leave a half-written item:
        // every mutation is a single push, retain or slice assignment.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_payload(&self, query: &Query) -> Result<(), Status> {
        match query.payload() {
            Some(payload) if payload.len() > self.max_payload => Err(Status::DATA_TOO_LARGE),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching rules
// ---------------------------------------------------------------------------

fn kind_of(item: &AttributeSet) -> Option<ItemKind> {
    item.string(AttrKey::Class).and_then(ItemKind::from_native)
}

/// The class a request targets. Requests without a recognized class are
/// malformed.
fn requested_kind(query: &Query) -> Result<ItemKind, Status> {
    query.kind().ok_or(Status::PARAM)
}

/// Reject attributes that do not exist for `kind`.
fn check_legal(kind: ItemKind, query: &Query) -> Result<(), Status> {
    match query.iter().find(|(key, _)| !kind.accepts(*key)) {
        Some((key, _)) => {
            tracing::debug!(kind = %kind, attribute = %key, "attribute not valid for class");
            Err(Status::NO_SUCH_ATTRIBUTE)
        }
        None => Ok(()),
    }
}

/// The sync flag of an item or query. Absent means not synchronized.
fn synchronizable(attributes: &AttributeSet) -> bool {
    attributes
        .get(AttrKey::Synchronizable)
        .and_then(AttrValue::as_bool)
        .unwrap_or(false)
}

/// A query without a sync flag only sees non-synchronized items.
fn matches(item: &AttributeSet, kind: ItemKind, query: &Query) -> bool {
    kind_of(item) == Some(kind)
        && synchronizable(query.as_attributes()) == synchronizable(item)
        && query
            .match_attributes()
            .filter(|(key, _)| *key != AttrKey::Synchronizable)
            .all(|(key, value)| item.get(key) == Some(value))
}

fn same_identity(a: &AttributeSet, b: &AttributeSet) -> bool {
    match (kind_of(a), kind_of(b)) {
        (Some(ka), Some(kb)) if ka == kb => ka.primary_keys().iter().all(|key| match key {
            AttrKey::Synchronizable => synchronizable(a) == synchronizable(b),
            _ => a.get(*key) == b.get(*key),
        }),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// SecureStore
// ---------------------------------------------------------------------------

impl SecureStore for MemoryStore {
    fn add(&self, query: &Query) -> Result<(), Status> {
        let kind = requested_kind(query)?;
        check_legal(kind, query)?;
        self.check_payload(query)?;

        let mut item: AttributeSet = query
            .iter()
            .filter(|(key, _)| !matches!(key, AttrKey::ReturnData | AttrKey::ReturnAttributes))
            .map(|(key, value)| (key, value.clone()))
            .collect();

        let now = Utc::now();
        if !item.contains(AttrKey::CreationDate) {
            item.insert(AttrKey::CreationDate, now);
        }
        if !item.contains(AttrKey::ModificationDate) {
            item.insert(AttrKey::ModificationDate, now);
        }
        if !item.contains(AttrKey::Synchronizable) {
            item.insert(AttrKey::Synchronizable, false);
        }

        let mut items = self.items();
        if items.iter().any(|existing| same_identity(existing, &item)) {
            return Err(Status::DUPLICATE_ITEM);
        }
        items.push(item);

        tracing::debug!(kind = %kind, "memory store: item added");
        Ok(())
    }

    fn copy_matching(&self, query: &Query) -> Result<AttributeSet, Status> {
        let kind = requested_kind(query)?;
        check_legal(kind, query)?;

        let items = self.items();
        let item = items
            .iter()
            .find(|item| matches(item, kind, query))
            .ok_or(Status::ITEM_NOT_FOUND)?;

        let mut record = AttributeSet::new();
        if query.flag(AttrKey::ReturnAttributes) {
            record.extend(
                item.iter()
                    .filter(|(key, _)| *key != AttrKey::ValueData)
                    .map(|(key, value)| (key, value.clone())),
            );
        }
        if query.flag(AttrKey::ReturnData) {
            if let Some(payload) = item.get(AttrKey::ValueData) {
                record.insert(AttrKey::ValueData, payload.clone());
            }
        }
        Ok(record)
    }

    fn update(&self, query: &Query, changes: &Query) -> Result<(), Status> {
        let kind = requested_kind(query)?;
        check_legal(kind, query)?;
        if changes.kind().is_some_and(|changed| changed != kind) {
            return Err(Status::PARAM);
        }
        check_legal(kind, changes)?;
        self.check_payload(changes)?;

        let mut items = self.items();
        let matched: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches(item, kind, query))
            .map(|(index, _)| index)
            .collect();
        if matched.is_empty() {
            return Err(Status::ITEM_NOT_FOUND);
        }

        let now = Utc::now();
        let mut updated = items.clone();
        for &index in &matched {
            let item = &mut updated[index];
            item.extend(
                changes
                    .iter()
                    .filter(|(key, _)| !matches!(key, AttrKey::ReturnData | AttrKey::ReturnAttributes))
                    .map(|(key, value)| (key, value.clone())),
            );
            item.insert(AttrKey::ModificationDate, now);
        }

        for &index in &matched {
            let clash = updated
                .iter()
                .enumerate()
                .any(|(other, item)| other != index && same_identity(item, &updated[index]));
            if clash {
                return Err(Status::DUPLICATE_ITEM);
            }
        }

        *items = updated;
        tracing::debug!(kind = %kind, count = matched.len(), "memory store: items updated");
        Ok(())
    }

    fn delete(&self, query: &Query) -> Result<(), Status> {
        let kind = requested_kind(query)?;
        check_legal(kind, query)?;

        let mut items = self.items();
        let before = items.len();
        items.retain(|item| !matches(item, kind, query));
        let removed = before - items.len();
        if removed == 0 {
            return Err(Status::ITEM_NOT_FOUND);
        }

        tracing::debug!(kind = %kind, count = removed, "memory store: items deleted");
        Ok(())
    }
}
