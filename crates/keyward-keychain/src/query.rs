//! Attribute query construction.
//!
//! A [`Query`] is the flat attribute dictionary handed to the vault for one
//! call. It is always built in the same order: the item class first, then the
//! caller's attributes, then whatever the operation itself needs (payload or
//! return flags). Later writes win, so the layer's own values for the
//! reserved keys can never be overridden by the caller.

use crate::attributes::{AttrKey, AttrValue, AttributeSet};
use crate::kind::ItemKind;

/// The attribute dictionary for a single vault request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: AttributeSet,
}

/// Build the addressing query for `kind` and the caller's `attributes`.
///
/// Caller values under [`AttrKey::Class`] and [`AttrKey::ValueData`] are
/// dropped; every other attribute is copied verbatim. No attempt is made to
/// check whether an attribute is legal for `kind`; the vault reports that.
pub fn build(kind: ItemKind, attributes: Option<&AttributeSet>) -> Query {
    let mut entries = AttributeSet::new().with(AttrKey::Class, kind.to_native());

    if let Some(attributes) = attributes {
        entries.extend(
            attributes
                .iter()
                .filter(|(key, _)| !key.is_reserved())
                .map(|(key, value)| (key, value.clone())),
        );
    }

    Query { entries }
}

impl Query {
    /// The attributes-to-update dictionary for an update call: only the new
    /// payload, no class and no addressing attributes.
    pub fn payload_update(payload: Vec<u8>) -> Self {
        Self::default().with_payload(payload)
    }

    /// Attach the payload to store.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.entries.insert(AttrKey::ValueData, payload);
        self
    }

    /// Ask the vault to return both the item's attributes and its payload.
    pub fn returning_item(mut self) -> Self {
        self.entries.insert(AttrKey::ReturnAttributes, true);
        self.entries.insert(AttrKey::ReturnData, true);
        self
    }

    /// The item kind this query targets, if its class code is recognized.
    pub fn kind(&self) -> Option<ItemKind> {
        self.entries
            .string(AttrKey::Class)
            .and_then(ItemKind::from_native)
    }

    /// The payload bytes, if this query carries one.
    pub fn payload(&self) -> Option<&[u8]> {
        self.entries.get(AttrKey::ValueData).and_then(AttrValue::as_bytes)
    }

    /// Whether the return flag under `key` is set.
    pub fn flag(&self, key: AttrKey) -> bool {
        self.entries
            .get(key)
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    pub fn get(&self, key: AttrKey) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    /// Descriptive attributes only: everything except class, payload and
    /// return flags. These are what a vault matches stored items against.
    pub fn match_attributes(&self) -> impl Iterator<Item = (AttrKey, &AttrValue)> {
        self.entries.iter().filter(|(key, _)| !key.is_control())
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttrKey, &AttrValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_attributes(&self) -> &AttributeSet {
        &self.entries
    }
}
