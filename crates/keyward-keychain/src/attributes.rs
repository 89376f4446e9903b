//! Attribute vocabulary and attribute sets.
//!
//! The keychain addresses items through a fixed vocabulary of attribute
//! names, each with a short native code (`"acct"`, `"svce"`, ...). Callers
//! describe the item they want with an [`AttributeSet`]; this crate passes
//! those attributes through untouched except for the reserved keys it owns
//! itself (see [`AttrKey::is_reserved`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// An attribute name understood by the keychain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrKey {
    /// Item class. Reserved: always set from the requested [`ItemKind`](crate::ItemKind).
    Class,
    /// Secret payload bytes. Reserved: always set from the encoded value.
    ValueData,
    /// Read flag asking the vault to return the payload.
    ReturnData,
    /// Read flag asking the vault to return the item's attributes.
    ReturnAttributes,
    /// User-visible label.
    Label,
    /// Account name.
    Account,
    /// Service name (generic passwords).
    Service,
    /// Server host (internet passwords).
    Server,
    /// Resource path (internet passwords).
    Path,
    /// Item kind description.
    Description,
    /// Free-form comment.
    Comment,
    /// Application-defined opaque data (generic passwords).
    Generic,
    /// Keychain access group.
    AccessGroup,
    /// Whether the item syncs across the user's devices.
    Synchronizable,
    /// Application-private tag (keys).
    ApplicationTag,
    /// Application label, usually a public key hash (keys).
    ApplicationLabel,
    /// Set by the vault when the item is created.
    CreationDate,
    /// Set by the vault when the item is modified.
    ModificationDate,
}

impl AttrKey {
    /// The native key code.
    pub fn to_native(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::ValueData => "v_Data",
            Self::ReturnData => "r_Data",
            Self::ReturnAttributes => "r_Attributes",
            Self::Label => "labl",
            Self::Account => "acct",
            Self::Service => "svce",
            Self::Server => "srvr",
            Self::Path => "path",
            Self::Description => "desc",
            Self::Comment => "icmt",
            Self::Generic => "gena",
            Self::AccessGroup => "agrp",
            Self::Synchronizable => "sync",
            Self::ApplicationTag => "atag",
            Self::ApplicationLabel => "klbl",
            Self::CreationDate => "cdat",
            Self::ModificationDate => "mdat",
        }
    }

    /// Look up a key by its native code. Codes outside the vocabulary yield
    /// `None`.
    pub fn from_native(code: &str) -> Option<Self> {
        let key = match code {
            "class" => Self::Class,
            "v_Data" => Self::ValueData,
            "r_Data" => Self::ReturnData,
            "r_Attributes" => Self::ReturnAttributes,
            "labl" => Self::Label,
            "acct" => Self::Account,
            "svce" => Self::Service,
            "srvr" => Self::Server,
            "path" => Self::Path,
            "desc" => Self::Description,
            "icmt" => Self::Comment,
            "gena" => Self::Generic,
            "agrp" => Self::AccessGroup,
            "sync" => Self::Synchronizable,
            "atag" => Self::ApplicationTag,
            "klbl" => Self::ApplicationLabel,
            "cdat" => Self::CreationDate,
            "mdat" => Self::ModificationDate,
            _ => return None,
        };
        Some(key)
    }

    /// Keys the layer sets itself. Caller values for these never reach the
    /// vault.
    pub fn is_reserved(self) -> bool {
        matches!(self, Self::Class | Self::ValueData)
    }

    /// Keys that steer the request rather than describe the item.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Self::Class | Self::ValueData | Self::ReturnData | Self::ReturnAttributes
        )
    }
}

impl std::fmt::Display for AttrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_native())
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A scalar attribute value accepted by the keychain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    String(String),
    Data(Vec<u8>),
    Bool(bool),
    Date(DateTime<Utc>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Data(value)
    }
}

impl From<&[u8]> for AttrValue {
    fn from(value: &[u8]) -> Self {
        Self::Data(value.to_vec())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

// ---------------------------------------------------------------------------
// Attribute sets
// ---------------------------------------------------------------------------

/// An unordered set of attributes describing one keychain item.
///
/// Backed by a `BTreeMap` so iteration order (and therefore logging and
/// native dictionary construction) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet {
    entries: BTreeMap<AttrKey, AttrValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, returning the previous value for `key`.
    pub fn insert(&mut self, key: AttrKey, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.entries.insert(key, value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: AttrKey, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.with(AttrKey::Label, label.into())
    }

    pub fn with_account(self, account: impl Into<String>) -> Self {
        self.with(AttrKey::Account, account.into())
    }

    pub fn with_service(self, service: impl Into<String>) -> Self {
        self.with(AttrKey::Service, service.into())
    }

    pub fn with_server(self, server: impl Into<String>) -> Self {
        self.with(AttrKey::Server, server.into())
    }

    pub fn get(&self, key: AttrKey) -> Option<&AttrValue> {
        self.entries.get(&key)
    }

    pub fn remove(&mut self, key: AttrKey) -> Option<AttrValue> {
        self.entries.remove(&key)
    }

    pub fn contains(&self, key: AttrKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttrKey, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// The string value under `key`, if present and a string.
    pub fn string(&self, key: AttrKey) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_str)
    }
}

impl FromIterator<(AttrKey, AttrValue)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (AttrKey, AttrValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(AttrKey, AttrValue)> for AttributeSet {
    fn extend<I: IntoIterator<Item = (AttrKey, AttrValue)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for AttributeSet {
    type Item = (AttrKey, AttrValue);
    type IntoIter = std::collections::btree_map::IntoIter<AttrKey, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCABULARY: [AttrKey; 18] = [
        AttrKey::Class,
        AttrKey::ValueData,
        AttrKey::ReturnData,
        AttrKey::ReturnAttributes,
        AttrKey::Label,
        AttrKey::Account,
        AttrKey::Service,
        AttrKey::Server,
        AttrKey::Path,
        AttrKey::Description,
        AttrKey::Comment,
        AttrKey::Generic,
        AttrKey::AccessGroup,
        AttrKey::Synchronizable,
        AttrKey::ApplicationTag,
        AttrKey::ApplicationLabel,
        AttrKey::CreationDate,
        AttrKey::ModificationDate,
    ];

    #[test]
    fn native_codes_round_trip() {
        for key in VOCABULARY {
            assert_eq!(AttrKey::from_native(key.to_native()), Some(key));
        }
        assert_eq!(AttrKey::from_native("pdmn"), None);
    }

    #[test]
    fn only_class_and_value_data_are_reserved() {
        let reserved: Vec<_> = VOCABULARY.iter().filter(|k| k.is_reserved()).collect();
        assert_eq!(reserved, [&AttrKey::Class, &AttrKey::ValueData]);
        assert!(AttrKey::ReturnData.is_control());
        assert!(!AttrKey::ReturnData.is_reserved());
        assert!(!AttrKey::Label.is_control());
    }

    #[test]
    fn builder_and_accessors() {
        let attrs = AttributeSet::new()
            .with_label("ApiToken")
            .with_account("alice")
            .with(AttrKey::Synchronizable, false);

        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs.string(AttrKey::Label), Some("ApiToken"));
        assert_eq!(attrs.string(AttrKey::Account), Some("alice"));
        assert_eq!(attrs.get(AttrKey::Synchronizable).and_then(AttrValue::as_bool), Some(false));
        assert!(!attrs.contains(AttrKey::Service));
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut attrs = AttributeSet::new().with_label("old");
        let previous = attrs.insert(AttrKey::Label, "new");
        assert_eq!(previous, Some(AttrValue::String("old".into())));
        assert_eq!(attrs.string(AttrKey::Label), Some("new"));
    }

    #[test]
    fn value_accessors_reject_other_variants() {
        let data = AttrValue::from(vec![1u8, 2, 3]);
        assert_eq!(data.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(data.as_str(), None);
        assert_eq!(data.as_bool(), None);
        assert_eq!(data.as_date(), None);
    }

    #[test]
    fn serializes_as_plain_map() {
        let attrs = AttributeSet::new().with_label("x");
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json, serde_json::json!({ "label": { "string": "x" } }));
    }
}
