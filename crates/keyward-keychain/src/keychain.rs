//! Typed keychain operations.
//!
//! [`Keychain`] is the entry point of the crate. It turns a typed request
//! (a value, an [`ItemKind`] and an [`AttributeSet`]) into one native call on
//! its [`SecureStore`] and the store's answer back into a typed result:
//!
//! - [`save`](Keychain::save) encodes the value and creates a new item.
//! - [`retrieve`](Keychain::retrieve) reads the first matching item and
//!   decodes its payload.
//! - [`update`](Keychain::update) replaces the payload of matching items.
//! - [`delete`](Keychain::delete) removes matching items.
//!
//! Each call is a self-contained request cycle. The keychain keeps no state
//! between calls beyond its configuration, does not cache, and never retries.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::attributes::{AttrKey, AttrValue, AttributeSet};
use crate::codec;
use crate::config::KeychainConfig;
use crate::error::{KeychainError, Result};
use crate::kind::ItemKind;
use crate::query::{self, Query};
use crate::status::{self, Status};
use crate::store::SecureStore;

/// A decoded item together with the attributes the vault reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem<T> {
    /// The decoded payload.
    pub value: T,
    /// The item's attributes, without the payload.
    pub attributes: AttributeSet,
}

/// Typed access to a [`SecureStore`].
///
/// # Example
///
/// ```rust
/// use keyward_keychain::{AttributeSet, ItemKind, Keychain, MemoryStore};
///
/// # fn example() -> keyward_keychain::Result<()> {
/// let keychain = Keychain::new(MemoryStore::new());
/// let attrs = AttributeSet::new().with_label("ApiToken");
///
/// keychain.save("tok-123", ItemKind::GenericPassword, Some(&attrs))?;
/// let token: String = keychain.retrieve(ItemKind::GenericPassword, Some(&attrs))?;
/// assert_eq!(token, "tok-123");
///
/// keychain.delete(ItemKind::GenericPassword, &attrs)?;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Keychain<S> {
    store: S,
    config: KeychainConfig,
}

impl<S: SecureStore> Keychain<S> {
    /// Wrap `store` with an empty configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, KeychainConfig::default())
    }

    /// Wrap `store`, applying `config`'s default attributes to every request.
    pub fn with_config(store: S, config: KeychainConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &KeychainConfig {
        &self.config
    }

    /// Consume the keychain and return its store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// The addressing query for `kind` and `attributes`, with the
    /// configured defaults underneath the caller's attributes.
    fn address(&self, kind: ItemKind, attributes: Option<&AttributeSet>) -> Query {
        let scoped = self.config.scope(kind, attributes);
        query::build(kind, Some(&scoped))
    }

    // -- Operations ---------------------------------------------------------

    /// Store `value` as a new item of `kind` described by `attributes`.
    ///
    /// # Errors
    ///
    /// - [`KeychainError::Serialization`] if `value` cannot be encoded.
    /// - [`KeychainError::DuplicateItem`] if an item with the same identity
    ///   already exists.
    /// - [`KeychainError::InvalidData`] if the vault rejects the payload size.
    pub fn save<T: Serialize + ?Sized>(
        &self,
        value: &T,
        kind: ItemKind,
        attributes: Option<&AttributeSet>,
    ) -> Result<()> {
        let payload = codec::encode(value)?;
        let query = self.address(kind, attributes).with_payload(payload);

        tracing::debug!(kind = %kind, attributes = query.len(), "submitting keychain add");
        self.store.add(&query).map_err(|status| failed("save", kind, status))?;

        tracing::info!(kind = %kind, "saved keychain item");
        Ok(())
    }

    /// Read the first item of `kind` matching `attributes` and decode its
    /// payload as `T`.
    ///
    /// # Errors
    ///
    /// - [`KeychainError::ItemNotFound`] if nothing matches.
    /// - [`KeychainError::InvalidData`] if the item has no payload or the
    ///   payload is not a byte string.
    /// - [`KeychainError::Deserialization`] if the payload is not a `T`.
    pub fn retrieve<T: DeserializeOwned>(
        &self,
        kind: ItemKind,
        attributes: Option<&AttributeSet>,
    ) -> Result<T> {
        self.retrieve_item(kind, attributes).map(|item| item.value)
    }

    /// Like [`retrieve`](Self::retrieve), but also returns the attributes the
    /// vault reported for the item.
    pub fn retrieve_item<T: DeserializeOwned>(
        &self,
        kind: ItemKind,
        attributes: Option<&AttributeSet>,
    ) -> Result<StoredItem<T>> {
        let query = self.address(kind, attributes).returning_item();

        tracing::debug!(kind = %kind, attributes = query.len(), "submitting keychain read");
        let mut record = self
            .store
            .copy_matching(&query)
            .map_err(|status| failed("retrieve", kind, status))?;

        let payload = match record.remove(AttrKey::ValueData) {
            Some(AttrValue::Data(bytes)) => bytes,
            Some(_) => {
                tracing::warn!(kind = %kind, "keychain returned a non-data payload");
                return Err(KeychainError::InvalidData);
            }
            None => {
                tracing::warn!(kind = %kind, "keychain returned an item without payload");
                return Err(KeychainError::InvalidData);
            }
        };

        let value = codec::decode(&payload)?;
        Ok(StoredItem {
            value,
            attributes: record,
        })
    }

    /// Replace the payload of the items of `kind` matching `attributes` with
    /// `value`. Only the payload changes; the identifying attributes do not.
    ///
    /// # Errors
    ///
    /// - [`KeychainError::Serialization`] if `value` cannot be encoded.
    /// - [`KeychainError::ItemNotFound`] if nothing matches.
    pub fn update<T: Serialize + ?Sized>(
        &self,
        value: &T,
        kind: ItemKind,
        attributes: Option<&AttributeSet>,
    ) -> Result<()> {
        let query = self.address(kind, attributes);
        let changes = Query::payload_update(codec::encode(value)?);

        tracing::debug!(kind = %kind, attributes = query.len(), "submitting keychain update");
        self.store
            .update(&query, &changes)
            .map_err(|status| failed("update", kind, status))?;

        tracing::info!(kind = %kind, "updated keychain item");
        Ok(())
    }

    /// Delete the items of `kind` matching `attributes`.
    ///
    /// The attributes are the only thing narrowing the match; an empty set
    /// deletes every item of `kind` the vault lets this process see.
    ///
    /// # Errors
    ///
    /// [`KeychainError::ItemNotFound`] if nothing matches.
    pub fn delete(&self, kind: ItemKind, attributes: &AttributeSet) -> Result<()> {
        let query = self.address(kind, Some(attributes));

        tracing::debug!(kind = %kind, attributes = query.len(), "submitting keychain delete");
        self.store
            .delete(&query)
            .map_err(|status| failed("delete", kind, status))?;

        tracing::info!(kind = %kind, "deleted keychain item");
        Ok(())
    }
}

/// Translate a failed vault call, logging codes without a dedicated variant.
fn failed(operation: &'static str, kind: ItemKind, status: Status) -> KeychainError {
    let error = status::translate(status);
    if matches!(error, KeychainError::Unexpected { .. }) {
        tracing::warn!(operation, kind = %kind, status = %status, "keychain call failed");
    } else {
        tracing::debug!(operation, kind = %kind, status = %status, "keychain call failed");
    }
    error
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::memory::MemoryStore;

    /// A store that records every request and answers from a script.
    #[derive(Default)]
    struct RecordingStore {
        requests: Mutex<Vec<(&'static str, Query, Option<Query>)>>,
        read_result: Mutex<Option<std::result::Result<AttributeSet, Status>>>,
        status: Option<Status>,
    }

    impl RecordingStore {
        fn failing(status: Status) -> Self {
            Self {
                status: Some(status),
                ..Self::default()
            }
        }

        fn answering(record: AttributeSet) -> Self {
            let store = Self::default();
            *store.read_result.lock().unwrap() = Some(Ok(record));
            store
        }

        fn outcome(&self) -> std::result::Result<(), Status> {
            self.status.map_or(Ok(()), Err)
        }

        fn last(&self) -> (&'static str, Query, Option<Query>) {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl SecureStore for RecordingStore {
        fn add(&self, query: &Query) -> std::result::Result<(), Status> {
            self.requests.lock().unwrap().push(("add", query.clone(), None));
            self.outcome()
        }

        fn copy_matching(&self, query: &Query) -> std::result::Result<AttributeSet, Status> {
            self.requests.lock().unwrap().push(("copy_matching", query.clone(), None));
            self.outcome()?;
            self.read_result
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Err(Status::ITEM_NOT_FOUND))
        }

        fn update(&self, query: &Query, changes: &Query) -> std::result::Result<(), Status> {
            self.requests
                .lock()
                .unwrap()
                .push(("update", query.clone(), Some(changes.clone())));
            self.outcome()
        }

        fn delete(&self, query: &Query) -> std::result::Result<(), Status> {
            self.requests.lock().unwrap().push(("delete", query.clone(), None));
            self.outcome()
        }
    }

    fn label(text: &str) -> AttributeSet {
        AttributeSet::new().with_label(text)
    }

    #[test]
    fn save_sends_class_attributes_and_encoded_payload() {
        let keychain = Keychain::new(RecordingStore::default());
        keychain
            .save("tok-123", ItemKind::GenericPassword, Some(&label("ApiToken")))
            .unwrap();

        let (call, query, _) = keychain.store().last();
        assert_eq!(call, "add");
        assert_eq!(query.kind(), Some(ItemKind::GenericPassword));
        assert_eq!(query.get(AttrKey::Label), Some(&AttrValue::from("ApiToken")));
        assert_eq!(query.payload(), Some(&br#""tok-123""#[..]));
        assert!(!query.flag(AttrKey::ReturnData));
    }

    #[test]
    fn save_ignores_caller_payload() {
        let keychain = Keychain::new(RecordingStore::default());
        let attrs = label("ApiToken").with(AttrKey::ValueData, b"forged".to_vec());
        keychain.save(&42u32, ItemKind::GenericPassword, Some(&attrs)).unwrap();

        let (_, query, _) = keychain.store().last();
        assert_eq!(query.payload(), Some(&b"42"[..]));
    }

    #[test]
    fn save_rejects_unencodable_value_before_calling_store() {
        let keychain = Keychain::new(RecordingStore::default());
        let err = keychain.save(&f64::NAN, ItemKind::GenericPassword, None).unwrap_err();
        assert!(matches!(err, KeychainError::Serialization(_)));
        assert!(keychain.store().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn retrieve_sets_return_flags() {
        let record = AttributeSet::new().with(AttrKey::ValueData, br#""v""#.to_vec());
        let keychain = Keychain::new(RecordingStore::answering(record));
        let value: String = keychain.retrieve(ItemKind::Key, None).unwrap();
        assert_eq!(value, "v");

        let (call, query, _) = keychain.store().last();
        assert_eq!(call, "copy_matching");
        assert!(query.flag(AttrKey::ReturnAttributes));
        assert!(query.flag(AttrKey::ReturnData));
        assert_eq!(query.payload(), None);
    }

    #[test]
    fn retrieve_without_payload_is_invalid_data() {
        let record = label("no-payload");
        let keychain = Keychain::new(RecordingStore::answering(record));
        let err = keychain.retrieve::<String>(ItemKind::GenericPassword, None).unwrap_err();
        assert!(matches!(err, KeychainError::InvalidData));
    }

    #[test]
    fn retrieve_with_non_data_payload_is_invalid_data() {
        let record = AttributeSet::new().with(AttrKey::ValueData, "not bytes");
        let keychain = Keychain::new(RecordingStore::answering(record));
        let err = keychain.retrieve::<String>(ItemKind::GenericPassword, None).unwrap_err();
        assert!(matches!(err, KeychainError::InvalidData));
    }

    #[test]
    fn retrieve_with_wrong_shape_is_deserialization_error() {
        let record = AttributeSet::new().with(AttrKey::ValueData, b"[1,2]".to_vec());
        let keychain = Keychain::new(RecordingStore::answering(record));
        let err = keychain.retrieve::<String>(ItemKind::GenericPassword, None).unwrap_err();
        assert!(matches!(err, KeychainError::Deserialization(_)));
    }

    #[test]
    fn update_sends_identity_query_and_payload_only_changes() {
        let keychain = Keychain::new(RecordingStore::default());
        keychain
            .update("new", ItemKind::InternetPassword, Some(&label("site")))
            .unwrap();

        let (call, query, changes) = keychain.store().last();
        assert_eq!(call, "update");
        assert_eq!(query.kind(), Some(ItemKind::InternetPassword));
        assert_eq!(query.payload(), None);
        assert_eq!(query.get(AttrKey::Label), Some(&AttrValue::from("site")));

        let changes = changes.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.payload(), Some(&br#""new""#[..]));
    }

    #[test]
    fn delete_sends_class_and_attributes() {
        let keychain = Keychain::new(RecordingStore::default());
        keychain.delete(ItemKind::Certificate, &label("root")).unwrap();

        let (call, query, _) = keychain.store().last();
        assert_eq!(call, "delete");
        assert_eq!(query.len(), 2);
        assert_eq!(query.kind(), Some(ItemKind::Certificate));
    }

    #[test]
    fn vault_status_is_translated() {
        let cases = [
            (Status::ITEM_NOT_FOUND, "ItemNotFound"),
            (Status::DUPLICATE_ITEM, "DuplicateItem"),
            (Status::DATA_TOO_LARGE, "InvalidData"),
            (Status::INTERACTION_NOT_ALLOWED, "Unexpected"),
        ];
        for (status, expected) in cases {
            let keychain = Keychain::new(RecordingStore::failing(status));
            let errors = [
                keychain.save("x", ItemKind::GenericPassword, None).unwrap_err(),
                keychain
                    .retrieve::<String>(ItemKind::GenericPassword, None)
                    .unwrap_err(),
                keychain.update("x", ItemKind::GenericPassword, None).unwrap_err(),
                keychain
                    .delete(ItemKind::GenericPassword, &AttributeSet::new())
                    .unwrap_err(),
            ];
            for err in errors {
                let name = format!("{err:?}");
                assert!(name.starts_with(expected), "{status}: got {name}");
            }
        }
    }

    #[test]
    fn config_defaults_sit_under_caller_attributes() {
        let config = KeychainConfig::new()
            .with_service("com.example.default")
            .with_access_group("TEAMID.group");
        let keychain = Keychain::with_config(RecordingStore::default(), config);

        let attrs = AttributeSet::new().with_service("com.example.explicit");
        keychain.save("v", ItemKind::GenericPassword, Some(&attrs)).unwrap();
        let (_, query, _) = keychain.store().last();
        assert_eq!(query.as_attributes().string(AttrKey::Service), Some("com.example.explicit"));
        assert_eq!(query.as_attributes().string(AttrKey::AccessGroup), Some("TEAMID.group"));

        keychain.save("v", ItemKind::Certificate, None).unwrap();
        let (_, query, _) = keychain.store().last();
        assert!(query.get(AttrKey::Service).is_none());
    }

    #[test]
    fn retrieve_item_returns_attributes_without_payload() {
        let keychain = Keychain::new(MemoryStore::new());
        let attrs = AttributeSet::new().with_account("alice").with_label("Work");
        keychain.save(&vec![1u8, 2, 3], ItemKind::GenericPassword, Some(&attrs)).unwrap();

        let item: StoredItem<Vec<u8>> = keychain
            .retrieve_item(ItemKind::GenericPassword, Some(&AttributeSet::new().with_account("alice")))
            .unwrap();
        assert_eq!(item.value, vec![1, 2, 3]);
        assert_eq!(item.attributes.string(AttrKey::Label), Some("Work"));
        assert!(!item.attributes.contains(AttrKey::ValueData));
    }
}
