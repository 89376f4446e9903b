//! Keychain error types.
//!
//! Every public operation in this crate fails with a [`KeychainError`]. The
//! taxonomy is closed: vault status codes are folded into it by
//! [`status::translate`](crate::status::translate), and codec failures keep
//! the underlying `serde_json` error as their source.

use crate::status::Status;

/// Unified error type for keychain operations.
#[derive(Debug, thiserror::Error)]
pub enum KeychainError {
    // -- Vault errors -------------------------------------------------------
    /// No item matched the query.
    #[error("keychain item not found")]
    ItemNotFound,

    /// An item with the same identifying attributes already exists.
    #[error("keychain item already exists")]
    DuplicateItem,

    /// The payload was too large for the vault, or the vault returned an
    /// item whose payload is missing or not a byte string.
    #[error("keychain item data is invalid")]
    InvalidData,

    /// An attribute is not valid for the requested item class.
    ///
    /// Not produced by [`status::translate`](crate::status::translate); the
    /// vault reports such requests as [`Status::NO_SUCH_ATTRIBUTE`], which
    /// surfaces as [`KeychainError::Unexpected`].
    #[error("attribute is not valid for this item class")]
    IncorrectAttributeForClass,

    // -- Codec errors -------------------------------------------------------
    /// The stored payload could not be decoded into the requested type.
    #[error("failed to decode keychain payload: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The value could not be encoded into a payload.
    #[error("failed to encode keychain payload: {0}")]
    Serialization(#[source] serde_json::Error),

    // -- Generic ------------------------------------------------------------
    /// Any other non-success status reported by the vault.
    #[error("unexpected keychain status {status}")]
    Unexpected { status: Status },
}

impl KeychainError {
    /// The raw vault status behind this error, if it came from the vault.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::ItemNotFound => Some(Status::ITEM_NOT_FOUND),
            Self::DuplicateItem => Some(Status::DUPLICATE_ITEM),
            Self::Unexpected { status } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeychainError>;
