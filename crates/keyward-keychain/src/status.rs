//! Native keychain status codes and their translation.
//!
//! Every call into the vault reports an `OSStatus`-style integer. Zero means
//! success; everything else is an error code. [`translate`] folds those codes
//! into the closed [`KeychainError`] taxonomy.

use serde::{Deserialize, Serialize};

use crate::error::KeychainError;

/// A raw status code reported by the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub i32);

impl Status {
    /// `errSecSuccess`.
    pub const SUCCESS: Status = Status(0);
    /// `errSecParam`: a parameter was missing or invalid.
    pub const PARAM: Status = Status(-50);
    /// `errSecAllocate`: the vault could not allocate memory.
    pub const ALLOCATE: Status = Status(-108);
    /// `errSecAuthFailed`: the user name or passphrase was not correct.
    pub const AUTH_FAILED: Status = Status(-25293);
    /// `errSecDuplicateItem`.
    pub const DUPLICATE_ITEM: Status = Status(-25299);
    /// `errSecItemNotFound`.
    pub const ITEM_NOT_FOUND: Status = Status(-25300);
    /// `errSecDataTooLarge`.
    pub const DATA_TOO_LARGE: Status = Status(-25302);
    /// `errSecNoSuchAttr`: the attribute does not exist for this item class.
    pub const NO_SUCH_ATTRIBUTE: Status = Status(-25303);
    /// `errSecInteractionNotAllowed`: the keychain is locked or UI is needed.
    pub const INTERACTION_NOT_ALLOWED: Status = Status(-25308);
    /// `errSecMissingEntitlement`.
    pub const MISSING_ENTITLEMENT: Status = Status(-34018);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// A short human-readable description for well-known codes.
    pub fn description(self) -> Option<&'static str> {
        let text = match self {
            Self::SUCCESS => "no error",
            Self::PARAM => "one or more parameters were not valid",
            Self::ALLOCATE => "failed to allocate memory",
            Self::AUTH_FAILED => "authorization or authentication failed",
            Self::DUPLICATE_ITEM => "the item already exists",
            Self::ITEM_NOT_FOUND => "the item could not be found",
            Self::DATA_TOO_LARGE => "the item data is too large",
            Self::NO_SUCH_ATTRIBUTE => "the attribute does not exist for this item class",
            Self::INTERACTION_NOT_ALLOWED => "user interaction is not allowed",
            Self::MISSING_ENTITLEMENT => "a required entitlement is missing",
            _ => return None,
        };
        Some(text)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{} ({text})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Map a non-success status to a [`KeychainError`].
///
/// Only three codes have dedicated variants; every other code is preserved
/// verbatim in [`KeychainError::Unexpected`].
pub fn translate(status: Status) -> KeychainError {
    match status {
        Status::ITEM_NOT_FOUND => KeychainError::ItemNotFound,
        Status::DATA_TOO_LARGE => KeychainError::InvalidData,
        Status::DUPLICATE_ITEM => KeychainError::DuplicateItem,
        other => KeychainError::Unexpected { status: other },
    }
}

impl From<Status> for KeychainError {
    fn from(status: Status) -> Self {
        translate(status)
    }
}
