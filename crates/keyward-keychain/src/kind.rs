//! Item kinds.
//!
//! Every keychain item belongs to exactly one native class. [`ItemKind`] is
//! the closed set of classes this crate can address, with a lossless mapping
//! to and from the four-character class codes the keychain uses on the wire.

use serde::{Deserialize, Serialize};

use crate::attributes::AttrKey;

/// The class of a keychain item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Application secret with no network semantics (tokens, API keys).
    GenericPassword,
    /// Secret bound to a network endpoint (server, path).
    InternetPassword,
    /// X.509 certificate.
    Certificate,
    /// Cryptographic key.
    Key,
    /// Certificate paired with its private key.
    Identity,
}

impl ItemKind {
    /// Every variant, in declaration order.
    pub const ALL: [ItemKind; 5] = [
        Self::GenericPassword,
        Self::InternetPassword,
        Self::Certificate,
        Self::Key,
        Self::Identity,
    ];

    /// The native class code sent under the `class` key.
    pub fn to_native(self) -> &'static str {
        match self {
            Self::GenericPassword => "genp",
            Self::InternetPassword => "inet",
            Self::Certificate => "cert",
            Self::Key => "keys",
            Self::Identity => "idnt",
        }
    }

    /// Classify a native class code. Unknown codes yield `None`.
    pub fn from_native(code: &str) -> Option<Self> {
        match code {
            "genp" => Some(Self::GenericPassword),
            "inet" => Some(Self::InternetPassword),
            "cert" => Some(Self::Certificate),
            "keys" => Some(Self::Key),
            "idnt" => Some(Self::Identity),
            _ => None,
        }
    }

    /// Attributes that together identify an item of this kind.
    ///
    /// Two items of the same kind whose primary-key attributes are all equal
    /// (absent counts as equal to absent) are duplicates.
    pub fn primary_keys(self) -> &'static [AttrKey] {
        match self {
            Self::GenericPassword => &[
                AttrKey::Account,
                AttrKey::Service,
                AttrKey::AccessGroup,
                AttrKey::Synchronizable,
            ],
            Self::InternetPassword => &[
                AttrKey::Account,
                AttrKey::Server,
                AttrKey::Path,
                AttrKey::AccessGroup,
                AttrKey::Synchronizable,
            ],
            Self::Key => &[
                AttrKey::ApplicationLabel,
                AttrKey::ApplicationTag,
                AttrKey::AccessGroup,
                AttrKey::Synchronizable,
            ],
            Self::Certificate | Self::Identity => &[
                AttrKey::Label,
                AttrKey::AccessGroup,
                AttrKey::Synchronizable,
            ],
        }
    }

    /// Whether `key` is a legal attribute for items of this kind.
    ///
    /// Control keys (class, value data, return flags) and the attributes
    /// shared by every class are always accepted.
    pub fn accepts(self, key: AttrKey) -> bool {
        match key {
            AttrKey::Service | AttrKey::Generic => self == Self::GenericPassword,
            AttrKey::Server | AttrKey::Path => self == Self::InternetPassword,
            AttrKey::Account => {
                matches!(self, Self::GenericPassword | Self::InternetPassword)
            }
            AttrKey::ApplicationTag | AttrKey::ApplicationLabel => {
                matches!(self, Self::Key | Self::Identity)
            }
            _ => true,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenericPassword => write!(f, "generic_password"),
            Self::InternetPassword => write!(f, "internet_password"),
            Self::Certificate => write!(f, "certificate"),
            Self::Key => write!(f, "key"),
            Self::Identity => write!(f, "identity"),
        }
    }
}
