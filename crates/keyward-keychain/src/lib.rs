//! Typed access to the platform keychain.
//!
//! The keychain itself (encryption, persistence, access control) is provided
//! by the operating system. This crate is the layer in front of it: it
//! serializes typed values into payloads, addresses items through attribute
//! queries, classifies them into a closed set of item kinds, and folds the
//! keychain's status codes into a small error taxonomy.
//!
//! # Modules
//!
//! - [`keychain`]: the typed `save` / `retrieve` / `update` / `delete` façade.
//! - [`query`]: merges an item kind and caller attributes into one request.
//! - [`codec`]: JSON encoding and decoding of payloads.
//! - [`kind`]: the closed set of item classes.
//! - [`attributes`]: attribute vocabulary, values and sets.
//! - [`status`]: native status codes and their translation.
//! - [`store`]: the [`SecureStore`] contract and platform selection.
//! - [`memory`]: an in-process [`SecureStore`].
//! - `apple`: Keychain Services backend (macOS only).
//! - [`config`]: default attributes applied to every request.
//! - [`error`]: unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use keyward_keychain::{AttributeSet, ItemKind, Keychain, KeychainConfig, platform_store};
//!
//! # fn example() -> keyward_keychain::Result<()> {
//! let config = KeychainConfig::new().with_service("com.example.app");
//! let keychain = Keychain::with_config(platform_store(), config);
//!
//! let attrs = AttributeSet::new().with_account("alice");
//! keychain.save("sk-live-...", ItemKind::GenericPassword, Some(&attrs))?;
//!
//! let token: String = keychain.retrieve(ItemKind::GenericPassword, Some(&attrs))?;
//! keychain.update("sk-live-rotated", ItemKind::GenericPassword, Some(&attrs))?;
//! keychain.delete(ItemKind::GenericPassword, &attrs)?;
//! # let _ = token;
//! # Ok(())
//! # }
//! ```

#[cfg(target_os = "macos")]
pub mod apple;
pub mod attributes;
pub mod codec;
pub mod config;
pub mod error;
pub mod keychain;
pub mod kind;
pub mod memory;
pub mod query;
pub mod status;
pub mod store;

// Re-export the most commonly used types at the crate root for convenience.
#[cfg(target_os = "macos")]
pub use apple::AppleKeychain;
pub use attributes::{AttrKey, AttrValue, AttributeSet};
pub use config::{ConfigError, KeychainConfig};
pub use error::{KeychainError, Result};
pub use keychain::{Keychain, StoredItem};
pub use kind::ItemKind;
pub use memory::MemoryStore;
pub use query::Query;
pub use status::Status;
pub use store::{SecureStore, platform_store};
