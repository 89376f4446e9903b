//! The vault contract.
//!
//! The secure store itself (encryption, persistence, access control) lives
//! outside this crate. [`SecureStore`] is the narrow request/response surface
//! the rest of the crate talks to, mirroring the four native item calls:
//!
//! - **create**: [`SecureStore::add`]
//! - **read**: [`SecureStore::copy_matching`]
//! - **update**: [`SecureStore::update`]
//! - **delete**: [`SecureStore::delete`]
//!
//! Failures come back as raw [`Status`] codes; translating them is the
//! caller's job.

use std::sync::Arc;

use crate::attributes::AttributeSet;
use crate::query::Query;
use crate::status::Status;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A platform secure store addressed by attribute queries.
///
/// Implementations must be `Send + Sync`; each call must be safe to make
/// concurrently with any other.
pub trait SecureStore: Send + Sync {
    /// Create an item from `query`, which carries the class, the descriptive
    /// attributes and the payload.
    fn add(&self, query: &Query) -> Result<(), Status>;

    /// Find the first item matching `query`.
    ///
    /// The returned record contains the item's attributes when the query
    /// sets the return-attributes flag, and its payload under
    /// [`AttrKey::ValueData`](crate::AttrKey::ValueData) when it sets the
    /// return-data flag.
    fn copy_matching(&self, query: &Query) -> Result<AttributeSet, Status>;

    /// Apply `changes` to every item matching `query`.
    fn update(&self, query: &Query, changes: &Query) -> Result<(), Status>;

    /// Delete every item matching `query`.
    fn delete(&self, query: &Query) -> Result<(), Status>;
}

impl<S: SecureStore + ?Sized> SecureStore for &S {
    fn add(&self, query: &Query) -> Result<(), Status> {
        (**self).add(query)
    }

    fn copy_matching(&self, query: &Query) -> Result<AttributeSet, Status> {
        (**self).copy_matching(query)
    }

    fn update(&self, query: &Query, changes: &Query) -> Result<(), Status> {
        (**self).update(query, changes)
    }

    fn delete(&self, query: &Query) -> Result<(), Status> {
        (**self).delete(query)
    }
}

impl<S: SecureStore + ?Sized> SecureStore for Box<S> {
    fn add(&self, query: &Query) -> Result<(), Status> {
        (**self).add(query)
    }

    fn copy_matching(&self, query: &Query) -> Result<AttributeSet, Status> {
        (**self).copy_matching(query)
    }

    fn update(&self, query: &Query, changes: &Query) -> Result<(), Status> {
        (**self).update(query, changes)
    }

    fn delete(&self, query: &Query) -> Result<(), Status> {
        (**self).delete(query)
    }
}

impl<S: SecureStore + ?Sized> SecureStore for Arc<S> {
    fn add(&self, query: &Query) -> Result<(), Status> {
        (**self).add(query)
    }

    fn copy_matching(&self, query: &Query) -> Result<AttributeSet, Status> {
        (**self).copy_matching(query)
    }

    fn update(&self, query: &Query, changes: &Query) -> Result<(), Status> {
        (**self).update(query, changes)
    }

    fn delete(&self, query: &Query) -> Result<(), Status> {
        (**self).delete(query)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Returns the best available secure store for the current platform.
///
/// - **macOS**: [`AppleKeychain`](crate::apple::AppleKeychain) (Keychain
///   Services)
/// - **Other platforms**: [`MemoryStore`](crate::memory::MemoryStore). Items
///   live only as long as the process.
pub fn platform_store() -> Box<dyn SecureStore> {
    #[cfg(target_os = "macos")]
    {
        tracing::info!("using macOS Keychain Services as secure store");
        Box::new(crate::apple::AppleKeychain::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        tracing::warn!("no platform keychain available, items will not outlive the process");
        Box::new(crate::memory::MemoryStore::new())
    }
}
