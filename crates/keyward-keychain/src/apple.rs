//! macOS Keychain Services backend.
//!
//! [`AppleKeychain`] implements [`SecureStore`] directly on top of the
//! `SecItem*` functions: each [`Query`] becomes a `CFDictionary` keyed by the
//! native attribute codes, and the status the Security framework returns is
//! passed back unchanged.

use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::date::CFDate;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use security_framework_sys::keychain_item::{
    SecItemAdd, SecItemCopyMatching, SecItemDelete, SecItemUpdate,
};

use chrono::{DateTime, Utc};

use crate::attributes::{AttrKey, AttrValue, AttributeSet};
use crate::query::Query;
use crate::status::Status;
use crate::store::SecureStore;

/// Seconds between the Unix epoch and the Core Foundation reference date
/// (2001-01-01T00:00:00Z).
const CF_EPOCH_OFFSET: f64 = 978_307_200.0;

/// The user's default keychain, reached through Keychain Services.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleKeychain;

impl AppleKeychain {
    pub fn new() -> Self {
        Self
    }
}

impl SecureStore for AppleKeychain {
    fn add(&self, query: &Query) -> Result<(), Status> {
        let attributes = to_dictionary(query);
        // SAFETY: `attributes` is a valid dictionary for the duration of the
        // call and a null result pointer is allowed.
        let status = unsafe { SecItemAdd(attributes.as_concrete_TypeRef(), std::ptr::null_mut()) };
        check("SecItemAdd", status)
    }

    fn copy_matching(&self, query: &Query) -> Result<AttributeSet, Status> {
        let dictionary = to_dictionary(query);
        let mut result: CFTypeRef = std::ptr::null();
        // SAFETY: `dictionary` outlives the call; on success `result` holds a
        // +1 reference we take ownership of below.
        let status = unsafe { SecItemCopyMatching(dictionary.as_concrete_TypeRef(), &mut result) };
        check("SecItemCopyMatching", status)?;

        if result.is_null() {
            return Ok(AttributeSet::new());
        }
        // SAFETY: copy functions follow the create rule.
        let result = unsafe { CFType::wrap_under_create_rule(result) };

        if let Some(data) = result.downcast::<CFData>() {
            return Ok(AttributeSet::new().with(AttrKey::ValueData, data.bytes().to_vec()));
        }
        if result.instance_of::<CFDictionary<CFString, CFType>>() {
            // SAFETY: type checked above; get rule because `result` keeps
            // its own reference.
            let record = unsafe {
                CFDictionary::<CFString, CFType>::wrap_under_get_rule(
                    result.as_CFTypeRef() as CFDictionaryRef,
                )
            };
            return Ok(from_dictionary(&record));
        }

        tracing::warn!("SecItemCopyMatching returned an unsupported result type");
        Ok(AttributeSet::new())
    }

    fn update(&self, query: &Query, changes: &Query) -> Result<(), Status> {
        let query = to_dictionary(query);
        let changes = to_dictionary(changes);
        // SAFETY: both dictionaries are valid for the duration of the call.
        let status =
            unsafe { SecItemUpdate(query.as_concrete_TypeRef(), changes.as_concrete_TypeRef()) };
        check("SecItemUpdate", status)
    }

    fn delete(&self, query: &Query) -> Result<(), Status> {
        let query = to_dictionary(query);
        // SAFETY: the dictionary is valid for the duration of the call.
        let status = unsafe { SecItemDelete(query.as_concrete_TypeRef()) };
        check("SecItemDelete", status)
    }
}

fn check(call: &'static str, code: i32) -> Result<(), Status> {
    let status = Status(code);
    if status.is_success() {
        return Ok(());
    }
    let message = security_framework::base::Error::from_code(code);
    tracing::debug!(call, status = code, %message, "keychain services call failed");
    Err(status)
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn to_dictionary(query: &Query) -> CFDictionary<CFString, CFType> {
    let pairs: Vec<(CFString, CFType)> = query
        .iter()
        .map(|(key, value)| (CFString::from_static_string(key.to_native()), to_cf(value)))
        .collect();
    CFDictionary::from_CFType_pairs(&pairs)
}

fn to_cf(value: &AttrValue) -> CFType {
    match value {
        AttrValue::String(s) => CFString::new(s).into_CFType(),
        AttrValue::Data(bytes) => CFData::from_buffer(bytes).into_CFType(),
        AttrValue::Bool(b) => CFBoolean::from(*b).into_CFType(),
        AttrValue::Date(date) => CFDate::new(to_absolute_time(date)).into_CFType(),
    }
}

/// Convert a returned attribute dictionary. Keys outside the vocabulary and
/// values of unsupported types are skipped.
fn from_dictionary(record: &CFDictionary<CFString, CFType>) -> AttributeSet {
    let (keys, values) = record.get_keys_and_values();
    keys.into_iter()
        .zip(values)
        .filter_map(|(key, value)| {
            // SAFETY: the dictionary was created with CFString keys and
            // CFType values and is alive for this whole loop.
            let key = unsafe { CFString::wrap_under_get_rule(key as CFStringRef) };
            let value = unsafe { CFType::wrap_under_get_rule(value as CFTypeRef) };
            let key = AttrKey::from_native(&key.to_string())?;
            from_cf(key, &value).map(|value| (key, value))
        })
        .collect()
}

fn from_cf(key: AttrKey, value: &CFType) -> Option<AttrValue> {
    if let Some(s) = value.downcast::<CFString>() {
        return Some(AttrValue::String(s.to_string()));
    }
    if let Some(data) = value.downcast::<CFData>() {
        return Some(AttrValue::Data(data.bytes().to_vec()));
    }
    if let Some(b) = value.downcast::<CFBoolean>() {
        return Some(AttrValue::Bool(b.into()));
    }
    if let Some(date) = value.downcast::<CFDate>() {
        return from_absolute_time(date.abs_time()).map(AttrValue::Date);
    }
    // The sync flag comes back as a number on some systems.
    if key == AttrKey::Synchronizable {
        if let Some(n) = value.downcast::<CFNumber>() {
            return n.to_i64().map(|n| AttrValue::Bool(n != 0));
        }
    }
    None
}

fn to_absolute_time(date: &DateTime<Utc>) -> f64 {
    date.timestamp() as f64 + f64::from(date.timestamp_subsec_nanos()) / 1e9 - CF_EPOCH_OFFSET
}

fn from_absolute_time(seconds: f64) -> Option<DateTime<Utc>> {
    let unix = seconds + CF_EPOCH_OFFSET;
    let secs = unix.floor();
    let nanos = ((unix - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}
