//! Payload codec.
//!
//! Values are stored in the keychain as canonical JSON produced by
//! `serde_json`. The caller names the target type when decoding, and the
//! codec either produces exactly that type or fails.
//!
//! `serde_json` writes non-finite floats as `null`, which would make the
//! payload decode back into something other than what was saved. [`encode`]
//! walks the value first and rejects NaN and infinities.

use serde::de::DeserializeOwned;
use serde::ser::{self, Error as _, Serialize};

use crate::error::{KeychainError, Result};

/// Encode `value` into a payload.
///
/// # Errors
///
/// Returns [`KeychainError::Serialization`] if the value contains a
/// non-finite float, a map key JSON cannot represent, or if its `Serialize`
/// implementation fails.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    value
        .serialize(FiniteFloats)
        .map_err(KeychainError::Serialization)?;
    serde_json::to_vec(value).map_err(KeychainError::Serialization)
}

/// Decode a payload into `T`.
///
/// # Errors
///
/// Returns [`KeychainError::Deserialization`] if `bytes` is empty, truncated,
/// has trailing data, or does not have the shape of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(KeychainError::Deserialization)
}

// ---------------------------------------------------------------------------
// Non-finite float check
// ---------------------------------------------------------------------------

/// A serializer that produces nothing and fails on the first non-finite
/// float it sees.
struct FiniteFloats;

type Checked = std::result::Result<(), serde_json::Error>;

fn check_finite(finite: bool) -> Checked {
    if finite {
        Ok(())
    } else {
        Err(serde_json::Error::custom(
            "non-finite floating point values cannot be encoded",
        ))
    }
}

/// Leaf values that cannot hold a float.
macro_rules! accept {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(fn $method(self, _v: $ty) -> Checked {
            Ok(())
        })*
    };
}

/// Compound serializers check every element they are handed.
macro_rules! compound {
    ($($serializer:ident => $method:ident),* $(,)?) => {
        $(impl ser::$serializer for FiniteFloats {
            type Ok = ();
            type Error = serde_json::Error;

            fn $method<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
                value.serialize(FiniteFloats)
            }

            fn end(self) -> Checked {
                Ok(())
            }
        })*
    };
    ($($serializer:ident => $method:ident(key)),* $(,)?) => {
        $(impl ser::$serializer for FiniteFloats {
            type Ok = ();
            type Error = serde_json::Error;

            fn $method<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Checked {
                value.serialize(FiniteFloats)
            }

            fn end(self) -> Checked {
                Ok(())
            }
        })*
    };
}

type Compound = std::result::Result<FiniteFloats, serde_json::Error>;

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_f32(self, v: f32) -> Checked {
        check_finite(v.is_finite())
    }

    fn serialize_f64(self, v: f64) -> Checked {
        check_finite(v.is_finite())
    }

    fn serialize_none(self) -> Checked {
        Ok(())
    }

    fn serialize_unit(self) -> Checked {
        Ok(())
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, _variant: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Compound {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Compound {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Compound {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Compound {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Compound {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Compound {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Compound {
        Ok(self)
    }
}

compound! {
    SerializeSeq => serialize_element,
    SerializeTuple => serialize_element,
    SerializeTupleStruct => serialize_field,
    SerializeTupleVariant => serialize_field,
}

compound! {
    SerializeStruct => serialize_field(key),
    SerializeStructVariant => serialize_field(key),
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(FiniteFloats)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(FiniteFloats)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OAuthToken {
        access_token: String,
        refresh_token: Option<String>,
        expires_in: u64,
        scopes: Vec<String>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        value: f64,
    }

    #[test]
    fn string_encodes_as_json_string() {
        assert_eq!(encode("tok-123").unwrap(), br#""tok-123""#.to_vec());
        let back: String = decode(br#""tok-123""#).unwrap();
        assert_eq!(back, "tok-123");
    }

    #[test]
    fn struct_round_trip() {
        let token = OAuthToken {
            access_token: "gho_abc".into(),
            refresh_token: None,
            expires_in: 3600,
            scopes: vec!["repo".into(), "user".into()],
        };
        let bytes = encode(&token).unwrap();
        let back: OAuthToken = decode(&bytes).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn nan_is_rejected() {
        let err = encode(&Reading { value: f64::NAN }).unwrap_err();
        assert!(matches!(err, KeychainError::Serialization(_)));
    }

    #[test]
    fn nested_infinity_is_rejected() {
        let mut map = BTreeMap::new();
        map.insert("inner", vec![1.0f32, f32::INFINITY]);
        assert!(matches!(
            encode(&Some(map)),
            Err(KeychainError::Serialization(_))
        ));
    }

    #[test]
    fn infinity_inside_enum_variants_is_rejected() {
        #[derive(Serialize)]
        enum Sample {
            Pair(u8, f64),
            Point { x: f64 },
        }

        assert!(encode(&Sample::Pair(1, f64::NEG_INFINITY)).is_err());
        assert!(encode(&Sample::Point { x: f64::NAN }).is_err());
        assert!(encode(&(Sample::Point { x: 0.5 }, Sample::Pair(2, -1.0))).is_ok());
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");
        assert!(matches!(encode(&map), Err(KeychainError::Serialization(_))));
    }

    #[test]
    fn empty_payload_fails_to_decode() {
        assert!(matches!(
            decode::<String>(b""),
            Err(KeychainError::Deserialization(_))
        ));
    }

    #[test]
    fn truncated_payload_fails_to_decode() {
        let bytes = encode(&vec![1u32, 2, 3]).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            decode::<Vec<u32>>(truncated),
            Err(KeychainError::Deserialization(_))
        ));
    }

    #[test]
    fn shape_mismatch_is_not_coerced() {
        let bytes = encode("42").unwrap();
        assert!(matches!(
            decode::<u32>(&bytes),
            Err(KeychainError::Deserialization(_))
        ));

        let bytes = encode(&42u32).unwrap();
        assert!(matches!(
            decode::<String>(&bytes),
            Err(KeychainError::Deserialization(_))
        ));
    }

    #[test]
    fn missing_struct_field_fails() {
        assert!(matches!(
            decode::<OAuthToken>(br#"{"access_token":"x"}"#),
            Err(KeychainError::Deserialization(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn token_round_trip(
            access_token in ".*",
            refresh_token in proptest::option::of(".*"),
            expires_in in any::<u64>(),
            scopes in prop::collection::vec("[a-z:]{1,12}", 0..8),
        ) {
            let token = OAuthToken { access_token, refresh_token, expires_in, scopes };
            let bytes = encode(&token).unwrap();
            let back: OAuthToken = decode(&bytes).unwrap();
            prop_assert_eq!(back, token);
        }

        #[test]
        fn finite_floats_round_trip(value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let bytes = encode(&Reading { value }).unwrap();
            let back: Reading = decode(&bytes).unwrap();
            prop_assert_eq!(back, Reading { value });
        }

        #[test]
        fn bytes_round_trip(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let bytes = encode(&data).unwrap();
            let back: Vec<u8> = decode(&bytes).unwrap();
            prop_assert_eq!(back, data);
        }
    }
}
