use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

/// Encode a wire record into one frame.
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Decode one frame into a wire record.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(frame)?)
}

/// Serde adapter carrying payload bytes as a base64 string.
///
/// `null` and a missing field both decode as an empty payload.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Bytes::new()),
            Some(s) => STANDARD
                .decode(s.as_bytes())
                .map(Bytes::from)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::RpcError;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Blob {
        #[serde(with = "base64_bytes", default)]
        data: Bytes,
    }

    #[test]
    fn test_payload_is_base64() {
        // ---
        let frame = encode(&Blob {
            data: Bytes::from_static(b"ok"),
        })
        .unwrap();
        assert_eq!(&frame[..], br#"{"data":"b2s="}"#);
    }

    #[test]
    fn test_null_and_missing_payload_decode_empty() {
        // ---
        let a: Blob = decode(br#"{"data":null}"#).unwrap();
        let b: Blob = decode(b"{}").unwrap();
        assert!(a.data.is_empty());
        assert!(b.data.is_empty());
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        // ---
        let err = decode::<Blob>(b"not json").unwrap_err();
        assert!(matches!(err, RpcError::Serialization(_)));
    }
}
