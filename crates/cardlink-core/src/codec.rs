//! JSON codec for envelope bodies
//!
//! Envelope bodies are JSON documents carried as strings inside the envelope
//! (double encoded). Decoding ignores unknown fields; absent optional fields
//! decode as `None`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Body encode/decode failures
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode {target}: {source}")]
    Encode {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {target}: {source}")]
    Decode {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize a body to the string form carried by an envelope
pub fn encode_body<T: Serialize>(body: &T) -> Result<String, CodecError> {
    serde_json::to_string(body).map_err(|source| CodecError::Encode {
        target: short_type_name::<T>(),
        source,
    })
}

/// Deserialize a body out of an envelope's string payload
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, CodecError> {
    serde_json::from_str(body).map_err(|source| CodecError::Decode {
        target: short_type_name::<T>(),
        source,
    })
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Byte sequences as hex strings
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim()).map_err(serde::de::Error::custom)
    }
}

/// Optional byte sequences as hex strings
pub(crate) mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&hex::encode_upper(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| hex::decode(s.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
