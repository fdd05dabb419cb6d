//! Binary serialization helpers
//!
//! Every wire and storage structure goes through these two functions so the
//! whole crate agrees on one bincode configuration.

use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Encode `data` with the standard bincode configuration.
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("encoding failed: {e}")))
}

/// Decode a value previously produced by [`serialize`].
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("decoding failed: {e}")))?;
    Ok(data)
}
