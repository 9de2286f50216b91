//! Binary serialization for language tables using postcard.

use super::json::{LanguageData, LanguageError};

impl LanguageData {
    /// Deserialize tables from the compact binary format.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, LanguageError> {
        postcard::from_bytes(bytes).map_err(LanguageError::Binary)
    }

    /// Serialize tables to the compact binary format.
    pub fn to_binary(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("serialization should not fail")
    }
}
