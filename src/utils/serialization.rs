// JSON helpers shared by hashing and snapshots
use crate::error::{BlockchainError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Compact JSON with keys in struct declaration order
pub fn to_canonical_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Indented JSON for documents meant to be read by people
pub fn to_pretty_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        id: u64,
        name: String,
        values: Vec<i32>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = TestData {
            id: 42,
            name: "test".to_string(),
            values: vec![1, 2, 3],
        };

        let json = to_canonical_json(&original).expect("Serialization should work");
        assert_eq!(json, r#"{"id":42,"name":"test","values":[1,2,3]}"#);

        let back: TestData = from_json(&json).expect("Deserialization should work");
        assert_eq!(original, back);
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let result: Result<TestData> = from_json("{not json");
        assert!(matches!(result, Err(BlockchainError::Serialization(_))));
    }
}
