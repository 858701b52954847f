//! Digest-list documents
//!
//! The plaintext of every signature is a canonical JSON document listing
//! the covered descriptors and their digests, ascending by id. Field order
//! and entry order are fixed so identical inputs serialize to identical
//! bytes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DigestList {
    #[serde(rename = "One")]
    pub(crate) one: DescriptorDigests,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DescriptorDigests {
    pub(crate) descriptors: Vec<DescriptorDigest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DescriptorDigest {
    #[serde(rename = "ID")]
    pub(crate) id: u32,
    #[serde(rename = "digestAlgorithm")]
    pub(crate) algorithm: String,
    pub(crate) digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_serialization() {
        let list = DigestList {
            one: DescriptorDigests {
                descriptors: vec![
                    DescriptorDigest {
                        id: 1,
                        algorithm: "sha256".to_string(),
                        digest: "aa".to_string(),
                    },
                    DescriptorDigest {
                        id: 2,
                        algorithm: "sha256".to_string(),
                        digest: "bb".to_string(),
                    },
                ],
            },
        };

        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(
            json,
            r#"{"One":{"descriptors":[{"ID":1,"digestAlgorithm":"sha256","digest":"aa"},{"ID":2,"digestAlgorithm":"sha256","digest":"bb"}]}}"#
        );

        let decoded: DigestList = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, list);
    }
}
