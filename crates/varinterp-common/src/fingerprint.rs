//! Content-derived identifiers for curated knowledge-base rows.
//!
//! The fingerprint is the idempotency key of the importer: a row is inserted
//! at most once per fingerprint. The hashed field set and its order are part
//! of the stored data; changing either re-keys every existing entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalise::canonicalize_category;

/// Opaque 128-bit fingerprint (first 16 bytes of a SHA-256 digest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub const LEN: usize = 16;

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex form, 32 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The fields of one curated row that make up its fingerprint.
///
/// Tumor and tissue labels are canonicalised before hashing, so `"lung"` and
/// `"Lung "` fingerprint identically.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintFields<'a> {
    pub gene: &'a str,
    pub tumor_type: &'a str,
    pub tissue_type: &'a str,
    pub variant: &'a str,
    /// Tier as its decimal string.
    pub tier: &'a str,
    pub interpretation: &'a str,
    pub citation: &'a str,
    pub source_row: u32,
}

impl FingerprintFields<'_> {
    /// Hash the concatenated fields (no delimiter) in their fixed order.
    pub fn fingerprint(&self) -> Fingerprint {
        let tumor_type = canonicalize_category(self.tumor_type);
        let tissue_type = canonicalize_category(self.tissue_type);
        let source_row = self.source_row.to_string();

        let mut hasher = Sha256::new();
        for field in [
            self.gene,
            tumor_type.as_str(),
            tissue_type.as_str(),
            self.variant,
            self.tier,
            self.interpretation,
            self.citation,
            source_row.as_str(),
        ] {
            hasher.update(field.as_bytes());
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..Fingerprint::LEN]);
        Fingerprint(bytes)
    }
}
