//! Digest primitives.
//!
//! Fixed-output SHA-2 digests rendered as lowercase hex, plus a salted,
//! iterated variant whose parameters travel with the result so it can be
//! verified later in constant time.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, 128-bit security class (default)
    #[default]
    Sha256,
    /// SHA-384, 192-bit security class
    Sha384,
    /// SHA-512, 256-bit security class
    Sha512,
}

impl HashAlgorithm {
    /// All algorithms, weakest first.
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded output.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }

    /// Hash raw bytes, returning the raw digest.
    pub fn hash_bytes(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Hash `data` with `algorithm`, returning lowercase hex.
pub fn digest(data: impl AsRef<[u8]>, algorithm: HashAlgorithm) -> String {
    hex::encode(algorithm.hash_bytes(data.as_ref()))
}

/// Hash `data` with an algorithm named at runtime.
///
/// The name is validated before any hashing happens.
pub fn digest_named(data: impl AsRef<[u8]>, algorithm: &str) -> Result<String> {
    let algorithm: HashAlgorithm = algorithm.parse()?;
    Ok(digest(data, algorithm))
}

/// Parameters for a salted, iterated digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestOptions {
    pub algorithm: HashAlgorithm,
    /// Number of hash applications, at least 1
    pub iterations: u32,
    pub salt: Option<String>,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            iterations: 1,
            salt: None,
        }
    }
}

impl DigestOptions {
    /// Options for a single unsalted pass with `algorithm`.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }
}

/// A digest together with everything needed to recompute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestResult {
    pub hash: String,
    pub algorithm: HashAlgorithm,
    pub iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// Hash `data` according to `options`.
///
/// The first pass hashes `salt || data`; every further pass hashes
/// `salt || previous_hex`.
pub fn hash_with(data: impl AsRef<[u8]>, options: &DigestOptions) -> DigestResult {
    let salt = options.salt.as_deref().unwrap_or("").as_bytes();
    let iterations = options.iterations.max(1);

    let mut input = Vec::with_capacity(salt.len() + data.as_ref().len());
    input.extend_from_slice(salt);
    input.extend_from_slice(data.as_ref());
    let mut hash = digest(&input, options.algorithm);

    for _ in 1..iterations {
        input.clear();
        input.extend_from_slice(salt);
        input.extend_from_slice(hash.as_bytes());
        hash = digest(&input, options.algorithm);
    }

    DigestResult {
        hash,
        algorithm: options.algorithm,
        iterations,
        salt: options.salt.clone(),
    }
}

/// Recompute `expected` over `data` and compare in constant time.
pub fn verify(data: impl AsRef<[u8]>, expected: &DigestResult) -> bool {
    let options = DigestOptions {
        algorithm: expected.algorithm,
        iterations: expected.iterations,
        salt: expected.salt.clone(),
    };
    let actual = hash_with(data, &options);
    constant_time_eq(actual.hash.as_bytes(), expected.hash.as_bytes())
}

/// Byte comparison whose running time does not depend on where inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
