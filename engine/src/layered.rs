//! Multi-round layered hash.
//!
//! Seven rounds cycle through SHA-256, SHA-384 and SHA-512. Each round
//! derives its own salt, iterates its algorithm a geometrically growing
//! number of times and folds the output back into the running value. A final
//! SHA-512 pass produces the visible result.
//!
//! This is NOT a password hashing function and has no proven security
//! reduction. It only makes brute forcing a fingerprint more expensive through
//! repeated mixing. Use a vetted KDF (argon2, scrypt) for credentials.

use crate::digest::{digest, HashAlgorithm};

/// Number of rounds in the construction.
pub const LAYERED_ROUNDS: u32 = 7;

/// Chars of the running value mixed into each round salt.
const SALT_PREFIX_LEN: usize = 16;

/// Iterations applied in `round` for a given base count.
///
/// `floor(base_rounds * 1.5^round)`, never less than one.
pub fn round_iterations(base_rounds: u32, round: u32) -> u64 {
    let scaled = f64::from(base_rounds) * 1.5f64.powi(round as i32);
    (scaled.floor() as u64).max(1)
}

/// Compute the layered hash of `data`.
pub fn layered_hash(data: impl AsRef<[u8]>, salt: &str, base_rounds: u32) -> String {
    let mut current = digest(data, HashAlgorithm::Sha256);

    for round in 0..LAYERED_ROUNDS {
        let algorithm = HashAlgorithm::ALL[(round as usize) % HashAlgorithm::ALL.len()];

        let prefix = &current[..SALT_PREFIX_LEN.min(current.len())];
        let round_salt = digest(
            format!("{salt}{round}{prefix}"),
            HashAlgorithm::Sha256,
        );

        let mut value = current.clone();
        for _ in 0..round_iterations(base_rounds, round) {
            value = digest(format!("{round_salt}{value}"), algorithm);
        }

        current = digest(format!("{current}{value}"), HashAlgorithm::Sha256);
    }

    digest(current, HashAlgorithm::Sha512)
}
