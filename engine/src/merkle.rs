//! Merkle aggregation of fingerprints.
//!
//! Adjacent hashes are paired and hashed level by level until a single root
//! remains. An odd level duplicates its last element. The root depends on
//! input order.

use crate::digest::{digest, HashAlgorithm};

/// Sentinel hashed to form the root of an empty list.
pub const EMPTY_SENTINEL: &str = "empty";

/// Root of an empty hash list.
pub fn empty_root() -> String {
    digest(EMPTY_SENTINEL, HashAlgorithm::Sha256)
}

/// Compute the Merkle root of `hashes`.
///
/// A single hash is returned unchanged.
pub fn merkle_root<S: AsRef<str>>(hashes: &[S]) -> String {
    match hashes {
        [] => empty_root(),
        [only] => only.as_ref().to_string(),
        _ => {
            let mut level: Vec<String> = hashes.iter().map(|h| h.as_ref().to_string()).collect();
            while level.len() > 1 {
                level = next_level(&level);
            }
            level.swap_remove(0)
        }
    }
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_pair(left, right)
        })
        .collect()
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut joined = String::with_capacity(left.len() + right.len());
    joined.push_str(left);
    joined.push_str(right);
    digest(joined, HashAlgorithm::Sha256)
}
