//! Conflict detection and resolution policy.
//!
//! Two versions of a record conflict when their fingerprints differ. The
//! policy picks a side uniformly for a whole sync call:
//!
//! - [`ConflictPolicy::Local`] keeps local data and schedules a push
//! - [`ConflictPolicy::Remote`] adopts remote data
//! - [`ConflictPolicy::Latest`] compares `updatedAt`; local wins ties
//! - [`ConflictPolicy::Manual`] applies nothing and reports the conflict

use crate::{Error, Payload, RecordId, StateRecord, StoreId, Timestamp, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy applied to every conflict in a sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Local,
    Remote,
    /// Later `updatedAt` wins, local on ties (default)
    #[default]
    Latest,
    Manual,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictPolicy::Local => "local",
            ConflictPolicy::Remote => "remote",
            ConflictPolicy::Latest => "latest",
            ConflictPolicy::Manual => "manual",
        };
        f.write_str(name)
    }
}

impl FromStr for ConflictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(ConflictPolicy::Local),
            "remote" => Ok(ConflictPolicy::Remote),
            "latest" => Ok(ConflictPolicy::Latest),
            "manual" => Ok(ConflictPolicy::Manual),
            other => Err(Error::InvalidPayload(format!(
                "unknown conflict policy: {other}"
            ))),
        }
    }
}

/// Which side won a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Local,
    Remote,
}

/// One side of a conflict, captured before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSide {
    pub data: Payload,
    pub fingerprint: String,
    pub version: Version,
    pub updated_at: Timestamp,
}

impl From<&StateRecord> for ConflictSide {
    fn from(record: &StateRecord) -> Self {
        Self {
            data: record.data.clone(),
            fingerprint: record.fingerprint.clone(),
            version: record.version,
            updated_at: record.updated_at,
        }
    }
}

/// A disagreement between the local store and one remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConflict {
    pub record_id: RecordId,
    /// Remote store that reported the diverging version
    pub store: StoreId,
    pub local: ConflictSide,
    pub remote: ConflictSide,
    /// None while awaiting manual intervention
    pub resolution: Option<Resolution>,
}

impl StateConflict {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// Decide a conflict between `local` and `remote` under `policy`.
///
/// Returns `None` only for [`ConflictPolicy::Manual`].
pub fn resolve(
    policy: ConflictPolicy,
    local: &StateRecord,
    remote: &StateRecord,
) -> Option<Resolution> {
    match policy {
        ConflictPolicy::Local => Some(Resolution::Local),
        ConflictPolicy::Remote => Some(Resolution::Remote),
        ConflictPolicy::Latest => {
            if local.updated_at >= remote.updated_at {
                Some(Resolution::Local)
            } else {
                Some(Resolution::Remote)
            }
        }
        ConflictPolicy::Manual => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(data: serde_json::Value, updated: i64) -> StateRecord {
        let mut record = StateRecord::new(
            "rec-1",
            "deployment",
            data.as_object().cloned().unwrap(),
            Utc.timestamp_opt(0, 0).unwrap(),
        );
        record.updated_at = Utc.timestamp_opt(updated, 0).unwrap();
        record
    }

    #[test]
    fn fixed_policies() {
        let local = record(json!({"v": "a"}), 10);
        let remote = record(json!({"v": "b"}), 20);

        assert_eq!(
            resolve(ConflictPolicy::Local, &local, &remote),
            Some(Resolution::Local)
        );
        assert_eq!(
            resolve(ConflictPolicy::Remote, &local, &remote),
            Some(Resolution::Remote)
        );
        assert_eq!(resolve(ConflictPolicy::Manual, &local, &remote), None);
    }

    #[test]
    fn latest_prefers_newer() {
        let older = record(json!({"v": "a"}), 10);
        let newer = record(json!({"v": "b"}), 20);

        assert_eq!(
            resolve(ConflictPolicy::Latest, &newer, &older),
            Some(Resolution::Local)
        );
        assert_eq!(
            resolve(ConflictPolicy::Latest, &older, &newer),
            Some(Resolution::Remote)
        );
    }

    #[test]
    fn latest_tie_keeps_local() {
        let local = record(json!({"v": "a"}), 10);
        let remote = record(json!({"v": "b"}), 10);
        assert_eq!(
            resolve(ConflictPolicy::Latest, &local, &remote),
            Some(Resolution::Local)
        );
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("REMOTE".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Remote);
        assert_eq!("manual".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Manual);
        assert!("newest".parse::<ConflictPolicy>().is_err());
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Latest);
        assert_eq!(ConflictPolicy::Latest.to_string(), "latest");
    }

    #[test]
    fn unresolved_conflict_serializes_null_resolution() {
        let local = record(json!({"v": "a"}), 10);
        let remote = record(json!({"v": "b"}), 10);
        let conflict = StateConflict {
            record_id: local.id.clone(),
            store: "crm".into(),
            local: ConflictSide::from(&local),
            remote: ConflictSide::from(&remote),
            resolution: None,
        };

        assert!(!conflict.is_resolved());
        let json = serde_json::to_value(&conflict).unwrap();
        assert!(json["resolution"].is_null());
        assert_eq!(json["recordId"], "rec-1");
        assert_eq!(json["remote"]["data"], json!({"v": "b"}));
    }
}
