//! Achievement workflow states and the legal transition table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of an achievement reference.
///
/// `verified`, `rejected` and `deleted` are terminal for the forward
/// workflow; `deleted` is reachable only from `draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    Draft,
    Submitted,
    Verified,
    Rejected,
    Deleted,
}

impl AchievementStatus {
    /// Stable wire/database form
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::Draft => "draft",
            AchievementStatus::Submitted => "submitted",
            AchievementStatus::Verified => "verified",
            AchievementStatus::Rejected => "rejected",
            AchievementStatus::Deleted => "deleted",
        }
    }

    /// Whether the forward workflow permits `self -> to`.
    ///
    /// Allowed: draft->submitted, draft->deleted, submitted->verified,
    /// submitted->rejected. Everything else conflicts.
    pub fn can_transition(&self, to: AchievementStatus) -> bool {
        use AchievementStatus::*;

        matches!(
            (self, to),
            (Draft, Submitted) | (Draft, Deleted) | (Submitted, Verified) | (Submitted, Rejected)
        )
    }

}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AchievementStatus::Draft),
            "submitted" => Ok(AchievementStatus::Submitted),
            "verified" => Ok(AchievementStatus::Verified),
            "rejected" => Ok(AchievementStatus::Rejected),
            "deleted" => Ok(AchievementStatus::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A status string in the store that the state machine does not know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown achievement status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

#[cfg(test)]
mod tests {
    use super::*;
    use AchievementStatus::*;

    const ALL: [AchievementStatus; 5] = [Draft, Submitted, Verified, Rejected, Deleted];

    #[test]
    fn test_allowed_transitions() {
        assert!(Draft.can_transition(Submitted));
        assert!(Draft.can_transition(Deleted));
        assert!(Submitted.can_transition(Verified));
        assert!(Submitted.can_transition(Rejected));
    }

    #[test]
    fn test_everything_else_conflicts() {
        let allowed = [
            (Draft, Submitted),
            (Draft, Deleted),
            (Submitted, Verified),
            (Submitted, Rejected),
        ];

        for from in ALL {
            for to in ALL {
                let expect = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition(to),
                    expect,
                    "{from} -> {to} should be {expect}"
                );
            }
        }
    }

    #[test]
    fn test_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<AchievementStatus>(), Ok(status));
        }
        assert!("archived".parse::<AchievementStatus>().is_err());
    }
}
