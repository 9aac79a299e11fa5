use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::Deserialize;

use crate::error_handling::types::PolicyError;

/// The fixed set of lifetimes a user can pick for a photo, plus the
/// `Custom` sentinel for an absolute instant chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpirySelection {
    OneHour,
    OneDay,
    OneWeek,
    Custom,
}

/// Map a duration selection to an absolute expiry instant.
///
/// For duration tokens the result is `now` plus the token's duration. For
/// `Custom` the supplied instant is passed through untouched: the policy
/// does not enforce that it lies in the future, that bound belongs to the
/// caller presenting the picker. A `Custom` selection without an instant
/// is a caller programming error and fails fast.
pub fn compute_expiry(
    selection: ExpirySelection,
    now: DateTime<Utc>,
    custom: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, PolicyError> {
    match selection {
        ExpirySelection::OneHour => Ok(now + Duration::hours(1)),
        ExpirySelection::OneDay => Ok(now + Duration::days(1)),
        ExpirySelection::OneWeek => Ok(now + Duration::weeks(1)),
        ExpirySelection::Custom => custom.ok_or_else(|| {
            PolicyError::InvalidSelection("custom expiry requires an explicit instant".into())
        }),
    }
}
