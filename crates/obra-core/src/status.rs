use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

/// The four states a planning task can be
/// in once its free-form status has been
/// classified. Declaration order is the
/// Kanban column order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
  Pending,
  InProgress,
  Completed,
  Cancelled
}

impl CanonicalStatus {
  pub const ALL: [CanonicalStatus; 4] = [
    CanonicalStatus::Pending,
    CanonicalStatus::InProgress,
    CanonicalStatus::Completed,
    CanonicalStatus::Cancelled
  ];

  #[must_use]
  pub fn as_wire(self) -> &'static str {
    match self {
      | CanonicalStatus::Pending => {
        "PENDING"
      }
      | CanonicalStatus::InProgress => {
        "IN_PROGRESS"
      }
      | CanonicalStatus::Completed => {
        "COMPLETED"
      }
      | CanonicalStatus::Cancelled => {
        "CANCELLED"
      }
    }
  }

  #[must_use]
  pub fn label(self) -> &'static str {
    match self {
      | CanonicalStatus::Pending => {
        "Pending"
      }
      | CanonicalStatus::InProgress => {
        "In Progress"
      }
      | CanonicalStatus::Completed => {
        "Completed"
      }
      | CanonicalStatus::Cancelled => {
        "Cancelled"
      }
    }
  }
}

impl fmt::Display for CanonicalStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_wire())
  }
}

impl FromStr for CanonicalStatus {
  type Err = std::convert::Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Ok(normalize(Some(s)))
  }
}

// Checked in order; the first hit wins.
const FRAGMENTS: [(
  &str,
  CanonicalStatus
); 3] = [
  ("progress", CanonicalStatus::InProgress),
  ("complet", CanonicalStatus::Completed),
  ("cancel", CanonicalStatus::Cancelled)
];

/// Classifies a raw status string.
///
/// Matching is a case-insensitive
/// substring search, so `"in-progress"`,
/// `"Completado"` and `"CANCELLED"` all
/// resolve. Absent, empty and
/// unrecognised values fall back to
/// [`CanonicalStatus::Pending`].
#[must_use]
pub fn normalize(
  raw: Option<&str>
) -> CanonicalStatus {
  raw
    .and_then(recognize)
    .unwrap_or(CanonicalStatus::Pending)
}

/// Like [`normalize`], but returns `None`
/// when the text names no status at all
/// instead of falling back. Anything
/// containing `"pend"` counts as an
/// explicit Pending.
#[must_use]
pub fn recognize(
  raw: &str
) -> Option<CanonicalStatus> {
  let lowered = raw.to_lowercase();
  FRAGMENTS
    .iter()
    .find(|(fragment, _)| {
      lowered.contains(fragment)
    })
    .map(|(_, status)| *status)
    .or_else(|| {
      lowered
        .contains("pend")
        .then_some(
          CanonicalStatus::Pending
        )
    })
}
