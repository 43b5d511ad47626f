//! Changelog-to-timeline reconstruction.
//!
//! Turns an issue's raw changelog into an ordered list of
//! [`TimelineRecord`]s, each carrying how long the issue sat in that state.
//!
//! # Algorithm Summary
//!
//! 1. An empty changelog yields an empty timeline (no synthetic record).
//! 2. Parse every event timestamp once; each failure is a warning.
//! 3. Emit the synthetic `created` record. With a known creation time its
//!    hold runs to the first entry that produces records.
//! 4. For each event with a valid timestamp, emit one record per transition.
//!    The hold duration runs to the timestamp of the next event that has
//!    transitions (event granularity, not per field), or is `N/A` when there
//!    is none or its timestamp is unparseable. Entries without transitions
//!    are ignored, so the last record is always `N/A`.
//!
//! Events are never re-sorted; out-of-order timestamps only produce a
//! warning.

use std::fmt;

use serde::Serialize;

use crate::duration::HoldDuration;
use crate::issue::ChangeEvent;
use crate::sentinel::{self, CREATED_FIELD, NONE};
use crate::timestamp::{Timestamp, parse_timestamp};

/// One field transition enriched with its hold duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineRecord {
    pub field: String,
    /// Previous value, never empty.
    pub from: String,
    /// New value, never empty.
    pub to: String,
    /// `None` only for a synthetic creation record whose creation time is
    /// unknown.
    pub changed_at: Option<Timestamp>,
    pub hold: HoldDuration,
}

/// A recoverable problem found while reconstructing a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineWarning {
    /// The issue's own creation timestamp could not be parsed.
    InvalidCreated { value: String },
    /// A changelog entry's timestamp could not be parsed; its transitions
    /// were dropped.
    InvalidTimestamp { index: usize, value: String },
    /// The next entry with transitions after `index` has an unparseable
    /// timestamp, so the hold duration for `index` is not applicable.
    InvalidSuccessor { index: usize },
    /// The entry at `index` is dated before its predecessor, or before the
    /// issue's creation.
    OutOfOrder { index: usize },
}

impl fmt::Display for TimelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCreated { value } => {
                write!(f, "invalid creation timestamp {value:?}")
            }
            Self::InvalidTimestamp { index, value } => {
                write!(f, "changelog entry {index} has invalid timestamp {value:?}, skipped")
            }
            Self::InvalidSuccessor { index } => write!(
                f,
                "entry following changelog entry {index} has invalid timestamp, duration unknown"
            ),
            Self::OutOfOrder { index } => {
                write!(f, "changelog entry {index} is dated before its predecessor")
            }
        }
    }
}

/// The result of [`reconstruct`].
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Creation timestamp used for the synthetic record.
    pub created: Option<Timestamp>,
    pub records: Vec<TimelineRecord>,
    pub warnings: Vec<TimelineWarning>,
}

/// Rebuilds an issue's timeline from its changelog.
///
/// `events` must be ordered oldest first, as trackers return them.
/// `created` is the issue's own creation time when known; otherwise the
/// first changelog entry stands in for it.
pub fn reconstruct(
    issue_type: &str,
    created: Option<Timestamp>,
    events: &[ChangeEvent],
) -> Reconstruction {
    if events.is_empty() {
        return Reconstruction {
            created,
            ..Reconstruction::default()
        };
    }

    let mut warnings = Vec::new();
    let stamps: Vec<Option<Timestamp>> = events
        .iter()
        .enumerate()
        .map(|(index, event)| match parse_timestamp(&event.created) {
            Ok(ts) => Some(ts),
            Err(_) => {
                warnings.push(TimelineWarning::InvalidTimestamp {
                    index,
                    value: event.created.clone(),
                });
                None
            }
        })
        .collect();

    // Only entries that produce records delimit hold durations
    let emits = |index: usize| !events[index].items.is_empty();

    let (created, creation_hold) = match created {
        Some(created) => {
            let first = (0..events.len())
                .filter(|&index| emits(index))
                .find_map(|index| stamps[index].map(|at| (index, at)));
            if let Some((index, _)) = first.filter(|(_, at)| *at < created) {
                warnings.push(TimelineWarning::OutOfOrder { index });
            }
            (
                Some(created),
                HoldDuration::between(&created, first.map(|(_, at)| at).as_ref()),
            )
        }
        None => (stamps[0], HoldDuration::NotApplicable),
    };

    let transitions: usize = events.iter().map(|e| e.items.len()).sum();
    let mut records = Vec::with_capacity(transitions + 1);
    records.push(TimelineRecord {
        field: CREATED_FIELD.to_string(),
        from: NONE.to_string(),
        to: sentinel::normalize(Some(issue_type)),
        changed_at: created,
        hold: creation_hold,
    });

    for (index, event) in events.iter().enumerate() {
        let Some(at) = stamps[index] else {
            continue;
        };
        if !emits(index) {
            continue;
        }

        let successor = (index + 1..events.len()).find(|&later| emits(later));
        let next = match successor {
            None => None,
            Some(later) => match stamps[later] {
                None => {
                    warnings.push(TimelineWarning::InvalidSuccessor { index });
                    None
                }
                Some(next) => {
                    if next < at {
                        warnings.push(TimelineWarning::OutOfOrder { index: later });
                    }
                    Some(next)
                }
            },
        };

        let hold = HoldDuration::between(&at, next.as_ref());
        records.extend(event.items.iter().map(|item| TimelineRecord {
            field: item.field.clone(),
            from: sentinel::normalize(item.from.as_deref()),
            to: sentinel::normalize(item.to.as_deref()),
            changed_at: Some(at),
            hold,
        }));
    }

    Reconstruction {
        created,
        records,
        warnings,
    }
}
