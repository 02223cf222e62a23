//! Comparable plugin versions
//!
//! Versions follow a `major.minor.patch[-qualifier]` style scheme with any
//! number of numeric segments. Ordering compares numeric segments by
//! magnitude (missing trailing segments count as zero), then the qualifier:
//! a release without a qualifier is newer than any qualified build of the
//! same numbers, and two qualifiers compare lexically.

use crate::core::error::{SoakError, SoakResult};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed, totally ordered version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<u64>,
    qualifier: Option<String>,
}

impl Version {
    /// Parse a version string
    ///
    /// Fails with [`SoakError::InvalidVersion`] when the string is empty,
    /// contains a non-numeric segment before the qualifier, has an empty
    /// segment (`1..2`) or an empty qualifier (`1.0-`).
    pub fn parse(input: &str) -> SoakResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(SoakError::InvalidVersion("empty version string".to_string()));
        }

        let (numbers, qualifier) = match raw.split_once('-') {
            Some((numbers, qualifier)) => {
                if qualifier.is_empty() {
                    return Err(SoakError::InvalidVersion(format!(
                        "'{raw}' has an empty qualifier"
                    )));
                }
                (numbers, Some(qualifier.to_string()))
            }
            None => (raw, None),
        };

        let segments = numbers
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(SoakError::InvalidVersion(format!(
                        "'{raw}' has a non-numeric segment '{segment}'"
                    )));
                }
                segment.parse::<u64>().map_err(|e| {
                    SoakError::InvalidVersion(format!("'{raw}' segment '{segment}': {e}"))
                })
            })
            .collect::<SoakResult<Vec<u64>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
            qualifier,
        })
    }

    /// The numeric segments, in order
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// The qualifier after the first `-`, if any
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// The version exactly as it was written (trimmed)
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn significant_segments(&self) -> &[u64] {
        let len = self
            .segments
            .iter()
            .rposition(|segment| *segment != 0)
            .map_or(0, |last| last + 1);
        &self.segments[..len]
    }
}

impl FromStr for Version {
    type Err = SoakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<&str> for Version {
    type Error = SoakError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Version::parse(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.segments.len().max(other.segments.len());
        for i in 0..width {
            let ours = self.segments.get(i).copied().unwrap_or(0);
            let theirs = other.segments.get(i).copied().unwrap_or(0);
            match ours.cmp(&theirs) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }

        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(ours), Some(theirs)) => ours.cmp(theirs),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_segments().hash(state);
        self.qualifier.hash(state);
    }
}
