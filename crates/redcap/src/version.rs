//! Three-part REDCap server versions and version ranges.
//!
//! Versions order numerically component by component, so `14.10.0` sorts
//! after `14.9.0`. Ranges are min-inclusive / max-exclusive: capability
//! bands are defined back-to-back (`[14.0.0, 15.0.0)`, `[15.0.0, 16.0.0)`)
//! and an inclusive max would double-match the shared boundary.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::VersionParseError;

/// A REDCap server version (`major.minor.patch`).
///
/// Produced once — parsed from a server response or static configuration —
/// and immutable thereafter. Serialises as the dotted string, the only form
/// the wire ever carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major version — capability bands are keyed on this.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl Version {
    /// Creates a [`Version`] from its three components.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Compares two versions numerically, component by component.
    ///
    /// Equivalent to the derived `Ord`; provided as a named operation for
    /// call sites that read better with an explicit comparison.
    pub fn compare(self, other: Version) -> Ordering {
        self.cmp(&other)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses `"major.minor.patch"`.
    ///
    /// Outer whitespace is trimmed; anything other than exactly three
    /// dot-separated non-negative integers fails, carrying the original
    /// input verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || VersionParseError {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        let mut parts = trimmed.split('.');
        let mut next_component = || -> Result<u32, VersionParseError> {
            let part = parts.next().ok_or_else(fail)?;
            // u32::from_str accepts a leading '+'; the wire format does not.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(fail());
            }
            part.parse().map_err(|_| fail())
        };
        let major = next_component()?;
        let minor = next_component()?;
        let patch = next_component()?;
        if parts.next().is_some() {
            return Err(fail());
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> String {
        value.to_string()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A half-open version interval: `min` inclusive, `max` exclusive.
///
/// `max = None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionRange {
    /// Inclusive lower bound.
    pub min: Version,
    /// Exclusive upper bound; `None` for an unbounded band.
    pub max: Option<Version>,
}

impl VersionRange {
    /// Creates a bounded range `[min, max)`.
    pub fn new(min: Version, max: Version) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Creates an unbounded range `[min, ∞)`.
    pub fn unbounded(min: Version) -> Self {
        Self { min, max: None }
    }

    /// True iff `version >= min` and, when bounded, `version < max`.
    pub fn contains(&self, version: Version) -> bool {
        version >= self.min && self.max.map_or(true, |max| version < max)
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {})", self.min, max),
            None => write!(f, "[{}, )", self.min),
        }
    }
}
