//! Database server versions.

use core::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseVersionError;

/// A `major.minor.patch` server version, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl DatabaseVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extracts the first dotted version number from a vendor string.
    ///
    /// ```
    /// use oxide_entity_core::dialect::DatabaseVersion;
    ///
    /// let v = DatabaseVersion::parse("10.10.2-MariaDB-1:10.10.2+maria~ubu2204").unwrap();
    /// assert_eq!(v, DatabaseVersion::new(10, 10, 2));
    /// let v = DatabaseVersion::parse("PostgreSQL 15.3 on x86_64-pc-linux-gnu").unwrap();
    /// assert_eq!(v, DatabaseVersion::new(15, 3, 0));
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("static version pattern is valid"));
        let caps = pattern
            .captures(input)
            .ok_or_else(|| ParseVersionError(input.to_string()))?;
        let component = |idx: usize| -> Result<u32, ParseVersionError> {
            caps.get(idx).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| ParseVersionError(input.to_string()))
            })
        };
        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }

    /// Returns `true` when a vendor string identifies a MariaDB server.
    #[must_use]
    pub fn is_mariadb(input: &str) -> bool {
        input.to_ascii_lowercase().contains("mariadb")
    }
}

impl fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for DatabaseVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DatabaseVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DatabaseVersion> for String {
    fn from(value: DatabaseVersion) -> Self {
        value.to_string()
    }
}
