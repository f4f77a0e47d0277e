//! Version-scoped feature flags of a connection.

use crate::types::ColumnType;

use super::{dialect_for, DatabaseVersion, Dialect, DialectKind, TypeRule};

/// What the connected server can do.
///
/// Passed explicitly to the type mapper, builder and validator so that
/// metadata can be computed without a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectCapability {
    /// Engine identifier.
    pub kind: DialectKind,
    /// Server version, when known.
    pub version: Option<DatabaseVersion>,
    /// Treat an unknown version as the newest supported one.
    pub assume_latest: bool,
    /// Refuse version fallbacks instead of substituting.
    pub strict_types: bool,
}

impl DialectCapability {
    /// Capability of an unknown server version (oldest feature set).
    #[must_use]
    pub const fn new(kind: DialectKind) -> Self {
        Self {
            kind,
            version: None,
            assume_latest: false,
            strict_types: false,
        }
    }

    /// Builds a capability from the vendor version string reported by a
    /// server. A MySQL connection that reports a MariaDB server is
    /// switched to the MariaDB strategy.
    #[must_use]
    pub fn detect(kind: DialectKind, version_string: &str) -> Self {
        let kind = if kind == DialectKind::MySql && DatabaseVersion::is_mariadb(version_string) {
            DialectKind::MariaDb
        } else {
            kind
        };
        Self {
            version: DatabaseVersion::parse(version_string).ok(),
            ..Self::new(kind)
        }
    }

    /// Sets the server version.
    #[must_use]
    pub const fn with_version(mut self, version: DatabaseVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Assumes the newest feature set when the version is unknown.
    #[must_use]
    pub const fn assume_latest(mut self) -> Self {
        self.assume_latest = true;
        self
    }

    /// Turns version fallbacks into errors.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict_types = true;
        self
    }

    /// The strategy for this engine.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        dialect_for(self.kind)
    }

    /// Returns `true` when the server is at least `version`.
    #[must_use]
    pub fn version_at_least(&self, version: DatabaseVersion) -> bool {
        self.version.map_or(self.assume_latest, |v| v >= version)
    }

    /// Returns `true` when `column_type` is stored natively on this server.
    #[must_use]
    pub fn supports(&self, column_type: ColumnType) -> bool {
        match self.dialect().type_rule(column_type) {
            TypeRule::Native(_) => true,
            TypeRule::Since { since, .. } => self.version_at_least(since),
            TypeRule::Fallback(_) | TypeRule::Unsupported => false,
        }
    }
}
