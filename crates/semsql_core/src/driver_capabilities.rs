use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capabilities a dialect adapter may support.
    ///
    /// Components above the adapter (ontology builder, prompt composer)
    /// query these flags instead of matching on `DbKind` directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriverCapabilities: u32 {
        /// Driver supports multiple databases per server (Postgres, MySQL).
        const MULTIPLE_DATABASES = 1 << 0;

        /// Driver supports schemas within a database (Postgres, Oracle).
        const SCHEMAS = 1 << 1;

        /// Driver supports SSL/TLS connections.
        const SSL = 1 << 2;

        /// Driver requires authentication. False for SQLite.
        const AUTHENTICATION = 1 << 3;

        /// Driver supports cancelling a running query.
        const QUERY_CANCELLATION = 1 << 4;

        /// Driver supports per-query timeouts.
        const QUERY_TIMEOUT = 1 << 5;

        /// Driver supports views.
        const VIEWS = 1 << 6;

        /// Driver supports foreign keys.
        const FOREIGN_KEYS = 1 << 7;

        /// Driver supports indexes.
        const INDEXES = 1 << 8;

        /// Driver supports custom types (enums, domains, composites).
        const CUSTOM_TYPES = 1 << 9;

        /// Driver supports `LIMIT`/`OFFSET`-style row limiting. Oracle uses
        /// `FETCH FIRST` instead; the capability still applies, only the
        /// SQL dialect rendering differs.
        const ROW_LIMITING = 1 << 10;

        /// Driver supports `RETURNING`/output clauses.
        const RETURNING = 1 << 11;
    }
}

impl Serialize for DriverCapabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DriverCapabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits(bits).unwrap_or_else(Self::empty))
    }
}

impl DriverCapabilities {
    /// Capabilities shared by every relational dialect this core supports.
    pub const RELATIONAL_BASE: Self = Self::from_bits_truncate(
        Self::AUTHENTICATION.bits()
            | Self::QUERY_CANCELLATION.bits()
            | Self::VIEWS.bits()
            | Self::INDEXES.bits()
            | Self::FOREIGN_KEYS.bits()
            | Self::ROW_LIMITING.bits(),
    );
}

/// Metadata a driver provides about itself.
///
/// Returned by `DbDriver::metadata()`; used to configure the Prompt Composer
/// and Error Analyzer without either depending on driver-specific details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverMetadata {
    /// Unique identifier, also the value `dialect_name()` returns
    /// (`"postgresql"`, `"mysql"`, `"oracle"`, `"sqlite"`).
    pub id: &'static str,

    pub display_name: &'static str,

    pub capabilities: DriverCapabilities,

    /// Default network port. `None` for file-based SQLite.
    pub default_port: Option<u16>,

    /// URI scheme used in connection strings.
    pub uri_scheme: &'static str,
}

impl DriverMetadata {
    pub fn supports(&self, capability: DriverCapabilities) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relational_base_excludes_schemas_by_default() {
        let caps = DriverCapabilities::RELATIONAL_BASE;
        assert!(caps.contains(DriverCapabilities::VIEWS));
        assert!(caps.contains(DriverCapabilities::FOREIGN_KEYS));
        assert!(!caps.contains(DriverCapabilities::SCHEMAS));
    }

    #[test]
    fn metadata_supports_checks_bits() {
        let meta = DriverMetadata {
            id: "postgresql",
            display_name: "PostgreSQL",
            capabilities: DriverCapabilities::RELATIONAL_BASE | DriverCapabilities::SCHEMAS,
            default_port: Some(5432),
            uri_scheme: "postgresql",
        };
        assert!(meta.supports(DriverCapabilities::SCHEMAS));
        assert!(!meta.supports(DriverCapabilities::CUSTOM_TYPES));
    }
}
