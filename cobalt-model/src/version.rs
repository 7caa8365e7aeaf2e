//! Discord API version selection.

use serde::{Deserialize, Serialize};

/// The Discord API version to speak, on both the gateway and REST surfaces.
///
/// `V10` is the default and requires an intent bitmask at identify time.
/// `V6` is kept as a legacy compatibility mode for deployments that have not
/// migrated; it only changes the REST base path and the gateway `?v=` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Deprecated upstream; selectable for legacy deployments.
    V6,
    /// Current stable version.
    #[default]
    V10,
}

impl ApiVersion {
    /// Numeric version used in the gateway query string.
    pub const fn number(self) -> u8 {
        match self {
            ApiVersion::V6 => 6,
            ApiVersion::V10 => 10,
        }
    }

    /// REST base URL for this version.
    pub const fn rest_base(self) -> &'static str {
        match self {
            ApiVersion::V6 => "https://discord.com/api/v6",
            ApiVersion::V10 => "https://discord.com/api/v10",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_defaults_to_v10() {
        assert_eq!(ApiVersion::default(), ApiVersion::V10);
        assert_eq!(ApiVersion::default().number(), 10);
    }

    #[test]
    fn legacy_base_path() {
        assert_eq!(ApiVersion::V6.rest_base(), "https://discord.com/api/v6");
    }
}
