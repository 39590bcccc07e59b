//! Limits applied while reading a physical package.

use serde::{Deserialize, Serialize};

/// Default maximum uncompressed size of a single package member.
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Default maximum uncompressed size of all package members together.
pub const MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024;

/// Options for opening a package.
///
/// Members are inflated into memory, so both limits bound what a hostile
/// archive can make us allocate. Missing fields take their default when
/// deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageOptions {
    /// Maximum uncompressed bytes for any single member.
    pub max_part_bytes: u64,
    /// Maximum uncompressed bytes across the whole package.
    pub max_total_bytes: u64,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            max_part_bytes: MAX_PART_BYTES,
            max_total_bytes: MAX_TOTAL_BYTES,
        }
    }
}

impl PackageOptions {
    /// Set the per-member limit.
    pub fn with_max_part_bytes(mut self, limit: u64) -> Self {
        self.max_part_bytes = limit;
        self
    }

    /// Set the whole-package limit.
    pub fn with_max_total_bytes(mut self, limit: u64) -> Self {
        self.max_total_bytes = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = PackageOptions::default();
        assert_eq!(opts.max_part_bytes, 256 * 1024 * 1024);
        assert_eq!(opts.max_total_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let opts: PackageOptions = serde_json::from_str(r#"{"max_part_bytes": 1024}"#).unwrap();
        assert_eq!(opts.max_part_bytes, 1024);
        assert_eq!(opts.max_total_bytes, MAX_TOTAL_BYTES);

        let json = serde_json::to_string(&opts.with_max_total_bytes(4096)).unwrap();
        assert_eq!(json, r#"{"max_part_bytes":1024,"max_total_bytes":4096}"#);
    }
}
