//! Configuration for changeset application.

/// Environment variable read by [`ReplicatorConfig::from_env`].
pub const MAX_CHANGESETS_ENV: &str = "REPLIDB_MAX_CHANGESETS";

/// Bytes requested from the connection for each read of framing data.
///
/// Large enough to hold any header, item prefix or footer in one read.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for a [`crate::Replicator`].
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    /// Number of most recent changesets to keep in the journal.
    ///
    /// Zero disables journaling.
    pub max_changesets: usize,
    /// Minimum number of bytes to buffer before decoding framing data.
    pub chunk_size: usize,
    /// Whether to fsync the directory after replacing a base file.
    pub sync_directory: bool,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            max_changesets: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sync_directory: true,
        }
    }
}

impl ReplicatorConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration whose journal size comes from
    /// `REPLIDB_MAX_CHANGESETS`.
    ///
    /// A missing, unparsable or non-positive value disables journaling.
    #[must_use]
    pub fn from_env() -> Self {
        let raw = std::env::var(MAX_CHANGESETS_ENV).ok();
        Self::new().max_changesets(parse_max_changesets(raw.as_deref()))
    }

    /// Sets how many changesets the journal retains.
    #[must_use]
    pub const fn max_changesets(mut self, count: usize) -> Self {
        self.max_changesets = count;
        self
    }

    /// Sets the framing read size.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets whether to fsync the directory after base file renames.
    #[must_use]
    pub const fn sync_directory(mut self, value: bool) -> Self {
        self.sync_directory = value;
        self
    }

    /// Returns true if changesets are journaled.
    #[must_use]
    pub const fn journaling_enabled(&self) -> bool {
        self.max_changesets > 0
    }
}

fn parse_max_changesets(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ReplicatorConfig::default();
        assert_eq!(config.max_changesets, 0);
        assert!(!config.journaling_enabled());
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.sync_directory);
    }

    #[test]
    fn builder_pattern() {
        let config = ReplicatorConfig::new()
            .max_changesets(3)
            .chunk_size(16)
            .sync_directory(false);

        assert!(config.journaling_enabled());
        assert_eq!(config.max_changesets, 3);
        assert_eq!(config.chunk_size, 16);
        assert!(!config.sync_directory);
    }

    #[test]
    fn env_value_parsing() {
        assert_eq!(parse_max_changesets(None), 0);
        assert_eq!(parse_max_changesets(Some("")), 0);
        assert_eq!(parse_max_changesets(Some("abc")), 0);
        assert_eq!(parse_max_changesets(Some("-4")), 0);
        assert_eq!(parse_max_changesets(Some("0")), 0);
        assert_eq!(parse_max_changesets(Some(" 5 ")), 5);
    }
}
