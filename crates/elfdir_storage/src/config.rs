//! Directory configuration.

use crate::naming::SECTION_PREFIX;

/// Configuration for opening an [`ElfDirectory`](crate::ElfDirectory).
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Prefix shared by all index sections, before the directory name.
    pub section_prefix: String,

    /// Whether setup rejects item sections extending past end of file.
    pub verify_section_bounds: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            section_prefix: SECTION_PREFIX.to_string(),
            verify_section_bounds: true,
        }
    }
}

impl DirectoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the section prefix. It should end in `/`.
    #[must_use]
    pub fn section_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.section_prefix = prefix.into();
        self
    }

    /// Sets whether section ranges are checked against the file length.
    #[must_use]
    pub const fn verify_section_bounds(mut self, value: bool) -> Self {
        self.verify_section_bounds = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DirectoryConfig::new();
        assert_eq!(config.section_prefix, "elfdir/");
        assert!(config.verify_section_bounds);
    }

    #[test]
    fn builder() {
        let config = DirectoryConfig::new()
            .section_prefix("bluge/")
            .verify_section_bounds(false);
        assert_eq!(config.section_prefix, "bluge/");
        assert!(!config.verify_section_bounds);
    }
}
