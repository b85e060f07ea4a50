//! Parsing options and configuration.

/// Options for parsing Word documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to load embedded media bytes
    pub extract_resources: bool,

    /// Whether to read `docProps/core.xml`
    pub read_metadata: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip unreadable media and metadata).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable media extraction.
    pub fn with_resources(mut self, extract: bool) -> Self {
        self.extract_resources = extract;
        self
    }

    /// Enable or disable metadata reading.
    pub fn with_metadata(mut self, read: bool) -> Self {
        self.read_metadata = read;
        self
    }

    /// Whether recoverable part failures should be skipped.
    pub fn is_lenient(&self) -> bool {
        self.error_mode == ErrorMode::Lenient
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            extract_resources: true,
            read_metadata: true,
        }
    }
}

/// Error handling mode during parsing.
///
/// The main document part is always required; the mode only governs
/// secondary parts such as media, styles and core properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any unreadable part
    #[default]
    Strict,
    /// Skip unreadable secondary parts and continue
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .lenient()
            .with_resources(false)
            .with_metadata(false);

        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!(options.is_lenient());
        assert!(!options.extract_resources);
        assert!(!options.read_metadata);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(options.extract_resources);
        assert!(options.read_metadata);
    }
}
