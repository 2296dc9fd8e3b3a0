use super::FileFilter;
use crate::config::{ConfigError, PropertyReader};
use regex::Regex;
use std::path::Path;

/// Skips files whose path matches `file_name_pattern`.
#[derive(Debug, Clone, Default)]
pub struct ExcludeFiles {
    pattern: Option<Regex>,
}

impl ExcludeFiles {
    /// Creates a filter that excludes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileFilter for ExcludeFiles {
    fn name(&self) -> &'static str {
        "ExcludeFiles"
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(pattern) = props.get_regex("file_name_pattern")? {
            self.pattern = Some(pattern);
        }
        Ok(())
    }

    fn accept(&self, path: &Path) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |p| !p.is_match(&path.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::filter::configure_file_filter;

    #[test]
    fn excludes_matching_paths() {
        let mut filter = ExcludeFiles::new();
        let config = ModuleConfig::new("ExcludeFiles").with_property("file_name_pattern", r"generated/.*\.java$");
        configure_file_filter(&mut filter, &config).unwrap();
        assert!(!filter.accept(Path::new("src/generated/A.java")));
        assert!(filter.accept(Path::new("src/main/A.java")));
    }

    #[test]
    fn unconfigured_filter_accepts_everything() {
        assert!(ExcludeFiles::new().accept(Path::new("anything")));
    }
}
