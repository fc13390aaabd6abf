//! File filtering logic for discovery.

use super::supported_extensions;
use std::collections::HashSet;
use std::path::Path;

/// Decides which directory entries discovery keeps
pub struct MediaFilter {
    /// Lowercase extensions to include
    extensions: HashSet<String>,
    /// Whether to skip entries whose name starts with '.'
    skip_hidden: bool,
}

impl MediaFilter {
    /// Create a filter accepting every supported media extension
    pub fn new() -> Self {
        Self {
            extensions: supported_extensions().map(str::to_string).collect(),
            skip_hidden: false,
        }
    }

    /// Skip hidden files and directories (names starting with .)
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
    }

    /// Check if discovery should descend into a directory
    pub fn should_descend(&self, path: &Path) -> bool {
        !(self.skip_hidden && Self::is_hidden(path))
    }

    /// Check if a non-directory entry should be recorded
    pub fn should_include(&self, path: &Path) -> bool {
        if self.skip_hidden && Self::is_hidden(path) {
            return false;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_includes_images_and_videos() {
        let filter = MediaFilter::new();
        assert!(filter.should_include(Path::new("/photos/image.jpg")));
        assert!(filter.should_include(Path::new("/photos/image.JPEG")));
        assert!(filter.should_include(Path::new("/photos/clip.MOV")));
        assert!(filter.should_include(Path::new("/photos/raw.cr2")));
    }

    #[test]
    fn filter_excludes_unsupported() {
        let filter = MediaFilter::new();
        assert!(!filter.should_include(Path::new("/photos/document.pdf")));
        assert!(!filter.should_include(Path::new("/photos/no_extension")));
    }

    #[test]
    fn hidden_files_are_kept_by_default() {
        let filter = MediaFilter::new();
        assert!(filter.should_include(Path::new("/photos/.hidden.jpg")));
        assert!(filter.should_descend(Path::new("/photos/.thumbnails")));
    }

    #[test]
    fn hidden_entries_can_be_skipped() {
        let filter = MediaFilter::new().with_skip_hidden(true);
        assert!(!filter.should_include(Path::new("/photos/.hidden.jpg")));
        assert!(!filter.should_descend(Path::new("/photos/.thumbnails")));
        assert!(filter.should_descend(Path::new("/photos/2024")));
    }

    #[test]
    fn custom_extensions_are_normalized() {
        let filter = MediaFilter::new().with_extensions(vec![".PNG".to_string()]);
        assert!(filter.should_include(Path::new("/a/b.png")));
        assert!(!filter.should_include(Path::new("/a/b.jpg")));
    }
}
