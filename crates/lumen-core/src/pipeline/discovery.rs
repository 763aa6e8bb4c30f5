//! Finding input images on disk.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Discovers image files with a supported extension.
pub struct FileDiscovery {
    config: ProcessingConfig,
    excluded: Option<PathBuf>,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            config,
            excluded: None,
        }
    }

    /// Skip everything under `dir`, typically the directory enhanced images
    /// are written to, so a second run does not enhance its own output.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded = Some(dir.into());
        self
    }

    /// Discover all supported image files at a path.
    ///
    /// A file path yields itself if supported. A directory is walked
    /// recursively; results are sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return match std::fs::metadata(path) {
                Ok(meta) if self.is_supported(path) => vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                }],
                _ => vec![],
            };
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry.path()))
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: entry.into_path(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!("Discovered {} images under {:?}", files.len(), path);
        files
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded
            .as_deref()
            .is_some_and(|dir| path.starts_with(dir))
    }

    /// Check if a file has a supported extension (case-insensitive).
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
