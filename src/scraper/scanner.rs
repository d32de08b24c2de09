use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default media file extensions, matched case-insensitively
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "wmv", "flv", "mpeg", "m2ts", "mts", "mpe", "mpg", "m4v", "avi", "mkv", "rmvb", "ts",
    "mov", "rm",
];

/// Scanner for finding media files
#[derive(Debug, Clone)]
pub struct Scanner {
    extensions: BTreeSet<String>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            extensions: MEDIA_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept additional extensions, with or without the leading dot
    #[must_use]
    pub fn with_extra_extensions<S: AsRef<str>>(mut self, extra: &[S]) -> Self {
        self.extensions.extend(
            extra
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty()),
        );
        self
    }

    #[must_use]
    pub fn is_media_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    /// Media files under `path`, sorted. Unreadable entries are skipped.
    pub fn scan<P: AsRef<Path>>(&self, path: P) -> Vec<PathBuf> {
        let mut media_files = BTreeSet::new();

        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && self.is_media_file(path) {
                media_files.insert(path.to_path_buf());
            }
        }

        media_files.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Scanner;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_media_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        File::create(dir_path.join("ABP-123.mkv")).unwrap();
        File::create(dir_path.join("IPTD-899-C.MP4")).unwrap();
        File::create(dir_path.join("document.txt")).unwrap();

        let results = Scanner::new().scan(dir_path);

        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|p| p.extension().unwrap() == "mkv"));
        assert!(results.iter().any(|p| p.extension().unwrap() == "MP4"));
    }

    #[test]
    fn test_scan_ignores_non_media() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        File::create(dir_path.join("image.jpg")).unwrap();
        File::create(dir_path.join("audio.mp3")).unwrap();
        File::create(dir_path.join("subtitle.srt")).unwrap();

        assert!(Scanner::new().scan(dir_path).is_empty());
    }

    #[test]
    fn test_scan_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        let subdir = dir_path.join("IPTD-899");
        fs::create_dir(&subdir).unwrap();

        File::create(dir_path.join("ABP-123.mkv")).unwrap();
        File::create(subdir.join("IPTD-899-B.mkv")).unwrap();

        assert_eq!(Scanner::new().scan(dir_path).len(), 2);
    }

    #[test]
    fn test_extra_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path();

        File::create(dir_path.join("ABP-123.strm")).unwrap();
        File::create(dir_path.join("ABP-124.ISO")).unwrap();

        let scanner = Scanner::new().with_extra_extensions(&[".strm", "iso"]);
        assert_eq!(scanner.scan(dir_path).len(), 2);
        assert!(Scanner::new().scan(dir_path).is_empty());
    }
}
