use crate::scraper::types::Identity;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A scanned file together with the identity extracted from its name
#[derive(Debug, Clone)]
pub struct FileContext {
    pub path: PathBuf,
    pub identity: Identity,
}

impl FileContext {
    pub const fn new(path: PathBuf, identity: Identity) -> Self {
        Self { path, identity }
    }

    /// Ancestor directory `level` steps up; 0 is the containing directory
    #[must_use]
    pub fn dir(&self, level: usize) -> Option<&Path> {
        self.path.ancestors().nth(level + 1)
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Resolve bare `C` episodes using sibling files.
///
/// A `C` next to a `B` of the same code in the same directory is a real
/// third part, not a subtitle marker.
pub fn reconcile(files: &mut [FileContext]) {
    let with_part_b: HashSet<(String, PathBuf)> = files
        .iter()
        .filter(|f| f.identity.is_resolved() && f.identity.episode_is("B"))
        .filter_map(|f| Some((f.identity.code().to_string(), f.dir(0)?.to_path_buf())))
        .collect();

    if with_part_b.is_empty() {
        return;
    }

    for file in files
        .iter_mut()
        .filter(|f| f.identity.is_resolved() && f.identity.episode_is("C"))
    {
        let Some(dir) = file.dir(0) else {
            continue;
        };
        let key = (file.identity.code().to_string(), dir.to_path_buf());
        if with_part_b.contains(&key) {
            debug!(file = %file.path.display(), "C is a part letter, clearing subtitle flag");
            file.identity.is_chinese_subtitle = false;
        }
    }
}
