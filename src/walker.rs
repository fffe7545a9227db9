use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::error::Result;

/// A document file found under a corpus directory.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the corpus root directory.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

/// Supported file extensions for document discovery.
const SUPPORTED_EXTENSIONS: &[&str] = &["md", "txt"];

/// Compile an `--include` pattern, matched against paths relative to the
/// corpus root.
pub fn include_matcher(pattern: &str) -> Result<GlobMatcher> {
    Ok(Glob::new(pattern)?.compile_matcher())
}

/// Recursively walk a directory and discover eligible document files.
///
/// Skips hidden files/directories (names starting with `.`) and only
/// returns files with supported extensions (.md, .txt).
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    discover_matching(root, None)
}

/// Like [`discover_files`], keeping only files whose relative path matches
/// `include` when one is given.
pub fn discover_matching(
    root: &Path,
    include: Option<&GlobMatcher>,
) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, &mut results)?;

    if let Some(matcher) = include {
        results.retain(|f| matcher.is_match(&f.relative_path));
    }
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    tracing::debug!(
        root = %canonical_root.display(),
        files = results.len(),
        "discovered documents"
    );
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();

        // Skip hidden files and directories.
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            walk_dir(root, &path, results)?;
        } else if file_type.is_symlink() {
            let Ok(resolved) = path.canonicalize() else {
                continue;
            };
            // Directory links back into the tree would loop.
            if resolved.starts_with(root) && resolved.is_dir() {
                continue;
            }
            if resolved.is_file() && is_supported(&resolved) {
                results.push(discovered(root, &path, resolved));
            }
        } else if file_type.is_file() && is_supported(&path) {
            let absolute = path.canonicalize()?;
            results.push(discovered(root, &path, absolute));
        }
    }

    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

fn discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: PathBuf,
) -> DiscoveredFile {
    DiscoveredFile {
        relative_path: original_path
            .strip_prefix(root)
            .unwrap_or(original_path)
            .to_path_buf(),
        absolute_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn discovers_md_and_txt() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("kanun.md"), "# Kanun").unwrap();
        std::fs::write(tmp.path().join("karar.txt"), "Karar").unwrap();
        std::fs::write(tmp.path().join("scan.pdf"), "binary").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["kanun.md", "karar.txt"]);
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let hidden = tmp.path().join(".git");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("config.md"), "git config").unwrap();
        std::fs::write(tmp.path().join(".taslak.md"), "taslak").unwrap();
        std::fs::write(tmp.path().join("notlar.md"), "notlar").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["notlar.md"]);
    }

    #[test]
    fn recurses_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("kararlar");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("2020.md"), "karar").unwrap();
        std::fs::write(tmp.path().join("z.md"), "z").unwrap();
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["a.md", "kararlar/2020.md", "z.md"]);
    }

    #[test]
    fn include_pattern_filters_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("kararlar");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("2020.md"), "karar").unwrap();
        std::fs::write(tmp.path().join("kanun.md"), "kanun").unwrap();

        let matcher = include_matcher("kararlar/**").unwrap();
        let files = discover_matching(tmp.path(), Some(&matcher)).unwrap();
        assert_eq!(names(&files), vec!["kararlar/2020.md"]);
    }

    #[test]
    fn invalid_include_pattern() {
        assert!(matches!(
            include_matcher("a[b"),
            Err(crate::error::Error::Glob(_))
        ));
    }

    #[test]
    fn empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_files(tmp.path()).unwrap().is_empty());
    }
}
