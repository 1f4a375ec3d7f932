use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A text file found under the search root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Path relative to the search root.
    pub relative_path: PathBuf,
    /// Absolute path of the entry itself under the canonical root. A
    /// symlinked file keeps the link's path, not its target's.
    pub absolute_path: PathBuf,
}

/// Extensions recognized as plain text, compared case-insensitively.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Recursively walk `root` and return every text file below it.
///
/// Hidden files and directories (names starting with `.`) are skipped.
/// Results are sorted by relative path so that two walks of the same tree
/// yield the same order.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound(root.to_path_buf()));
    }

    let canonical_root =
        root.canonicalize().map_err(|source| Error::DirectoryUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    let entries = match std::fs::read_dir(current) {
        Ok(entries) => entries,
        // The root itself must be readable; anything below is best effort.
        Err(e) if current != root => {
            tracing::warn!(dir = %current.display(), "skipping unreadable directory: {e}");
            return Ok(());
        }
        Err(source) => {
            return Err(Error::DirectoryUnreadable {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &entry.path(), results)?;
        } else if file_type.is_symlink() {
            let resolved = match entry.path().canonicalize() {
                Ok(p) => p,
                Err(_) => continue, // broken symlink
            };
            // Linked directories are never followed: they may point back
            // into the tree or at one of its ancestors.
            if resolved.is_file() && is_text_file(&resolved) {
                results.push(make_discovered(root, &entry.path()));
            }
        } else if file_type.is_file() && is_text_file(&entry.path()) {
            results.push(make_discovered(root, &entry.path()));
        }
    }

    Ok(())
}

/// Whether `path` ends in one of [`TEXT_EXTENSIONS`].
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            TEXT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn make_discovered(root: &Path, path: &Path) -> DiscoveredFile {
    let relative_path =
        path.strip_prefix(root).unwrap_or(path).to_path_buf();

    DiscoveredFile {
        absolute_path: root.join(&relative_path),
        relative_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_names(files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn discovers_txt_and_md() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("note.md"), "# Hello").unwrap();
        std::fs::write(tmp.path().join("readme.txt"), "Hello").unwrap();
        std::fs::write(tmp.path().join("image.png"), "binary").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(relative_names(&files), vec!["note.md", "readme.txt"]);
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(is_text_file(Path::new("LOUD.TXT")));
        assert!(is_text_file(Path::new("notes.Md")));
        assert!(!is_text_file(Path::new("archive.txt.gz")));
        assert!(!is_text_file(Path::new("txt")));
    }

    #[test]
    fn skips_hidden_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let hidden = tmp.path().join(".git");
        std::fs::create_dir(&hidden).unwrap();
        std::fs::write(hidden.join("config.txt"), "git config").unwrap();
        std::fs::write(tmp.path().join(".secret.txt"), "secret").unwrap();
        std::fs::write(tmp.path().join("visible.txt"), "hello").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(relative_names(&files), vec!["visible.txt"]);
    }

    #[test]
    fn recurses_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let deep = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("deep.txt"), "deep").unwrap();
        std::fs::write(tmp.path().join("top.txt"), "top").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.absolute_path.is_absolute()));
        let names = relative_names(&files);
        assert!(names.contains(&"top.txt".to_string()));
        assert!(
            names.contains(
                &Path::new("a")
                    .join("b")
                    .join("deep.txt")
                    .to_string_lossy()
                    .to_string()
            )
        );
    }

    #[test]
    fn results_are_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("z.txt"), "z").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
        std::fs::write(tmp.path().join("m.txt"), "m").unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(relative_names(&files), vec!["a.txt", "m.txt", "z.txt"]);
    }

    #[test]
    fn repeated_walks_agree() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["q.txt", "b.md", "k.txt"] {
            std::fs::write(tmp.path().join(name), name).unwrap();
        }
        assert_eq!(
            discover_files(tmp.path()).unwrap(),
            discover_files(tmp.path()).unwrap()
        );
    }

    #[test]
    fn empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let files = discover_files(tmp.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn missing_root_is_directory_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let err = discover_files(&missing).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(p) if p == missing));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_keeps_its_own_path() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("real.txt"), "shared").unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("real.txt"),
            tmp.path().join("link.txt"),
        )
        .unwrap();

        let files = discover_files(tmp.path()).unwrap();

        assert_eq!(relative_names(&files), vec!["link.txt", "real.txt"]);
        assert_ne!(files[0].absolute_path, files[1].absolute_path);
        assert!(files[0].absolute_path.ends_with("link.txt"));
        assert!(files.iter().all(|f| f.absolute_path.is_absolute()));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_root_is_directory_unreadable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let mode = |m| std::fs::Permissions::from_mode(m);
        std::fs::set_permissions(&locked, mode(0o000)).unwrap();

        // Privileged users can read the directory regardless of its mode.
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = discover_files(&locked);
        std::fs::set_permissions(&locked, mode(0o755)).unwrap();
        if readable {
            return;
        }

        let err = result.unwrap_err();
        assert!(matches!(err, Error::DirectoryUnreadable { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn file_root_is_directory_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            discover_files(&file),
            Err(Error::DirectoryNotFound(_))
        ));
    }
}
