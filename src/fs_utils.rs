use crate::error::{QuillError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads the contents of a file at the given path
///
/// # Errors
///
/// - `QuillError::FileNotFound` if the path doesn't exist or isn't a file.
/// - `QuillError::Io` if there's an error reading the file.
pub fn read_file_contents(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(QuillError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    fs::read_to_string(path).map_err(Into::into)
}

/// Resolves `name` relative to `base_dir`, refusing anything that lands
/// outside of it once `..` and symlinks are resolved.
///
/// # Errors
///
/// - `QuillError::PathTraversal` if the resolved path escapes the base directory.
/// - `QuillError::Io` if there's an error canonicalizing paths.
pub fn resolve_within(name: &str, base_dir: &Path) -> Result<PathBuf> {
    let cleaned = name.trim_start_matches(['/', '\\']);
    let full_path = base_dir.join(cleaned);

    let canonical = full_path.canonicalize().or_else(|_| {
        // Not there (yet): canonicalize the parent and keep the file name
        full_path.parent().map_or_else(
            || {
                Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Invalid path",
                ))
            },
            |parent| {
                parent
                    .canonicalize()
                    .map(|p| p.join(full_path.file_name().unwrap_or_default()))
            },
        )
    })?;

    let base_canonical = base_dir.canonicalize()?;
    if !canonical.starts_with(&base_canonical) {
        return Err(QuillError::PathTraversal { path: canonical });
    }

    Ok(canonical)
}

/// Finds an include template in the first directory that has it.
///
/// Directories are searched in order. A directory that does not exist, or
/// where `name` would escape the directory, is skipped.
///
/// # Errors
///
/// Returns `QuillError::TemplateNotFound` when no directory holds `name`.
pub fn resolve_include(name: &str, include_dirs: &[PathBuf]) -> Result<PathBuf> {
    for dir in include_dirs {
        match resolve_within(name, dir) {
            Ok(path) if path.is_file() => return Ok(path),
            Ok(_) | Err(QuillError::PathTraversal { .. } | QuillError::Io(_)) => {}
            Err(e) => return Err(e),
        }
    }

    Err(QuillError::TemplateNotFound {
        name: name.to_string(),
        searched: if include_dirs.is_empty() {
            "no include directories".to_string()
        } else {
            include_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        fs::write(&file_path, "test content").unwrap();
        assert_eq!(read_file_contents(&file_path).unwrap(), "test content");

        let non_existent = temp_dir.path().join("nonexistent.txt");
        let result = read_file_contents(&non_existent);
        assert!(matches!(result, Err(QuillError::FileNotFound { .. })));

        // Directories are not files
        let dir_path = temp_dir.path().join("dir");
        fs::create_dir(&dir_path).unwrap();
        let result = read_file_contents(&dir_path);
        assert!(matches!(result, Err(QuillError::FileNotFound { .. })));
    }

    #[test]
    fn test_resolve_within_basic() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("partials")).unwrap();
        let file_path = base.join("partials/footer.html");
        fs::write(&file_path, "footer").unwrap();

        let expected = file_path.canonicalize().unwrap();
        assert_eq!(resolve_within("partials/footer.html", base).unwrap(), expected);
        assert_eq!(resolve_within("/partials/footer.html", base).unwrap(), expected);
    }

    #[test]
    fn test_resolve_within_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        let resolved = resolve_within("missing.html", base).unwrap();
        assert_eq!(resolved, base.canonicalize().unwrap().join("missing.html"));
    }

    #[test]
    fn test_resolve_within_traversal_prevention() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("site").join("includes");
        fs::create_dir_all(&nested).unwrap();

        let result = resolve_within("../../", &nested);
        assert!(matches!(result, Err(QuillError::PathTraversal { .. })));

        let result = resolve_within("../secret.html", &nested);
        assert!(matches!(result, Err(QuillError::PathTraversal { .. })));
    }

    #[test]
    fn test_resolve_include_first_match_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("header.html"), "first").unwrap();
        fs::write(second.path().join("header.html"), "second").unwrap();
        fs::write(second.path().join("only-second.html"), "second").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];

        let found = resolve_include("header.html", &dirs).unwrap();
        assert_eq!(found, first.path().join("header.html").canonicalize().unwrap());

        let found = resolve_include("only-second.html", &dirs).unwrap();
        assert_eq!(
            found,
            second.path().join("only-second.html").canonicalize().unwrap()
        );
    }

    #[test]
    fn test_resolve_include_not_found() {
        let dir = TempDir::new().unwrap();
        let dirs = vec![dir.path().join("does-not-exist"), dir.path().to_path_buf()];

        let err = resolve_include("nope.html", &dirs).unwrap_err();
        match err {
            QuillError::TemplateNotFound { name, searched } => {
                assert_eq!(name, "nope.html");
                assert!(searched.contains("does-not-exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = resolve_include("nope.html", &[]).unwrap_err();
        assert!(matches!(err, QuillError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_resolve_include_skips_escaping_names() {
        let outer = TempDir::new().unwrap();
        let inner = outer.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(outer.path().join("secret.html"), "secret").unwrap();

        let result = resolve_include("../secret.html", &[inner]);
        assert!(matches!(result, Err(QuillError::TemplateNotFound { .. })));
    }

    #[test]
    fn test_resolve_include_ignores_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("partials")).unwrap();

        let result = resolve_include("partials", &[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(QuillError::TemplateNotFound { .. })));
    }
}
