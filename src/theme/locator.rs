//! Theme reference resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::types::{ResolvedTheme, ThemeReference};
use crate::error::{LoaderError, Result};
use crate::packages::PackageLookup;

/// Entry document name for theme directories and theme packages.
pub const THEME_ENTRY: &str = "index.html";

/// Resolve a theme reference to its entry document.
///
/// Tried in order:
/// 1. An existing file is the entry document itself.
/// 2. An existing directory containing `index.html`.
/// 3. An installed package (searched from `app_root`), whose `index.html`
///    is the entry document.
pub async fn locate_theme(
    reference: &ThemeReference,
    lookup: &dyn PackageLookup,
    app_root: &Path,
) -> Result<ResolvedTheme> {
    let path = Path::new(reference.as_str());

    if is_file(path).await {
        return resolved(reference, path).await;
    }

    if is_dir(path).await {
        let entry = path.join(THEME_ENTRY);
        if is_file(&entry).await {
            return resolved(reference, &entry).await;
        }
        tracing::debug!("Theme directory {:?} has no {}", path, THEME_ENTRY);
    }

    if reference.is_package_name() {
        let names = BTreeSet::from([reference.as_str().to_string()]);
        let matches = lookup.find(&names, app_root).await?;
        if let Some(package) = matches.into_iter().find(|m| m.name == reference.as_str()) {
            let entry = package.dir.join(THEME_ENTRY);
            if is_file(&entry).await {
                tracing::debug!("Theme {} found as package at {:?}", reference, package.dir);
                return resolved(reference, &entry).await;
            }
            tracing::warn!(
                "Theme package {} at {:?} has no {}",
                reference,
                package.dir,
                THEME_ENTRY
            );
        }
    }

    Err(not_found(reference))
}

async fn resolved(reference: &ThemeReference, entry: &Path) -> Result<ResolvedTheme> {
    let entry_path = tokio::fs::canonicalize(entry)
        .await
        .map_err(|_| not_found(reference))?;
    let theme_dir = entry_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    Ok(ResolvedTheme {
        entry_path,
        theme_dir,
    })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

fn not_found(reference: &ThemeReference) -> LoaderError {
    LoaderError::ThemeNotFound {
        reference: reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::NodeModulesLookup;

    fn lookup_for(app_root: &Path) -> NodeModulesLookup {
        NodeModulesLookup::new(app_root.to_path_buf(), Vec::new())
    }

    #[tokio::test]
    async fn test_locate_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entry = temp_dir.path().join("sidebar.html");
        std::fs::write(&entry, "<html></html>").unwrap();

        let reference = ThemeReference::new(entry.to_string_lossy());
        let theme = locate_theme(&reference, &lookup_for(temp_dir.path()), temp_dir.path())
            .await
            .unwrap();

        assert_eq!(theme.entry_path, entry.canonicalize().unwrap());
        assert_eq!(theme.theme_dir, temp_dir.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_locate_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let theme_dir = temp_dir.path().join("default");
        std::fs::create_dir_all(&theme_dir).unwrap();
        std::fs::write(theme_dir.join("index.html"), "<html></html>").unwrap();

        let reference = ThemeReference::new(theme_dir.to_string_lossy());
        let theme = locate_theme(&reference, &lookup_for(temp_dir.path()), temp_dir.path())
            .await
            .unwrap();
        assert_eq!(theme.theme_dir, theme_dir.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_locate_package() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pkg_dir = temp_dir.path().join("node_modules/conkie-theme-mc-sidebar");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(
            pkg_dir.join("package.json"),
            r#"{ "name": "conkie-theme-mc-sidebar" }"#,
        )
        .unwrap();
        std::fs::write(pkg_dir.join("index.html"), "<html></html>").unwrap();

        let reference = ThemeReference::new("conkie-theme-mc-sidebar");
        let theme = locate_theme(&reference, &lookup_for(temp_dir.path()), temp_dir.path())
            .await
            .unwrap();
        assert_eq!(theme.theme_dir, pkg_dir.canonicalize().unwrap());
        assert!(theme.entry_path.ends_with("index.html"));
    }

    #[tokio::test]
    async fn test_theme_not_found_names_reference() {
        let temp_dir = tempfile::tempdir().unwrap();
        let reference = ThemeReference::new("no-such-theme");
        let err = locate_theme(&reference, &lookup_for(temp_dir.path()), temp_dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, LoaderError::ThemeNotFound { .. }));
        assert!(err.to_string().contains("no-such-theme"));
    }
}
