//! Pure data types for theme loading (no filesystem access).

use std::fmt;
use std::path::PathBuf;

/// What the user asked for: a path to an HTML file, a theme directory, or
/// the name of an installed theme package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeReference(String);

impl ThemeReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is shaped like an npm package name
    /// (`name` or `@scope/name`), i.e. worth a package lookup.
    pub fn is_package_name(&self) -> bool {
        let name = self.0.as_str();
        if name.is_empty() || name.starts_with('.') || name.contains('\\') {
            return false;
        }
        match name.strip_prefix('@') {
            Some(scoped) => {
                let mut parts = scoped.split('/');
                matches!(
                    (parts.next(), parts.next(), parts.next()),
                    (Some(scope), Some(pkg), None) if !scope.is_empty() && !pkg.is_empty()
                )
            }
            None => !name.contains('/'),
        }
    }
}

impl fmt::Display for ThemeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThemeReference {
    fn from(reference: &str) -> Self {
        Self::new(reference)
    }
}

/// A located theme. Both paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTheme {
    /// The HTML document to load
    pub entry_path: PathBuf,
    /// Base directory for `<%=paths.theme%>` assets
    pub theme_dir: PathBuf,
}

impl ResolvedTheme {
    /// Absolute path of a theme-relative asset.
    pub fn asset_path(&self, relative: &str) -> PathBuf {
        self.theme_dir.join(relative.trim_start_matches('/'))
    }
}

/// The three classes of asset reference a theme document can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `<link href="<%=paths.modules%>/pkg/file.css">`
    RemoteStyle,
    /// `<script src="<%=paths.modules%>/pkg/file.js">`
    RemoteScript,
    /// `<script src="<%=paths.theme%>/file.js">`
    LocalScript,
}

impl AssetKind {
    /// Label used inside placeholder comments.
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::RemoteStyle => "CSS",
            AssetKind::RemoteScript => "JS",
            AssetKind::LocalScript => "THEME JS",
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, AssetKind::LocalScript)
    }
}

/// One asset reference found while scanning a theme document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMarker {
    pub kind: AssetKind,
    /// Package providing the asset (remote kinds only)
    pub package: Option<String>,
    /// Path inside the package, or relative to the theme directory
    pub asset_path: String,
    /// Comment that replaced the original tag in the document
    pub placeholder: String,
    /// Raw asset content, once read
    pub content: Option<String>,
}

impl AssetMarker {
    /// `package/file` for remote assets, `file` for theme scripts.
    pub fn identifier(&self) -> String {
        match self.package {
            Some(ref package) => format!("{}/{}", package, self.asset_path),
            None => self.asset_path.clone(),
        }
    }

    /// Human readable description used when a package this asset needs is missing.
    pub fn required_by(&self) -> String {
        match self.kind {
            AssetKind::RemoteStyle => format!("CSS pre-load of \"{}\"", self.asset_path),
            AssetKind::RemoteScript => format!("JS pre-load of \"{}\"", self.asset_path),
            AssetKind::LocalScript => format!("theme script \"{}\"", self.asset_path),
        }
    }
}
