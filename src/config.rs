//! Loader and window configuration.
//!
//! Window geometry is layered: hard defaults, then `<meta name="conkie-*">`
//! tags found in the theme, then the config file's `window` section, then
//! command line flags. Each layer is a [`WindowOverrides`] applied on top of
//! the previous result.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Window parameters handed to the host that creates the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    /// Window type hint (`desktop`, `dock`, `normal`, ...)
    #[serde(rename = "type")]
    pub window_type: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub transparent: bool,
    pub title: String,
    /// Draw window decorations. Only debug windows are framed.
    pub frame: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_type: "desktop".to_string(),
            x: 10,
            y: 10,
            width: 200,
            height: 1000,
            transparent: true,
            title: "Conkie".to_string(),
            frame: false,
        }
    }
}

impl WindowConfig {
    /// Seed used when running with `--debug`: a regular framed window.
    pub fn debug() -> Self {
        Self {
            window_type: "normal".to_string(),
            width: 1000,
            height: 1000,
            transparent: false,
            frame: true,
            ..Self::default()
        }
    }

    /// Seed for the given mode.
    pub fn seed(debug: bool) -> Self {
        if debug {
            Self::debug()
        } else {
            Self::default()
        }
    }

    /// Apply a layer of overrides, returning the combined configuration.
    pub fn with_overrides(mut self, overrides: &WindowOverrides) -> Self {
        if let Some(ref window_type) = overrides.window_type {
            self.window_type = window_type.clone();
        }
        if let Some(x) = overrides.x {
            self.x = x;
        }
        if let Some(y) = overrides.y {
            self.y = y;
        }
        if let Some(width) = overrides.width {
            self.width = width;
        }
        if let Some(height) = overrides.height {
            self.height = height;
        }
        if let Some(transparent) = overrides.transparent {
            self.transparent = transparent;
        }
        if let Some(ref title) = overrides.title {
            self.title = title.clone();
        }
        self
    }
}

/// A partial [`WindowConfig`]. Unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WindowOverrides {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub window_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl WindowOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge `other` on top of `self` (fields set in `other` win).
    pub fn merge(&mut self, other: &WindowOverrides) {
        if other.window_type.is_some() {
            self.window_type = other.window_type.clone();
        }
        if other.x.is_some() {
            self.x = other.x;
        }
        if other.y.is_some() {
            self.y = other.y;
        }
        if other.width.is_some() {
            self.width = other.width;
        }
        if other.height.is_some() {
            self.height = other.height;
        }
        if other.transparent.is_some() {
            self.transparent = other.transparent;
        }
        if other.title.is_some() {
            self.title = other.title.clone();
        }
    }
}

/// Settings that drive a [`crate::Loader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Theme reference: a file, a theme directory or a package name.
    pub theme: String,
    /// Application root, exposed to themes as `paths.root`. Its
    /// `node_modules` directory is searched after the theme's own.
    pub app_root: PathBuf,
    pub debug: bool,
    pub watch: bool,
    /// Extra global package directories, searched after the local ones.
    pub package_dirs: Vec<PathBuf>,
    /// Window overrides applied above the theme's meta tags.
    pub window: WindowOverrides,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let app_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            theme: Self::default_theme(&app_root),
            app_root,
            debug: false,
            watch: false,
            package_dirs: Vec::new(),
            window: WindowOverrides::default(),
        }
    }
}

impl LoaderConfig {
    /// The bundled theme under `app_root`.
    pub fn default_theme(app_root: &Path) -> String {
        app_root
            .join("themes")
            .join("default")
            .join("index.html")
            .to_string_lossy()
            .into_owned()
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Default config file location (`<config dir>/conkie/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("conkie").join("config.json"))
    }

    /// Global package directories: configured ones first, then `NODE_PATH`.
    pub fn global_package_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.package_dirs.clone();
        if let Some(node_path) = std::env::var_os("NODE_PATH") {
            dirs.extend(std::env::split_paths(&node_path).filter(|p| !p.as_os_str().is_empty()));
        }
        dirs
    }
}
