//! Shared fixtures for the loader integration tests.
//!
//! A fixture is an application root in a temp directory:
//!
//! ```text
//! <root>/
//!   node_modules/<package>/package.json
//!   themes/sidebar/index.html
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use conkie::{Loader, LoaderConfig, OutputSlot};
use tempfile::TempDir;

pub struct ThemeFixture {
    _temp_dir: TempDir,
    pub root: PathBuf,
    pub theme_dir: PathBuf,
}

impl ThemeFixture {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(temp_dir.path()).unwrap();
        let theme_dir = root.join("themes").join("sidebar");
        std::fs::create_dir_all(&theme_dir).unwrap();
        std::fs::create_dir_all(root.join("node_modules")).unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
            theme_dir,
        }
    }

    /// Install a package under the app's `node_modules`, with extra files.
    pub fn package(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join("node_modules").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{ "name": "{}", "version": "1.0.0" }}"#, name),
        )
        .unwrap();
        for (file, content) in files {
            write(&dir.join(file), content);
        }
        dir
    }

    /// Write a file relative to the theme directory.
    pub fn theme_file(&self, file: &str, content: &str) -> PathBuf {
        let path = self.theme_dir.join(file);
        write(&path, content);
        path
    }

    pub fn index(&self, html: &str) -> PathBuf {
        self.theme_file("index.html", html)
    }

    pub fn config(&self) -> LoaderConfig {
        LoaderConfig {
            theme: self.theme_dir.to_string_lossy().into_owned(),
            app_root: self.root.clone(),
            ..Default::default()
        }
    }

    /// A loader rendering into `<root>/out/theme.html`.
    pub fn loader(&self) -> Loader {
        Loader::new(self.config()).with_output(OutputSlot::fixed(self.output_path()))
    }

    pub fn output_path(&self) -> PathBuf {
        let out = self.root.join("out");
        std::fs::create_dir_all(&out).unwrap();
        out.join("theme.html")
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
