//! The theme loading pipeline.
//!
//! A run goes through fixed phases, each consuming the previous one's output:
//!
//! 1. locate the theme
//! 2. scan the entry document for assets and meta tags
//! 3. read theme scripts and collect their package dependencies
//! 4. resolve every package in one batched lookup
//! 5. inline asset contents
//! 6. render template variables and persist the document
//!
//! [`Loader`] is the run context. It owns the stable output slot and holds
//! its lock for the whole run, so runs never interleave writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{LoaderConfig, WindowConfig};
use crate::error::{LoaderError, Result};
use crate::output::OutputSlot;
use crate::packages::{resolve_packages, NodeModulesLookup, PackageLookup, PackageRequests};
use crate::render::{render_document, TemplateContext};
use crate::theme::{
    deps, inline_assets, locate_theme, scan_document, ResolvedTheme, ThemeReference,
};

/// A persisted, fully inlined theme document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub html: String,
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct LoadedTheme {
    pub theme: ResolvedTheme,
    pub document: RenderedDocument,
    /// Final window settings: seed, then meta tags, then configured overrides
    pub window: WindowConfig,
    /// Number of assets inlined
    pub assets: usize,
}

/// Run context shared by the initial load and every reload.
pub struct Loader {
    config: LoaderConfig,
    lookup: Arc<dyn PackageLookup>,
    output: Mutex<OutputSlot>,
}

impl Loader {
    /// Create a loader that resolves packages from `node_modules` trees.
    pub fn new(config: LoaderConfig) -> Self {
        let lookup = NodeModulesLookup::new(config.app_root.clone(), config.global_package_dirs());
        Self::with_lookup(config, Arc::new(lookup))
    }

    /// Create a loader with a custom package lookup.
    pub fn with_lookup(config: LoaderConfig, lookup: Arc<dyn PackageLookup>) -> Self {
        Self {
            config,
            lookup,
            output: Mutex::new(OutputSlot::temporary()),
        }
    }

    /// Replace the output slot (e.g. to render to a fixed path).
    pub fn with_output(mut self, output: OutputSlot) -> Self {
        self.output = Mutex::new(output);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Path of the last render, if any run has succeeded yet.
    pub async fn output_path(&self) -> Option<PathBuf> {
        self.output.lock().await.path().map(Path::to_path_buf)
    }

    /// Keep the rendered file after the loader is dropped.
    pub async fn keep_output(&self) -> Option<PathBuf> {
        self.output.lock().await.keep()
    }

    /// Run the whole pipeline once.
    ///
    /// Concurrent callers are serialized. On error nothing is written and
    /// the previous render, if any, is left as it was.
    pub async fn load(&self) -> Result<LoadedTheme> {
        let mut output = self.output.lock().await;

        let reference = ThemeReference::new(self.config.theme.clone());
        let theme = locate_theme(&reference, self.lookup.as_ref(), &self.config.app_root).await?;
        tracing::debug!("Loading theme {:?}", theme.entry_path);

        let source = tokio::fs::read_to_string(&theme.entry_path)
            .await
            .map_err(|source| LoaderError::ThemeUnreadable {
                path: theme.entry_path.clone(),
                source,
            })?;

        let mut scan = scan_document(&source);

        let mut requests = PackageRequests::new();
        for marker in scan.markers.iter().filter(|m| m.kind.is_remote()) {
            if let Some(ref package) = marker.package {
                requests.require(package, marker.required_by());
            }
        }
        deps::collect_dependencies(&theme, &mut scan.markers, &mut requests).await?;

        let packages =
            resolve_packages(self.lookup.as_ref(), &requests, &theme.theme_dir).await?;

        let inlined = inline_assets(&scan.document, &scan.markers, &packages, &theme).await?;

        let context = TemplateContext::new(&self.config.app_root, &theme, self.config.debug);
        let html = render_document(&inlined, &context);
        let path = output.write(&html).await?;

        let window = WindowConfig::seed(self.config.debug)
            .with_overrides(&scan.window)
            .with_overrides(&self.config.window);

        tracing::info!(
            "Rendered theme {:?} ({} assets, {} packages) to {:?}",
            theme.entry_path,
            scan.markers.len(),
            packages.len(),
            path
        );

        Ok(LoadedTheme {
            theme,
            document: RenderedDocument { path, html },
            window,
            assets: scan.markers.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_without_assets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entry = temp_dir.path().join("index.html");
        std::fs::write(
            &entry,
            r#"<html><head><meta name="conkie-height" content="600"></head><body data-root="<%= paths.root %>"></body></html>"#,
        )
        .unwrap();

        let config = LoaderConfig {
            theme: entry.to_string_lossy().into_owned(),
            app_root: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let loader = Loader::new(config);
        assert!(loader.output_path().await.is_none());

        let loaded = loader.load().await.unwrap();

        assert_eq!(loaded.assets, 0);
        assert_eq!(loaded.window.height, 600);
        assert_eq!(loaded.window.width, 200);
        assert!(!loaded.document.html.contains("<%"));
        assert_eq!(loader.output_path().await, Some(loaded.document.path.clone()));
    }

    #[tokio::test]
    async fn test_debug_seed_and_configured_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entry = temp_dir.path().join("index.html");
        std::fs::write(&entry, r#"<meta name="conkie-width" content="300">"#).unwrap();

        let mut config = LoaderConfig {
            theme: entry.to_string_lossy().into_owned(),
            app_root: temp_dir.path().to_path_buf(),
            debug: true,
            ..Default::default()
        };
        config.window.title = Some("Debug".to_string());

        let loaded = Loader::new(config).load().await.unwrap();
        assert!(loaded.window.frame);
        assert_eq!(loaded.window.height, 1000);
        assert_eq!(loaded.window.width, 300);
        assert_eq!(loaded.window.title, "Debug");
        assert!(loaded.document.html.contains("conkie-width"));
    }

    #[tokio::test]
    async fn test_missing_theme() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = LoaderConfig {
            theme: temp_dir
                .path()
                .join("nope/index.html")
                .to_string_lossy()
                .into_owned(),
            app_root: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let err = Loader::new(config).load().await.unwrap_err();
        assert!(matches!(err, LoaderError::ThemeNotFound { .. }));
    }
}
