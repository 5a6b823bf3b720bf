//! Installed package discovery.
//!
//! The `PackageLookup` trait lets the loader run against something other
//! than the real filesystem (tests use an in-memory map). `NodeModulesLookup`
//! searches `node_modules` directories the way node does: closest to the
//! theme first, then the application, then global trees.

use std::collections::{BTreeSet, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{LoaderError, Result};

/// A package directory found by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMatch {
    pub name: String,
    pub dir: PathBuf,
}

/// Batched package lookup.
#[async_trait]
pub trait PackageLookup: Send + Sync {
    /// Find installed packages whose name is in `names`, searching outward
    /// from `near`. Matches come back in discovery order; a name may match
    /// more than once and names may be missing entirely.
    async fn find(&self, names: &BTreeSet<String>, near: &Path) -> Result<Vec<PackageMatch>>;
}

/// The parts of `package.json` the lookup cares about.
#[derive(Debug, serde::Deserialize)]
struct PackageManifest {
    #[serde(default)]
    name: Option<String>,
}

/// Default lookup over `node_modules` trees on the local filesystem.
#[derive(Debug, Clone)]
pub struct NodeModulesLookup {
    app_root: PathBuf,
    global_dirs: Vec<PathBuf>,
}

impl NodeModulesLookup {
    /// Create a lookup that falls back to `app_root/node_modules` and then to
    /// each of `global_dirs` (which are package directories themselves).
    pub fn new(app_root: PathBuf, global_dirs: Vec<PathBuf>) -> Self {
        Self {
            app_root,
            global_dirs,
        }
    }

    /// Directories searched for packages, most preferred first.
    pub fn search_roots(&self, near: &Path) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        near.ancestors()
            .map(|dir| dir.join("node_modules"))
            .chain(std::iter::once(self.app_root.join("node_modules")))
            .chain(self.global_dirs.iter().cloned())
            .filter(|dir| seen.insert(dir.clone()))
            .collect()
    }
}

#[async_trait]
impl PackageLookup for NodeModulesLookup {
    async fn find(&self, names: &BTreeSet<String>, near: &Path) -> Result<Vec<PackageMatch>> {
        let mut matches = Vec::new();
        if names.is_empty() {
            return Ok(matches);
        }

        let mut found: HashSet<String> = HashSet::new();
        for root in self.search_roots(near) {
            if found.len() == names.len() {
                break;
            }
            if !tokio::fs::metadata(&root)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
            {
                continue;
            }
            tracing::debug!("Searching for packages in {:?}", root);

            for candidate in package_dirs(&root).await? {
                let Some(name) = manifest_name(&candidate).await else {
                    continue;
                };
                if names.contains(&name) {
                    tracing::debug!("Found package {} at {:?}", name, candidate);
                    found.insert(name.clone());
                    matches.push(PackageMatch {
                        name,
                        dir: candidate,
                    });
                }
            }
        }

        Ok(matches)
    }
}

/// Every package directory directly under `root`, expanding `@scope`
/// directories one level. Sorted so discovery order is stable.
async fn package_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for path in list_dirs(root).await.map_err(|e| lookup_error(root, e))? {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Skip hidden entries like .bin and .package-lock.json
        if file_name.starts_with('.') {
            continue;
        }
        if file_name.starts_with('@') {
            match list_dirs(&path).await {
                Ok(scoped) => dirs.extend(scoped),
                Err(e) => tracing::warn!("Failed to read scope directory {:?}: {}", path, e),
            }
        } else {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

async fn list_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // Follow symlinks (npm link, pnpm) when deciding what is a directory
        if tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

async fn manifest_name(package_dir: &Path) -> Option<String> {
    let manifest_path = package_dir.join("package.json");
    let content = tokio::fs::read_to_string(&manifest_path).await.ok()?;
    match serde_json::from_str::<PackageManifest>(&content) {
        Ok(manifest) => manifest.name,
        Err(e) => {
            tracing::debug!("Failed to parse {:?}: {}", manifest_path, e);
            None
        }
    }
}

fn lookup_error(root: &Path, e: io::Error) -> LoaderError {
    LoaderError::PackageLookupFailed(format!("cannot read {}: {}", root.display(), e))
}
