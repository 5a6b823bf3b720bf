//! Batched package resolution.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::lookup::PackageLookup;
use crate::error::{LoaderError, Result};

/// Every package a run needs, with the first asset that asked for it.
#[derive(Debug, Clone, Default)]
pub struct PackageRequests {
    required_by: BTreeMap<String, String>,
}

impl PackageRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `required_by` needs `package`. The first requirer is kept
    /// for error reporting.
    pub fn require(&mut self, package: &str, required_by: impl Into<String>) {
        self.required_by
            .entry(package.to_string())
            .or_insert_with(|| required_by.into());
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.required_by.keys().cloned().collect()
    }

    pub fn required_by(&self, package: &str) -> Option<&str> {
        self.required_by.get(package).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.required_by.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required_by.is_empty()
    }
}

/// Resolved package directories for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageTable {
    dirs: HashMap<String, PathBuf>,
}

impl PackageTable {
    pub fn get(&self, package: &str) -> Option<&Path> {
        self.dirs.get(package).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for PackageTable {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            dirs: iter.into_iter().collect(),
        }
    }
}

/// Resolve every requested package in a single lookup.
///
/// When the lookup reports several directories for one name the first one
/// wins. Any name without a match fails the run with
/// [`LoaderError::PackageNotFound`], naming the asset that required it.
pub async fn resolve_packages(
    lookup: &dyn PackageLookup,
    requests: &PackageRequests,
    near: &Path,
) -> Result<PackageTable> {
    if requests.is_empty() {
        return Ok(PackageTable::default());
    }

    let names = requests.names();
    tracing::debug!(
        "Find packages {}",
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    );

    let mut dirs = HashMap::new();
    for found in lookup.find(&names, near).await? {
        if !names.contains(&found.name) {
            continue;
        }
        if let Some(existing) = dirs.get(&found.name) {
            tracing::debug!(
                "Ignoring {:?} for package {}, already resolved to {:?}",
                found.dir,
                found.name,
                existing
            );
            continue;
        }
        dirs.insert(found.name, found.dir);
    }

    if let Some(missing) = names.iter().find(|name| !dirs.contains_key(*name)) {
        return Err(LoaderError::PackageNotFound {
            name: missing.clone(),
            required_by: requests
                .required_by(missing)
                .unwrap_or("theme")
                .to_string(),
        });
    }

    tracing::info!("Resolved {} packages", dirs.len());
    Ok(PackageTable { dirs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageMatch;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock lookup for testing
    struct MockPackageLookup {
        installed: Vec<PackageMatch>,
        calls: Mutex<Vec<BTreeSet<String>>>,
    }

    impl MockPackageLookup {
        fn new(installed: &[(&str, &str)]) -> Self {
            Self {
                installed: installed
                    .iter()
                    .map(|(name, dir)| PackageMatch {
                        name: name.to_string(),
                        dir: PathBuf::from(dir),
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PackageLookup for MockPackageLookup {
        async fn find(&self, names: &BTreeSet<String>, _near: &Path) -> Result<Vec<PackageMatch>> {
            self.calls.lock().unwrap().push(names.clone());
            Ok(self
                .installed
                .iter()
                .filter(|m| names.contains(&m.name))
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_single_batched_lookup() {
        let lookup = MockPackageLookup::new(&[("lodash", "/nm/lodash"), ("moment", "/nm/moment")]);
        let mut requests = PackageRequests::new();
        requests.require("lodash", "theme script \"app.js\"");
        requests.require("moment", "theme script \"app.js\"");
        requests.require("lodash", "JS pre-load of \"lodash.js\"");

        let table = resolve_packages(&lookup, &requests, Path::new("/theme"))
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("moment"), Some(Path::new("/nm/moment")));
        let calls = lookup.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let lookup = MockPackageLookup::new(&[
            ("jquery", "/theme/node_modules/jquery"),
            ("jquery", "/usr/lib/node_modules/jquery"),
        ]);
        let mut requests = PackageRequests::new();
        requests.require("jquery", "JS pre-load of \"dist/jquery.js\"");

        let table = resolve_packages(&lookup, &requests, Path::new("/theme"))
            .await
            .unwrap();
        assert_eq!(
            table.get("jquery"),
            Some(Path::new("/theme/node_modules/jquery"))
        );
    }

    #[tokio::test]
    async fn test_missing_package_names_requirer() {
        let lookup = MockPackageLookup::new(&[]);
        let mut requests = PackageRequests::new();
        requests.require("foo", "CSS pre-load of \"foo.css\"");

        let err = resolve_packages(&lookup, &requests, Path::new("/theme"))
            .await
            .unwrap_err();
        match err {
            LoaderError::PackageNotFound { name, required_by } => {
                assert_eq!(name, "foo");
                assert_eq!(required_by, "CSS pre-load of \"foo.css\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_requests_skips_lookup() {
        let lookup = MockPackageLookup::new(&[]);
        let table = resolve_packages(&lookup, &PackageRequests::new(), Path::new("/theme"))
            .await
            .unwrap();
        assert!(table.is_empty());
        assert!(lookup.calls.lock().unwrap().is_empty());
    }
}
