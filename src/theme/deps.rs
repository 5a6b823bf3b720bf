//! `require()` dependencies of theme scripts.
//!
//! Theme scripts are inlined into the rendered document, so a bare
//! `require('moment')` would be resolved relative to the temporary output
//! file and fail. Before inlining, every package named this way is resolved
//! and the call rewritten to the package's absolute directory.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tokio::task::JoinSet;

use super::types::{AssetKind, AssetMarker, ResolvedTheme};
use crate::error::{LoaderError, Result};
use crate::packages::{PackageRequests, PackageTable};

static REQUIRE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\brequire\s*\(\s*(?:'(?P<sq>[^'\r\n]+)'|"(?P<dq>[^"\r\n]+)")\s*\)"#)
        .expect("require pattern is valid")
});

/// Modules provided by the host runtime itself. These never live in a
/// package tree and are left alone.
pub const HOST_PROVIDED: &[&str] = &[
    "electron",
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Whether a package name is supplied by the host and must not be relocated.
pub fn is_host_provided(package: &str) -> bool {
    package.starts_with("node:") || HOST_PROVIDED.contains(&package)
}

/// Package part of a module specifier, `None` for relative or absolute paths.
///
/// `lodash/fp` -> `lodash`, `@scope/pkg/sub` -> `@scope/pkg`.
pub fn package_of(specifier: &str) -> Option<&str> {
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || (specifier.contains(':') && !specifier.starts_with("node:"))
    {
        return None;
    }
    let end = if specifier.starts_with('@') {
        let scope_end = specifier.find('/')?;
        specifier[scope_end + 1..]
            .find('/')
            .map_or(specifier.len(), |i| scope_end + 1 + i)
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };
    Some(&specifier[..end])
}

/// Every relocatable package a script `require`s, in order of appearance.
pub fn dependencies(source: &str) -> Vec<String> {
    let mut packages: Vec<String> = Vec::new();
    for caps in REQUIRE_CALL.captures_iter(source) {
        let Some(package) = package_of(specifier(&caps)) else {
            continue;
        };
        if is_host_provided(package) || packages.iter().any(|p| p == package) {
            continue;
        }
        packages.push(package.to_string());
    }
    packages
}

/// Rewrite `require('<package>...')` calls for every package in `table` to
/// point at the resolved directory. Other calls are left byte-identical.
pub fn rewrite_requires(source: &str, table: &PackageTable) -> String {
    REQUIRE_CALL
        .replace_all(source, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let spec = specifier(caps);
            let Some(package) = package_of(spec) else {
                return whole.to_string();
            };
            if is_host_provided(package) {
                return whole.to_string();
            }
            let Some(dir) = table.get(package) else {
                return whole.to_string();
            };

            let quote = if caps.name("sq").is_some() { '\'' } else { '"' };
            let target = format!("{}{}", dir.to_string_lossy(), &spec[package.len()..]);
            whole.replacen(
                &format!("{quote}{spec}{quote}"),
                &format!("{quote}{}{quote}", js_string_body(&target, quote)),
                1,
            )
        })
        .into_owned()
}

fn specifier<'t>(caps: &Captures<'t>) -> &'t str {
    caps.name("sq")
        .or_else(|| caps.name("dq"))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// `value` escaped for use between two `quote` characters in JS source.
fn js_string_body(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c if c == quote => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Read every theme script and record the packages it requires.
///
/// Scripts are read concurrently. The raw content is stored on each marker
/// for the inliner; a read failure aborts with
/// [`LoaderError::LocalAssetUnreadable`].
pub async fn collect_dependencies(
    theme: &ResolvedTheme,
    markers: &mut [AssetMarker],
    requests: &mut PackageRequests,
) -> Result<()> {
    let mut reads = JoinSet::new();
    for (index, marker) in markers.iter().enumerate() {
        if marker.kind != AssetKind::LocalScript {
            continue;
        }
        let path = theme.asset_path(&marker.asset_path);
        reads.spawn(async move {
            let content = tokio::fs::read_to_string(&path).await;
            (index, path, content)
        });
    }

    let mut contents = Vec::new();
    while let Some(joined) = reads.join_next().await {
        let (index, path, content) = joined.map_err(|e| {
            LoaderError::LocalAssetUnreadable {
                path: theme.theme_dir.clone(),
                source: std::io::Error::other(e),
            }
        })?;
        let content =
            content.map_err(|source| LoaderError::LocalAssetUnreadable { path, source })?;
        contents.push((index, content));
    }
    contents.sort_by_key(|(index, _)| *index);

    for (index, content) in contents {
        let marker = &mut markers[index];
        let required_by = marker.required_by();
        let packages = dependencies(&content);
        tracing::debug!(
            "Theme script {} requires [{}]",
            marker.asset_path,
            packages.join(", ")
        );
        for package in &packages {
            requests.require(package, required_by.clone());
        }
        marker.content = Some(content);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const APP_JS: &str = r#"// Imports {{{
var _ = require('lodash');
var $ = require('jquery');
var angular = require("angular");
var electron = require('electron');
var fp = require('lodash/fp');
var fs = require('fs');
var helper = require('./helper');
// }}}
"#;

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("lodash"), Some("lodash"));
        assert_eq!(package_of("lodash/fp"), Some("lodash"));
        assert_eq!(package_of("@scope/pkg"), Some("@scope/pkg"));
        assert_eq!(package_of("@scope/pkg/sub/file.js"), Some("@scope/pkg"));
        assert_eq!(package_of("./helper"), None);
        assert_eq!(package_of("/abs/path"), None);
        assert_eq!(package_of("node:fs"), Some("node:fs"));
        assert_eq!(package_of("@scope"), None);
    }

    #[test]
    fn test_dependencies_skip_host_and_relative() {
        assert_eq!(dependencies(APP_JS), vec!["lodash", "jquery", "angular"]);
    }

    #[test]
    fn test_rewrite_requires() {
        let table: PackageTable = [
            ("lodash".to_string(), PathBuf::from("/nm/lodash")),
            ("angular".to_string(), PathBuf::from("/nm/angular")),
        ]
        .into_iter()
        .collect();

        let rewritten = rewrite_requires(APP_JS, &table);

        assert!(rewritten.contains("var _ = require('/nm/lodash');"));
        assert!(rewritten.contains("var fp = require('/nm/lodash/fp');"));
        assert!(rewritten.contains(r#"var angular = require("/nm/angular");"#));
        // Not in the table, excluded, or relative: untouched
        assert!(rewritten.contains("var $ = require('jquery');"));
        assert!(rewritten.contains("var electron = require('electron');"));
        assert!(rewritten.contains("var fs = require('fs');"));
        assert!(rewritten.contains("var helper = require('./helper');"));
    }

    #[test]
    fn test_rewrite_escapes_directory_for_quote_style() {
        let table: PackageTable = [(
            "bar".to_string(),
            PathBuf::from(r#"/home/o'brien/say "hi"\lib/bar"#),
        )]
        .into_iter()
        .collect();

        let single = rewrite_requires("var bar = require('bar/x');", &table);
        assert_eq!(
            single,
            r#"var bar = require('/home/o\'brien/say "hi"\\lib/bar/x');"#
        );

        let double = rewrite_requires(r#"var bar = require("bar");"#, &table);
        assert_eq!(
            double,
            r#"var bar = require("/home/o'brien/say \"hi\"\\lib/bar");"#
        );
    }

    #[test]
    fn test_rewrite_keeps_excluded_even_if_resolved() {
        let table: PackageTable = [("electron".to_string(), PathBuf::from("/nm/electron"))]
            .into_iter()
            .collect();
        let source = "const { ipcRenderer } = require( 'electron' );";
        assert_eq!(rewrite_requires(source, &table), source);
    }

    #[tokio::test]
    async fn test_collect_dependencies_reads_scripts() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("app.js"), APP_JS).unwrap();
        let theme = ResolvedTheme {
            entry_path: temp_dir.path().join("index.html"),
            theme_dir: temp_dir.path().to_path_buf(),
        };
        let mut markers = vec![AssetMarker {
            kind: AssetKind::LocalScript,
            package: None,
            asset_path: "app.js".to_string(),
            placeholder: "<!-- THEME JS FOR [app.js] -->".to_string(),
            content: None,
        }];
        let mut requests = PackageRequests::new();

        collect_dependencies(&theme, &mut markers, &mut requests)
            .await
            .unwrap();

        assert_eq!(markers[0].content.as_deref(), Some(APP_JS));
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests.required_by("jquery"),
            Some("theme script \"app.js\"")
        );
    }

    #[tokio::test]
    async fn test_collect_dependencies_missing_script() {
        let temp_dir = tempfile::tempdir().unwrap();
        let theme = ResolvedTheme {
            entry_path: temp_dir.path().join("index.html"),
            theme_dir: temp_dir.path().to_path_buf(),
        };
        let mut markers = vec![AssetMarker {
            kind: AssetKind::LocalScript,
            package: None,
            asset_path: "missing.js".to_string(),
            placeholder: "<!-- THEME JS FOR [missing.js] -->".to_string(),
            content: None,
        }];

        let err = collect_dependencies(&theme, &mut markers, &mut PackageRequests::new())
            .await
            .unwrap_err();
        match err {
            LoaderError::LocalAssetUnreadable { path, .. } => {
                assert_eq!(path, temp_dir.path().join("missing.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
