//! Asset and meta tag scanning.
//!
//! Theme documents reference package assets through EJS-style template tags:
//!
//! ```html
//! <link rel="stylesheet" href="<%=paths.modules%>/font-awesome/css/font-awesome.css"/>
//! <script src="<%=paths.modules%>/jquery/dist/jquery.js"></script>
//! <script src="<%=paths.theme%>/app.js"></script>
//! <meta name="conkie-width" content="240"/>
//! ```
//!
//! Each asset tag is replaced by a placeholder comment and recorded as an
//! [`AssetMarker`]. Meta tags are left in place and collected into a
//! [`WindowOverrides`] layer.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::types::{AssetKind, AssetMarker};
use crate::config::WindowOverrides;

/// Package name: `name` or `@scope/name`.
const PACKAGE: &str = r#"(?P<package>@[^/"]+/[^/"]+|[^/"@][^/"]*)"#;

static STYLE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?is)<link\b[^>]*?\bhref\s*=\s*"<%[=-]\s*paths\.modules\s*%>/{PACKAGE}/(?P<file>[^"]+)"[^>]*>"#
    ))
    .expect("stylesheet pattern is valid")
});

static MODULE_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?is)<script\b[^>]*?\bsrc\s*=\s*"<%[=-]\s*paths\.modules\s*%>/{PACKAGE}/(?P<file>[^"]+)"[^>]*>(?:\s*</script\s*>)?"#
    ))
    .expect("module script pattern is valid")
});

static THEME_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<script\b[^>]*?\bsrc\s*=\s*"<%[=-]\s*paths\.theme\s*%>/(?P<file>[^"]+)"[^>]*>(?:\s*</script\s*>)?"#,
    )
    .expect("theme script pattern is valid")
});

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<meta\b[^>]*>"#).expect("meta pattern is valid"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?P<key>name|content)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("attribute pattern is valid")
});

/// Prefix shared by every recognized meta tag name.
pub const META_PREFIX: &str = "conkie-";

/// Result of scanning a theme document.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// The document with every asset tag replaced by its placeholder
    pub document: String,
    /// Markers in document order
    pub markers: Vec<AssetMarker>,
    /// Window settings declared by meta tags
    pub window: WindowOverrides,
}

/// An asset tag located in the source text, before placeholder allocation.
#[derive(Debug)]
struct FoundAsset {
    range: Range<usize>,
    kind: AssetKind,
    package: Option<String>,
    file: String,
}

/// Scan a theme document for asset references and meta configuration.
///
/// Every pattern is applied until no further matches exist, so a theme may
/// pull any number of assets of each kind.
pub fn scan_document(source: &str) -> ScanResult {
    let mut found = find_assets(source, &STYLE_LINK, AssetKind::RemoteStyle);
    found.extend(find_assets(source, &MODULE_SCRIPT, AssetKind::RemoteScript));
    found.extend(find_assets(source, &THEME_SCRIPT, AssetKind::LocalScript));
    found.sort_by_key(|f| f.range.start);

    let mut placeholders = PlaceholderAllocator::new(source);
    let mut document = String::with_capacity(source.len());
    let mut markers = Vec::with_capacity(found.len());
    let mut cursor = 0;

    for asset in found {
        if asset.range.start < cursor {
            tracing::warn!(
                "Ignoring overlapping asset reference at byte {}",
                asset.range.start
            );
            continue;
        }
        document.push_str(&source[cursor..asset.range.start]);

        let mut marker = AssetMarker {
            kind: asset.kind,
            package: asset.package,
            asset_path: asset.file,
            placeholder: String::new(),
            content: None,
        };
        marker.placeholder = placeholders.allocate(marker.kind, &marker.identifier());
        tracing::debug!("Found {} asset {}", marker.kind.label(), marker.identifier());

        document.push_str(&marker.placeholder);
        cursor = asset.range.end;
        markers.push(marker);
    }
    document.push_str(&source[cursor..]);

    ScanResult {
        document,
        markers,
        window: scan_meta(source),
    }
}

fn find_assets(source: &str, pattern: &Regex, kind: AssetKind) -> Vec<FoundAsset> {
    pattern
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(FoundAsset {
                range: whole.range(),
                kind,
                package: caps.name("package").map(|m| m.as_str().to_string()),
                file: caps.name("file")?.as_str().to_string(),
            })
        })
        .collect()
}

/// Collect `<meta name="conkie-*" content="...">` settings.
pub fn scan_meta(source: &str) -> WindowOverrides {
    let mut window = WindowOverrides::default();

    for tag in META_TAG.find_iter(source) {
        let mut name = None;
        let mut content = None;
        for attr in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = attribute_value(&attr);
            if attr["key"].eq_ignore_ascii_case("name") {
                name = Some(value);
            } else {
                content = Some(value);
            }
        }

        let (Some(name), Some(content)) = (name, content) else {
            continue;
        };
        let Some(key) = name.strip_prefix(META_PREFIX) else {
            continue;
        };
        apply_meta(&mut window, key, content.trim());
    }

    window
}

fn attribute_value(caps: &Captures<'_>) -> String {
    caps.name("dq")
        .or_else(|| caps.name("sq"))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn apply_meta(window: &mut WindowOverrides, key: &str, value: &str) {
    match key {
        "window-type" => window.window_type = Some(value.to_string()),
        "title" => window.title = Some(value.to_string()),
        "x" => window.x = parse_meta(key, value),
        "y" => window.y = parse_meta(key, value),
        "width" => window.width = parse_meta(key, value),
        "height" => window.height = parse_meta(key, value),
        "transparent" => {
            window.transparent = match value {
                "true" => Some(true),
                "false" => Some(false),
                _ => {
                    tracing::warn!(
                        "Ignoring meta {}{}: expected \"true\" or \"false\", got {:?}",
                        META_PREFIX,
                        key,
                        value
                    );
                    window.transparent
                }
            }
        }
        _ => tracing::debug!("Ignoring unknown meta {}{}", META_PREFIX, key),
    }
}

fn parse_meta<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(
                "Ignoring meta {}{}: {:?} is not a number",
                META_PREFIX,
                key,
                value
            );
            None
        }
    }
}

/// Hands out placeholder comments that are unique within a run and absent
/// from the original document.
struct PlaceholderAllocator<'a> {
    source: &'a str,
    issued: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl<'a> PlaceholderAllocator<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            issued: HashSet::new(),
            counters: HashMap::new(),
        }
    }

    fn allocate(&mut self, kind: AssetKind, identifier: &str) -> String {
        let base = format!("{} FOR [{}]", kind.label(), identifier);
        let counter = self.counters.entry(base.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = if *counter == 1 {
                format!("<!-- {} -->", base)
            } else {
                format!("<!-- {} #{} -->", base, counter)
            };
            if !self.source.contains(&candidate) && self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
