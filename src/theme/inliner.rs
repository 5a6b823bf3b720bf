//! Asset content inlining.
//!
//! Each marker's content is wrapped in a `<style>` or `<script>` element and
//! inserted directly after its placeholder. The placeholder itself stays in
//! the document as an anchor until rendering drops it. Anchor positions are
//! recorded as byte ranges, so text inside an inlined asset is never taken for
//! an anchor.

use std::ops::Range;
use std::path::PathBuf;

use super::deps::rewrite_requires;
use super::types::{AssetKind, AssetMarker, ResolvedTheme};
use crate::error::{LoaderError, Result};
use crate::packages::PackageTable;

/// A document with asset contents inserted after their placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinedDocument {
    pub html: String,
    /// Byte ranges of the placeholder anchors (each with its trailing
    /// newline) in `html`, in ascending order
    pub anchors: Vec<Range<usize>>,
}

/// Content to insert after a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Insertion {
    placeholder: String,
    block: String,
}

/// Inline every marker's content into `document`.
///
/// Stylesheets, package scripts and theme scripts are handled by three
/// concurrent sub-tasks; the document is only touched once all of them have
/// succeeded, so a failed read never leaves a half-inlined result.
pub async fn inline_assets(
    document: &str,
    markers: &[AssetMarker],
    packages: &PackageTable,
    theme: &ResolvedTheme,
) -> Result<InlinedDocument> {
    let (styles, scripts, theme_scripts) = tokio::try_join!(
        inline_package_assets(markers, AssetKind::RemoteStyle, packages),
        inline_package_assets(markers, AssetKind::RemoteScript, packages),
        inline_theme_scripts(markers, packages, theme),
    )?;

    let insertions: Vec<Insertion> = styles
        .into_iter()
        .chain(scripts)
        .chain(theme_scripts)
        .collect();
    tracing::debug!("Inlining {} assets", insertions.len());

    Ok(apply_insertions(document, insertions))
}

async fn inline_package_assets(
    markers: &[AssetMarker],
    kind: AssetKind,
    packages: &PackageTable,
) -> Result<Vec<Insertion>> {
    let mut insertions = Vec::new();
    for marker in markers.iter().filter(|m| m.kind == kind) {
        let package = marker.package.clone().unwrap_or_default();
        let Some(package_dir) = packages.get(&package) else {
            return Err(LoaderError::PackageNotFound {
                name: package,
                required_by: marker.required_by(),
            });
        };

        let path = package_dir.join(&marker.asset_path);
        tracing::debug!("Read {} asset {:?}", kind.label(), path);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(source) => {
                return Err(LoaderError::RemoteAssetUnreadable {
                    package,
                    file: marker.asset_path.clone(),
                    path,
                    source,
                })
            }
        };

        insertions.push(Insertion {
            placeholder: marker.placeholder.clone(),
            block: wrap(kind, &content),
        });
    }
    Ok(insertions)
}

async fn inline_theme_scripts(
    markers: &[AssetMarker],
    packages: &PackageTable,
    theme: &ResolvedTheme,
) -> Result<Vec<Insertion>> {
    let mut insertions = Vec::new();
    for marker in markers.iter().filter(|m| m.kind == AssetKind::LocalScript) {
        let content = match marker.content {
            Some(ref content) => content.clone(),
            None => read_theme_script(theme.asset_path(&marker.asset_path)).await?,
        };
        insertions.push(Insertion {
            placeholder: marker.placeholder.clone(),
            block: wrap(AssetKind::LocalScript, &rewrite_requires(&content, packages)),
        });
    }
    Ok(insertions)
}

async fn read_theme_script(path: PathBuf) -> Result<String> {
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| LoaderError::LocalAssetUnreadable { path, source })
}

fn wrap(kind: AssetKind, content: &str) -> String {
    match kind {
        AssetKind::RemoteStyle => format!("<style>{}</style>", content),
        AssetKind::RemoteScript | AssetKind::LocalScript => {
            format!("<script>{}</script>", content)
        }
    }
}

/// Insert every block after its placeholder in a single pass.
///
/// Placeholder offsets are taken from the scanned document and anchor ranges
/// from the output as it is built.
fn apply_insertions(document: &str, insertions: Vec<Insertion>) -> InlinedDocument {
    let mut anchored: Vec<(usize, Insertion)> = insertions
        .into_iter()
        .filter_map(|insertion| match document.find(&insertion.placeholder) {
            Some(offset) => Some((offset + insertion.placeholder.len(), insertion)),
            None => {
                tracing::warn!("Placeholder {} missing from document", insertion.placeholder);
                None
            }
        })
        .collect();
    anchored.sort_by_key(|(offset, _)| *offset);

    let extra: usize = anchored.iter().map(|(_, i)| i.block.len() + 1).sum();
    let mut html = String::with_capacity(document.len() + extra);
    let mut anchors = Vec::with_capacity(anchored.len());
    let mut cursor = 0;
    for (offset, insertion) in anchored {
        let start = offset - insertion.placeholder.len();
        html.push_str(&document[cursor..start]);
        let anchor_start = html.len();
        html.push_str(&insertion.placeholder);
        html.push('\n');
        anchors.push(anchor_start..html.len());
        html.push_str(&insertion.block);
        cursor = offset;
    }
    html.push_str(&document[cursor..]);
    InlinedDocument { html, anchors }
}
