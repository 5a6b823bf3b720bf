//! Template variable substitution for rendered themes.
//!
//! Themes are authored as EJS-style templates. Only output tags naming one of
//! the known variables are evaluated:
//!
//! | Tag                    | Value                                   |
//! |------------------------|-----------------------------------------|
//! | `<%= paths.root %>`    | `file://` URL of the application root   |
//! | `<%= paths.theme %>`   | `file://` URL of the theme directory    |
//! | `<%= paths.modules %>` | `file://` URL of the app `node_modules` |
//! | `<%= debugMode %>`     | `true` / `false`                        |
//!
//! `<%- ... %>` behaves the same. Anything else is left in place.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

use crate::theme::{InlinedDocument, ResolvedTheme};

static OUTPUT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<%[=-]\s*(?P<expr>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*%>")
        .expect("template tag pattern is valid")
});

/// Values available to theme templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub root_url: String,
    pub theme_url: String,
    pub modules_url: String,
    pub debug: bool,
}

impl TemplateContext {
    pub fn new(app_root: &Path, theme: &ResolvedTheme, debug: bool) -> Self {
        Self {
            root_url: file_url(app_root),
            theme_url: file_url(&theme.theme_dir),
            modules_url: file_url(&app_root.join("node_modules")),
            debug,
        }
    }

    fn lookup(&self, expr: &str) -> Option<String> {
        match expr {
            "paths.root" => Some(self.root_url.clone()),
            "paths.theme" => Some(self.theme_url.clone()),
            "paths.modules" => Some(self.modules_url.clone()),
            "debugMode" => Some(self.debug.to_string()),
            _ => None,
        }
    }
}

/// `file://` URL for a path. Relative paths fall back to plain concatenation.
pub fn file_url(path: &Path) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", path.display()),
    }
}

/// Substitute known template variables in `document`.
pub fn render_template(document: &str, context: &TemplateContext) -> String {
    OUTPUT_TAG
        .replace_all(document, |caps: &Captures<'_>| {
            let expr = &caps["expr"];
            match context.lookup(expr) {
                Some(value) => value,
                None => {
                    tracing::warn!("Leaving unknown template expression {:?} in place", expr);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Render an inlined document, dropping its placeholder anchors.
///
/// Anchors are removed by position, so asset content that happens to contain
/// placeholder text is kept as it is.
pub fn render_document(inlined: &InlinedDocument, context: &TemplateContext) -> String {
    let mut output = String::with_capacity(inlined.html.len());
    let mut cursor = 0;
    for anchor in &inlined.anchors {
        output.push_str(&render_template(&inlined.html[cursor..anchor.start], context));
        cursor = anchor.end;
    }
    output.push_str(&render_template(&inlined.html[cursor..], context));
    output
}
