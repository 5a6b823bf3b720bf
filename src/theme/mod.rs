//! Theme module: locating a theme and turning its entry document into a
//! single self-contained HTML file.
//!
//! This module is split into:
//! - `types`: Pure data types (theme reference, resolved paths, asset markers)
//! - `locator`: Resolves a theme reference to an entry document
//! - `scanner`: Finds asset references and meta tags, substitutes placeholders
//! - `deps`: Reads theme scripts and rewrites their `require()` calls
//! - `inliner`: Reads asset contents and inserts them after their placeholders
//!
//! # Example
//!
//! ```ignore
//! use conkie::theme::{scan_document, AssetKind};
//!
//! let scan = scan_document(r#"<link rel="stylesheet" href="<%=paths.modules%>/font-awesome/css/font-awesome.css">"#);
//! assert_eq!(scan.markers[0].kind, AssetKind::RemoteStyle);
//! assert_eq!(scan.document, "<!-- CSS FOR [font-awesome/css/font-awesome.css] -->");
//! ```

pub mod deps;
mod inliner;
mod locator;
mod scanner;
mod types;

pub use inliner::*;
pub use locator::*;
pub use scanner::*;
pub use types::*;
