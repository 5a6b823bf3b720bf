//! Error type shared by every phase of the theme loader.
//!
//! Every variant is fatal to the pipeline run that produced it. Each one
//! carries the identifier (path, package, asset) that triggered it so the
//! message is actionable on its own.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the loader.
pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The theme reference is neither an existing file, a theme directory
    /// nor an installed package.
    #[error("cannot find theme \"{reference}\" (not a file, theme directory or installed package)")]
    ThemeNotFound { reference: String },

    /// The entry document exists but could not be read.
    #[error("cannot read theme document {}: {source}", path.display())]
    ThemeUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A `<%=paths.theme%>` script could not be read.
    #[error("cannot read theme script {}: {source}", path.display())]
    LocalAssetUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file inside a resolved package could not be read.
    #[error("cannot read \"{file}\" from package \"{package}\" ({}): {source}", path.display())]
    RemoteAssetUnreadable {
        package: String,
        file: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A package named by the theme is not installed anywhere on the search path.
    #[error("cannot find package \"{name}\" required by {required_by}")]
    PackageNotFound { name: String, required_by: String },

    /// The package lookup itself failed (unreadable search directory, etc).
    #[error("package lookup failed: {0}")]
    PackageLookupFailed(String),

    /// The rendered document could not be persisted.
    #[error("cannot write rendered theme to {}: {source}", path.display())]
    RenderWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The filesystem watcher could not be started.
    #[error("cannot watch {}: {message}", path.display())]
    Watch { path: PathBuf, message: String },
}
