//! Conkie theme loader.
//!
//! Turns an HTML theme with references to package-hosted stylesheets and
//! scripts into one self-contained document, and re-renders it in place when
//! the theme changes on disk.

pub mod config;
pub mod error;
pub mod output;
pub mod packages;
pub mod pipeline;
pub mod reload;
pub mod render;
pub mod theme;

#[cfg(feature = "runtime")]
pub mod tracing_setup;

pub use config::{LoaderConfig, WindowConfig, WindowOverrides};
pub use error::{LoaderError, Result};
pub use output::OutputSlot;
pub use pipeline::{LoadedTheme, Loader, RenderedDocument};
pub use reload::{reload_channel, run_reloads, ReloadEvent, ReloadHandle, ReloadRequest};
