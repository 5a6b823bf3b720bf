use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use conkie::reload::watch_theme;
use conkie::{
    reload_channel, run_reloads, Loader, LoaderConfig, ReloadEvent, WindowConfig,
    WindowOverrides,
};
use serde::Serialize;
use tokio::sync::mpsc;

/// Render a Conkie HTML theme into a single self-contained document
#[derive(Parser, Debug)]
#[command(name = "conkie", version)]
struct Cli {
    /// Theme file, theme directory or installed theme package name
    #[arg(short, long, value_name = "THEME")]
    theme: Option<String>,

    /// Config file (default: <config dir>/conkie/config.json)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use a regular framed window and expose debugMode to the theme
    #[arg(short, long)]
    debug: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Re-render whenever the theme directory changes
    #[arg(short, long)]
    watch: bool,

    /// Application root, exposed to themes as paths.root
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Extra global package directory (repeatable)
    #[arg(long = "package-dir", value_name = "DIR")]
    package_dirs: Vec<PathBuf>,

    /// Window X position
    #[arg(long, allow_negative_numbers = true)]
    x: Option<i32>,

    /// Window Y position
    #[arg(long, allow_negative_numbers = true)]
    y: Option<i32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Window type hint (desktop, dock, normal, ...)
    #[arg(long = "window-type", value_name = "TYPE")]
    window_type: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long, value_name = "BOOL")]
    transparent: Option<bool>,
}

impl Cli {
    fn window_overrides(&self) -> WindowOverrides {
        WindowOverrides {
            window_type: self.window_type.clone(),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            transparent: self.transparent,
            title: self.title.clone(),
        }
    }
}

/// One line of JSON on stdout per event, for the host process.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum HostMessage<'a> {
    Loaded {
        path: &'a Path,
        window: &'a WindowConfig,
    },
    Reload {
        path: &'a Path,
        window: &'a WindowConfig,
    },
    ReloadFailed {
        error: String,
    },
}

fn emit(message: &HostMessage<'_>) -> Result<()> {
    let line = serde_json::to_string(message).context("Failed to encode host message")?;
    println!("{}", line);
    Ok(())
}

fn build_config(cli: &Cli) -> Result<LoaderConfig> {
    let mut config = match cli.config {
        Some(ref path) => LoaderConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => match LoaderConfig::default_path().filter(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Using config {:?}", path);
                LoaderConfig::load_from_file(&path)
                    .with_context(|| format!("Failed to load config {:?}", path))?
            }
            None => LoaderConfig::default(),
        },
    };

    if let Some(ref root) = cli.root {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("Application root {:?} does not exist", root))?;
        if config.theme == LoaderConfig::default_theme(&config.app_root) {
            config.theme = LoaderConfig::default_theme(&root);
        }
        config.app_root = root;
    }
    if let Some(ref theme) = cli.theme {
        config.theme = theme.clone();
    }
    config.debug |= cli.debug;
    config.watch |= cli.watch;
    config.package_dirs.extend(cli.package_dirs.iter().cloned());
    config.window.merge(&cli.window_overrides());

    Ok(config)
}

async fn run(config: LoaderConfig) -> Result<()> {
    let watch = config.watch;
    let loader = Arc::new(Loader::new(config));

    let loaded = loader.load().await.context("Failed to load theme")?;

    if !watch {
        let path = loader
            .keep_output()
            .await
            .context("Failed to keep rendered theme")?;
        return emit(&HostMessage::Loaded {
            path: &path,
            window: &loaded.window,
        });
    }

    emit(&HostMessage::Loaded {
        path: &loaded.document.path,
        window: &loaded.window,
    })?;

    let (handle, queue) = reload_channel();
    let _watcher = watch_theme(&loaded.theme.theme_dir, handle)?;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let reloads = tokio::spawn(run_reloads(Arc::clone(&loader), queue, events_tx));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ReloadEvent::Reloaded(loaded)) => emit(&HostMessage::Reload {
                    path: &loaded.document.path,
                    window: &loaded.window,
                })?,
                Some(ReloadEvent::Failed(e)) => emit(&HostMessage::ReloadFailed {
                    error: e.to_string(),
                })?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    reloads.abort();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    conkie::tracing_setup::init(cli.verbose);

    let config = build_config(&cli)?;
    tracing::debug!("Loader config: {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(config))
}
