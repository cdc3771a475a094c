//! File system watcher driving incremental rebuilds.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Event Loop                              │
//! │                                                              │
//! │  ┌──────────┐    ┌──────────┐    ┌────────────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│    handle_changes()    │  │
//! │  │ events   │    │          │    │                        │  │
//! │  └──────────┘    └──────────┘    │  content ──► rebuild() │  │
//! │                                  │  assets  ──► copy      │  │
//! │                                  └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A batch of content changes runs as one build pass, so a listing shared by
//! several changed posts is regenerated once. Ctrl+C lets the pass in flight
//! finish, then persists state and exits.

use crate::{
    assets::copy_assets,
    build::{BuildContext, Outcome},
    content::relative_key,
    log,
    logger::WatchStatus,
    menu::is_menu_path,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::RecvTimeoutError,
    },
    time::{Duration, Instant},
};

/// How often the loop checks for Ctrl+C while idle.
const IDLE_POLL_MS: u64 = 200;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Content keys of the changed paths under `content_dir`.
///
/// Directories are dropped; vanished files are kept so the pass retires them.
/// Menu files are read once at startup, so their changes are only logged.
fn content_keys(paths: &[PathBuf], content_dir: &Path) -> Vec<String> {
    let mut keys: Vec<String> = paths
        .iter()
        .filter(|p| !p.is_dir())
        .filter_map(|p| relative_key(p, content_dir))
        .filter(|key| {
            let menu = is_menu_path(key);
            if menu {
                log!("watch"; "{key} changed, menus reload on restart");
            }
            !menu
        })
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events until a quiet period passes.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    quiet: Duration,
}

impl Debouncer {
    fn new(quiet: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            quiet,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty() && self.last_event.is_some_and(|t| t.elapsed() >= self.quiet)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_millis(IDLE_POLL_MS)
        } else {
            self.quiet
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Rebuild the content touched by `paths` and recopy changed assets.
fn handle_changes(paths: &[PathBuf], ctx: &mut BuildContext, status: &mut WatchStatus) {
    let build = &ctx.config().build;
    let (content, other): (Vec<PathBuf>, Vec<PathBuf>) =
        paths.iter().cloned().partition(|p| build.is_content(p));
    let keys = content_keys(&content, &build.content);

    if !other.is_empty()
        && let Err(err) = copy_assets(ctx.config())
    {
        status.error("asset copy failed", &format!("{err:#}"));
        status.detach();
    }

    if keys.is_empty() {
        return;
    }

    let report = ctx.rebuild(&keys);
    let trigger = keys.join(", ");
    if report.has_failures() {
        let detail = report
            .errors
            .failures()
            .map(|(path, err)| format!("{path}: {err}"))
            .chain(report.state_error.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("\n");
        status.error(&format!("{trigger} failed"), &detail);
    } else {
        status.success(&format!("{trigger} ({} generated)", report.count(Outcome::Generated)));
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

fn setup_watchers(watcher: &mut impl Watcher, ctx: &BuildContext) -> Result<()> {
    let config = ctx.config();
    let root = config.get_root();
    let dirs = [&config.build.content, &config.build.assets];

    let mut watched = Vec::new();
    for dir in dirs.into_iter().filter(|d| d.is_dir()) {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        watched.push(format!("{}/", dir.strip_prefix(root).unwrap_or(dir).display()));
    }

    log!("watch"; "watching {}", watched.join(", "));
    Ok(())
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Watch the site and rebuild on changes until Ctrl+C.
pub fn watch_for_changes_blocking(ctx: &mut BuildContext) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to set Ctrl+C handler")?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, ctx)?;

    let mut debouncer = Debouncer::new(Duration::from_millis(ctx.config().watch.debounce_ms));
    let mut status = WatchStatus::new();

    while !shutdown.load(Ordering::SeqCst) {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&debouncer.take(), ctx, &mut status);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    status.detach();
    log!("watch"; "shutting down...");
    ctx.flush().context("Failed to persist build state")?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
