//! Console sessions: a live watch loop, one-off resolution and captions

use crate::config::Config;
use anyhow::{Context, Result};
use pulse_data::{
    CaptionFeed, CaptionStatus, EndpointResolver, HttpClient, Resolution, ViewCommand,
    ViewController, ViewHandle, ViewSnapshot, ViewStatus,
};
use pulse_renderer::{svg, ChartFrame, ChartLayout};
use pulse_shared::{Metadata, SeriesKind};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub kind: SeriesKind,
    pub preset: Option<String>,
    /// Rewritten with the current chart after every change
    pub svg: Option<PathBuf>,
    /// Unmount after this long
    pub duration: Option<Duration>,
}

/// Map one console line to a view command
pub fn parse_command(line: &str) -> Option<ViewCommand> {
    match line.trim() {
        "" => None,
        "retry" => Some(ViewCommand::Retry),
        "quit" | "exit" => Some(ViewCommand::Unmount),
        preset => Some(ViewCommand::Select(preset.to_string())),
    }
}

/// SVG document for the snapshot's current state
pub fn render_snapshot(snapshot: &ViewSnapshot, layout: &ChartLayout) -> String {
    let frame = ChartFrame::build(
        snapshot.metadata.as_ref(),
        &snapshot.points,
        snapshot.kind,
        *layout,
    );
    svg::render_document(&frame, layout)
}

/// One-line console summary
pub fn describe(snapshot: &ViewSnapshot) -> String {
    let status = match snapshot.status {
        ViewStatus::Connecting => "connecting".to_string(),
        ViewStatus::NoDataSource => "no data source".to_string(),
        ViewStatus::Live(state) => format!("{:?}", state).to_lowercase(),
    };
    let latest = snapshot
        .points
        .last()
        .map(|s| format!(" latest t={:.1}", s.elapsed))
        .unwrap_or_default();
    format!(
        "[{}] {} selection={} points={}{}",
        snapshot.kind.as_str(),
        status,
        snapshot.selection.as_deref().unwrap_or("-"),
        snapshot.points.len(),
        latest
    )
}

/// Mount a view and follow it until `quit`, ctrl-c or the optional duration.
pub async fn watch(config: &Config, options: WatchOptions) -> Result<ViewSnapshot> {
    let client = Arc::new(HttpClient::new(config.http_config())?);
    let (controller, handle) = ViewController::new(
        config.view_config(options.kind, options.preset.clone()),
        client.clone(),
        client,
    );
    let task = controller.spawn();
    let layout = config.layout();

    let mut console = spawn_console_reader();
    let mut snapshots = handle.subscribe();
    let deadline = sleep_for(options.duration);
    tokio::pin!(deadline);

    let mut last_line = String::new();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                report(&snapshot, &mut last_line);
                write_svg(options.svg.as_ref(), &snapshot, &layout).await?;
                if snapshot.closed {
                    break;
                }
            }
            Some(command) = console.recv() => {
                debug!("Console command {:?}", command);
                forward(&handle, command).await;
            }
            _ = &mut deadline => {
                info!("Watch duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    // the controller may already be gone after `quit`
    let _ = handle.unmount().await;
    drop(handle);
    let last = task.await.context("view controller task failed")?;
    write_svg(options.svg.as_ref(), &last, &layout).await?;
    info!("{}", describe(&last));
    Ok(last)
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub kind: SeriesKind,
    pub candidates: Vec<String>,
    pub base: Option<String>,
    pub metadata: Option<Metadata>,
    pub failures: Vec<String>,
}

/// Resolve the metadata document once and report where it came from
pub async fn resolve(config: &Config, kind: SeriesKind) -> Result<ResolveReport> {
    let client = Arc::new(HttpClient::new(config.http_config())?);
    let candidates = config.endpoint_set().metadata_candidates(kind);
    let resolution: Resolution<Metadata> = EndpointResolver::new(client)
        .resolve(&candidates, kind.metadata_resource())
        .await;

    let report = match resolution {
        Resolution::Resolved(resolved) => ResolveReport {
            kind,
            candidates,
            base: Some(resolved.base),
            metadata: Some(resolved.value),
            failures: Vec::new(),
        },
        Resolution::NoService { failures } => ResolveReport {
            kind,
            candidates,
            base: None,
            metadata: None,
            failures: failures
                .into_iter()
                .map(|f| format!("{}: {}", f.url, f.error))
                .collect(),
        },
    };
    Ok(report)
}

/// Regenerate `count` captions, printing each as it arrives
pub async fn captions(config: &Config, count: usize) -> Result<CaptionFeed> {
    let client = Arc::new(HttpClient::new(config.http_config())?);
    let mut feed = CaptionFeed::new(client, &config.endpoint_set());

    for _ in 0..count {
        match feed.regenerate().await {
            CaptionStatus::Current(caption) => println!("{} ({})", caption.caption, caption.prob),
            status => println!("{}", status.text()),
        }
    }
    for saved in feed.history() {
        info!(
            "saved {} {}",
            saved.saved_at.format("%H:%M:%S"),
            saved.caption.caption
        );
    }
    Ok(feed)
}

fn report(snapshot: &ViewSnapshot, last_line: &mut String) {
    let line = describe(snapshot);
    // status line only changes with state, not every sample
    let key = line.split(" points=").next().unwrap_or_default().to_string();
    if key != *last_line {
        info!("{}", line);
        *last_line = key;
    } else {
        debug!("{}", line);
    }
}

async fn write_svg(path: Option<&PathBuf>, snapshot: &ViewSnapshot, layout: &ChartLayout) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    tokio::fs::write(path, render_snapshot(snapshot, layout))
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

async fn forward(handle: &ViewHandle, command: ViewCommand) {
    if let Err(e) = handle.send(command).await {
        warn!("Command dropped: {}", e);
    }
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Console lines are read on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_console_reader() -> mpsc::Receiver<ViewCommand> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if let Some(command) = parse_command(&line) {
                if tx.blocking_send(command).is_err() {
                    break;
                }
            }
        }
    });
    rx
}
