use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use strum_macros::Display;
use tracing::{info, instrument, warn};

use crate::cli::command::parse_duration;
use crate::cli::painter::Painter;
use crate::transport::{ConnectionState, Transport};

/// Arguments for the `watch` command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this long instead of waiting for Ctrl+C (e.g. `30s`).
    #[arg(long = "for", value_parser = parse_duration)]
    duration: Option<Duration>,
}

impl WatchArgs {
    #[must_use]
    pub fn new(duration: Option<Duration>) -> Self {
        Self { duration }
    }
}

/// Why a watch ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub(crate) enum WatchStopReason {
    Interrupted,
    Elapsed,
    /// The transport reported a terminal disconnect.
    LinkLost,
}

/// Totals printed when a watch ends.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct WatchSummary {
    pub(crate) stop_reason: WatchStopReason,
    pub(crate) disconnects: usize,
    pub(crate) reconnects: usize,
    pub(crate) final_state: ConnectionState,
}

fn counting_observer(counter: &Arc<AtomicUsize>, event: &'static str) -> crate::transport::Observer {
    let counter = Arc::clone(counter);
    Box::new(move || {
        let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!(event, seen, "connectivity event");
    })
}

async fn wait_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Resolves on the first interrupt. A handler that fails to install never resolves.
async fn wait_for_interrupt(interrupt: impl Future<Output = io::Result<()>>) {
    if let Err(error) = interrupt.await {
        warn!(?error, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Prints every connection state change of an already connected transport.
#[instrument(skip(transport, args, out), level = "info", fields(duration = ?args.duration))]
pub(crate) async fn run<W>(
    transport: &dyn Transport,
    args: &WatchArgs,
    use_colour: bool,
    out: &mut W,
) -> Result<WatchSummary>
where
    W: io::Write,
{
    watch_until(transport, args, use_colour, out, tokio::signal::ctrl_c()).await
}

async fn watch_until<W>(
    transport: &dyn Transport,
    args: &WatchArgs,
    use_colour: bool,
    out: &mut W,
    interrupt: impl Future<Output = io::Result<()>>,
) -> Result<WatchSummary>
where
    W: io::Write,
{
    let painter = Painter::new(use_colour);
    let disconnects = Arc::new(AtomicUsize::new(0));
    let reconnects = Arc::new(AtomicUsize::new(0));
    transport.on_disconnect(counting_observer(&disconnects, "disconnect"));
    transport.on_reconnect(counting_observer(&reconnects, "reconnect"));

    let mut states = transport.subscribe_state();
    let device = transport.device_name().unwrap_or_else(|| "unknown".to_string());
    writeln!(
        out,
        "{} {} via {} ({})",
        painter.heading("watching"),
        device,
        transport.mode(),
        painter.state(*states.borrow_and_update())
    )?;

    let deadline = wait_for(args.duration);
    let interrupted = wait_for_interrupt(interrupt);
    tokio::pin!(deadline, interrupted);
    let stop_reason = loop {
        tokio::select! {
            () = &mut interrupted => break WatchStopReason::Interrupted,
            () = &mut deadline => break WatchStopReason::Elapsed,
            changed = states.changed() => {
                if changed.is_err() {
                    break WatchStopReason::LinkLost;
                }
                let state = *states.borrow_and_update();
                writeln!(out, "{} {}", painter.muted("state"), painter.state(state))?;
                if state == ConnectionState::Disconnected {
                    break WatchStopReason::LinkLost;
                }
            }
        }
    };

    let summary = WatchSummary {
        stop_reason,
        disconnects: disconnects.load(Ordering::SeqCst),
        reconnects: reconnects.load(Ordering::SeqCst),
        final_state: transport.state(),
    };
    writeln!(
        out,
        "{} {} (disconnects: {}, reconnects: {})",
        painter.heading("stopped"),
        summary.stop_reason,
        summary.disconnects,
        summary.reconnects
    )?;
    Ok(summary)
}
