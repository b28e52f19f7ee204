use anyhow::{Context, Result};
use futures::future::select_all;
use log::warn;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancels `cancel` when the process receives SIGINT, SIGTERM, SIGHUP or SIGQUIT. A running step
/// is allowed to finish; the operation stops before the next one.
pub(crate) fn cancel_on_signal(cancel: CancellationToken) -> Result<()> {
    let kinds = [
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::hangup(),
        SignalKind::quit(),
    ];
    let mut streams = Vec::with_capacity(kinds.len());
    for kind in kinds {
        streams.push(signal(kind).context("Unable to listen for termination signals")?);
    }

    tokio::spawn(async move {
        let received = streams.iter_mut().map(|stream| Box::pin(stream.recv()));
        select_all(received).await;
        warn!("Received termination signal, stopping after the current step");
        cancel.cancel();
    });
    Ok(())
}
