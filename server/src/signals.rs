use futures_util::stream::StreamExt;
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::iterator::Handle;
use signal_hook_tokio::Signals;
use std::future::Future;
use std::io;
use std::pin::Pin;

/// Resolves with the first termination signal the process receives, or `None`
/// once the returned handle is closed.
pub fn get_signals_fut() -> io::Result<(Pin<Box<impl Future<Output = Option<i32>>>>, Handle)> {
    let signals = Signals::new(TERM_SIGNALS)?;
    let handle = signals.handle();
    let fut = async move { signals.fuse().next().await };
    Ok((Box::pin(fut), handle))
}
