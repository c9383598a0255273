use std::io::Write;

use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, FmtSubscriber, fmt::MakeWriter};

/// Lines kept for slow `/api/logs` subscribers before they see a lag marker.
pub(crate) const LOG_CHANNEL_CAPACITY: usize = 500;

/// Tees every formatted log event to stdout and to the `/api/logs` channel.
#[derive(Clone)]
pub(crate) struct LogTee {
    tx: broadcast::Sender<String>,
    echo_stdout: bool,
}

impl LogTee {
    pub(crate) fn new(tx: broadcast::Sender<String>, echo_stdout: bool) -> Self {
        Self { tx, echo_stdout }
    }
}

impl<'a> MakeWriter<'a> for LogTee {
    type Writer = EventBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        EventBuffer {
            tee: self.clone(),
            buf: Vec::with_capacity(256),
        }
    }
}

/// One writer per event; the buffered line is published on drop so a
/// subscriber never sees half an event.
pub(crate) struct EventBuffer {
    tee: LogTee,
    buf: Vec<u8>,
}

impl Write for EventBuffer {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for EventBuffer {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if self.tee.echo_stdout {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(&self.buf);
            let _ = out.flush();
        }
        let line = String::from_utf8_lossy(&self.buf).trim_end().to_string();
        // Err only means nobody is listening.
        let _ = self.tee.tx.send(line);
    }
}

/// `RUST_LOG` if set, `info` otherwise.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber and returns the sender feeding `/api/logs`.
pub(crate) fn init_tracing(suppress_stdout: bool) -> broadcast::Sender<String> {
    let (log_tx, _) = broadcast::channel::<String>(LOG_CHANNEL_CAPACITY);

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(LogTee::new(log_tx.clone(), !suppress_stdout))
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    log_tx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_is_published_once_when_writer_drops() {
        let (tx, mut rx) = broadcast::channel(4);
        let tee = LogTee::new(tx, false);
        {
            let mut writer = tee.make_writer();
            writer.write_all(b"[Sync] Bot status: ").unwrap();
            writer.write_all(b"idle\n").unwrap();
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(rx.try_recv().unwrap(), "[Sync] Bot status: idle");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn empty_writer_publishes_nothing() {
        let (tx, mut rx) = broadcast::channel::<String>(4);
        drop(LogTee::new(tx, false).make_writer());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn writer_without_subscribers_still_succeeds() {
        let (tx, _) = broadcast::channel::<String>(4);
        let mut writer = LogTee::new(tx, false).make_writer();
        assert_eq!(writer.write(b"hello").unwrap(), 5);
    }
}
