use tokio::sync::broadcast;
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Lines at WARN and above are copied onto this channel so the chat side can
/// relay them to the debug room.
#[derive(Clone)]
pub(crate) struct RelayMakeWriter {
    pub sender: broadcast::Sender<String>,
}

impl<'a> MakeWriter<'a> for RelayMakeWriter {
    type Writer = RelayWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RelayWriter {
            sender: self.sender.clone(),
        }
    }
}

pub(crate) struct RelayWriter {
    sender: broadcast::Sender<String>,
}

impl std::io::Write for RelayWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf).trim_end().to_string();
        if !msg.is_empty() {
            let _ = self.sender.send(msg); // Ignored if no receivers
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Installs the global subscriber: filtered stdout plus the WARN relay.
/// Only this crate's own events are relayed, so gateway noise never echoes
/// back into chat. Returns the relay sender so callers can subscribe.
pub(crate) fn init() -> broadcast::Sender<String> {
    let (sender, _) = broadcast::channel(256);

    let filter = EnvFilter::try_from_env("ECHOBOT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn,tracing=warn"));

    let stdout = fmt::layer().with_target(false).with_filter(filter);
    let relay = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .with_writer(RelayMakeWriter {
            sender: sender.clone(),
        })
        .with_filter(filter_fn(|meta| {
            *meta.level() <= Level::WARN && meta.target().starts_with("echobot")
        }));

    let _ = tracing_subscriber::registry()
        .with(stdout)
        .with(relay)
        .try_init();

    sender
}
