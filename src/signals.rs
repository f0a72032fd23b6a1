/// Signal handling for the watcher's host loop.
///
/// Ctrl-C and SIGTERM request a graceful shutdown: the in-flight cycle, if
/// any, is allowed to finish. SIGHUP asks for the config file to be re-read.
use tokio::sync::mpsc;

/// What the host loop should do in response to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Shutdown,
    Reload,
}

pub struct SignalHandler {
    rx: mpsc::Receiver<SignalAction>,
}

impl SignalHandler {
    /// Install the OS signal listeners. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<SignalHandler> {
        let (tx, rx) = mpsc::channel(8);

        let ctrl_c = tx.clone();
        tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    break;
                }
                tracing::info!("interrupt received, shutting down after current cycle");
                if ctrl_c.send(SignalAction::Shutdown).await.is_err() {
                    break;
                }
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut term = signal(SignalKind::terminate())?;
            let on_term = tx.clone();
            tokio::spawn(async move {
                while term.recv().await.is_some() {
                    tracing::info!("SIGTERM received, shutting down after current cycle");
                    if on_term.send(SignalAction::Shutdown).await.is_err() {
                        break;
                    }
                }
            });

            let mut hup = signal(SignalKind::hangup())?;
            tokio::spawn(async move {
                while hup.recv().await.is_some() {
                    tracing::info!("SIGHUP received, reloading config");
                    if tx.send(SignalAction::Reload).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(SignalHandler { rx })
    }

    /// A handler fed by the given channel instead of OS signals.
    pub fn from_channel(rx: mpsc::Receiver<SignalAction>) -> SignalHandler {
        SignalHandler { rx }
    }

    /// Next requested action. Resolves to `Shutdown` if every sender is gone.
    pub async fn recv(&mut self) -> SignalAction {
        self.rx.recv().await.unwrap_or(SignalAction::Shutdown)
    }
}
