//! Moves messages produced on the Tokio runtime,
//! or on foreign threads, onto the glib main context
//! where the desktop model and tracker live.

use crate::spawn;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{trace, warn};

pub trait AsyncSenderExt<T>: Sync + Send + Sized + Clone {
    /// Sends a message, panicking if the receiver has gone.
    fn send_expect(&self, message: T) -> impl Future<Output = ()> + Send;

    /// Sends a message from a task on the Tokio runtime.
    ///
    /// Returns *before* the message is sent.
    /// Can be called from threads outside the runtime,
    /// such as signal handlers and file watcher callbacks.
    #[inline]
    fn send_spawn(&self, message: T)
    where
        Self: 'static,
        T: Send + 'static,
    {
        let tx = self.clone();
        spawn(async move { tx.send_expect(message).await });
    }
}

impl<T: Send> AsyncSenderExt<T> for mpsc::Sender<T> {
    #[inline]
    async fn send_expect(&self, message: T) {
        self.send(message)
            .await
            .expect(crate::error::ERR_CHANNEL_SEND);
    }
}

pub trait GlibReceiverExt<T: 'static>: Sized + 'static {
    /// Waits for the next message.
    /// Resolves to `None` once every sender has gone.
    fn next_message(&mut self) -> impl Future<Output = Option<T>>;

    /// Spawns a future on the main context
    /// which passes each message to `f` until the channel closes.
    ///
    /// The default main context must be owned by the calling thread.
    fn recv_glib<F>(mut self, mut f: F)
    where
        F: FnMut(T) + 'static,
    {
        glib::spawn_future_local(async move {
            while let Some(message) = self.next_message().await {
                f(message);
            }

            trace!("Channel closed");
        });
    }
}

impl<T: 'static> GlibReceiverExt<T> for mpsc::Receiver<T> {
    async fn next_message(&mut self) -> Option<T> {
        self.recv().await
    }
}

impl<T: Clone + 'static> GlibReceiverExt<T> for broadcast::Receiver<T> {
    async fn next_message(&mut self) -> Option<T> {
        loop {
            match self.recv().await {
                Ok(message) => return Some(message),
                // snapshots are complete, so the next one received repairs any skipped state
                Err(RecvError::Lagged(count)) => {
                    warn!("Channel lagged behind by {count}, skipping stale updates");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
