use crate::clients::compositor::DesktopUpdate;
use crate::clients::compositor::sway::fetch_snapshot;
use crate::desktop::DesktopSnapshot;
use crate::{lock, spawn};
use color_eyre::{Report, Result};
use futures_lite::StreamExt;
use std::sync::{Arc, Mutex};
use swayipc_async::{Connection, Event, EventStream, EventType};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace};

const EVENT_TYPES: [EventType; 3] = [EventType::Window, EventType::Workspace, EventType::Shutdown];

#[derive(Debug)]
pub struct Client {
    cache: Arc<SnapshotCache>,
}

impl Client {
    pub(crate) async fn new() -> Result<Self> {
        let mut connection = Connection::new().await?;
        info!("Sway IPC client connected");

        let snapshot = fetch_snapshot(&mut connection).await?;
        debug!(
            "Initial snapshot: {} workspace(s), active {:?}",
            snapshot.workspaces.len(),
            snapshot.active
        );

        // subscribing takes ownership, so queries need their own connection
        let events = Connection::new().await?.subscribe(EVENT_TYPES).await?;

        let cache = Arc::new(SnapshotCache::new(snapshot, 16));

        {
            let cache = cache.clone();

            spawn(async move {
                if let Err(err) = listen(connection, events, &cache).await {
                    error!("{:?}", err.wrap_err("Sway IPC connection lost"));
                    cache.shutdown();
                }
            });
        }

        Ok(Self { cache })
    }

    /// Creates a receiver which first gets the latest snapshot,
    /// then every subsequent update.
    pub fn subscribe_desktop(&self) -> broadcast::Receiver<DesktopUpdate> {
        self.cache.subscribe()
    }
}

/// The latest snapshot, and the channel snapshots are published on.
#[derive(Debug)]
struct SnapshotCache {
    tx: broadcast::Sender<DesktopUpdate>,
    _rx: broadcast::Receiver<DesktopUpdate>,
    latest: Mutex<DesktopSnapshot>,
}

impl SnapshotCache {
    fn new(snapshot: DesktopSnapshot, capacity: usize) -> Self {
        let (tx, rx) = broadcast::channel(capacity);

        Self {
            tx,
            _rx: rx,
            latest: Mutex::new(snapshot),
        }
    }

    /// Stores and publishes `snapshot`.
    /// Returns `false` if it equals the stored one.
    fn update(&self, snapshot: DesktopSnapshot) -> bool {
        let mut latest = lock!(self.latest);
        if *latest == snapshot {
            return false;
        }

        *latest = snapshot.clone();

        // sent while locked, so subscribers receive snapshots in the order they were stored
        self.publish(DesktopUpdate::Snapshot(snapshot));
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<DesktopUpdate> {
        let rx = self.tx.subscribe();

        let latest = lock!(self.latest);
        self.publish(DesktopUpdate::Snapshot(latest.clone()));

        rx
    }

    fn shutdown(&self) {
        self.publish(DesktopUpdate::Shutdown);
    }

    fn publish(&self, update: DesktopUpdate) {
        if self.tx.send(update).is_err() {
            debug!("No desktop subscribers");
        }
    }
}

/// Re-queries sway after every window or workspace event,
/// until sway shuts down or the event stream ends.
async fn listen(
    mut connection: Connection,
    mut events: EventStream,
    cache: &SnapshotCache,
) -> Result<()> {
    while let Some(event) = events.next().await {
        let event = event?;
        trace!("event: {:?}", event);

        match event {
            Event::Window(_) | Event::Workspace(_) => {
                let snapshot = fetch_snapshot(&mut connection).await?;

                if !cache.update(snapshot) {
                    trace!("Snapshot unchanged");
                }
            }
            Event::Shutdown(_) => {
                info!("Sway is shutting down");
                cache.shutdown();
                return Ok(());
            }
            _ => {}
        }
    }

    Err(Report::msg("Sway IPC event stream ended"))
}
