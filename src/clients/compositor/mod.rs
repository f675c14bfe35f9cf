use crate::desktop::DesktopSnapshot;
use cfg_if::cfg_if;
use color_eyre::{Help, Report, Result};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

#[cfg(feature = "sway")]
pub mod sway;

pub enum Compositor {
    #[cfg(feature = "sway")]
    Sway,
    Unsupported,
}

impl Display for Compositor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                #[cfg(feature = "sway")]
                Self::Sway => "Sway",
                Self::Unsupported => "Unsupported",
            }
        )
    }
}

impl Compositor {
    /// Attempts to get the current compositor.
    /// This is done by checking system env vars.
    fn get_current() -> Self {
        if std::env::var("SWAYSOCK").is_ok() {
            cfg_if! {
                if #[cfg(feature = "sway")] { Self::Sway }
                else { tracing::error!("Not compiled with Sway support"); Self::Unsupported }
            }
        } else {
            Self::Unsupported
        }
    }

    /// Creates a new instance of
    /// the desktop client for the current compositor.
    pub async fn create_desktop_client() -> Result<Arc<dyn DesktopClient>> {
        let current = Self::get_current();
        debug!("Getting desktop client for: {current}");
        match current {
            #[cfg(feature = "sway")]
            Self::Sway => Ok(Arc::new(crate::clients::sway::Client::new().await?)),
            Self::Unsupported => Err(Report::msg("Unsupported compositor")
                .note("Currently window tracking is only supported by Sway")
                .suggestion("Make sure `SWAYSOCK` is set in the environment")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DesktopUpdate {
    /// The complete current state of workspaces and windows.
    /// The latest snapshot is re-sent when a new subscription is created.
    Snapshot(DesktopSnapshot),
    /// The compositor is exiting, or the connection to it was lost.
    Shutdown,
}

pub trait DesktopClient: Debug + Send + Sync {
    /// Creates a new desktop event receiver.
    fn subscribe(&self) -> broadcast::Receiver<DesktopUpdate>;
}
