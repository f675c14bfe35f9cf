use super::BackgroundSink;
use crate::block_on;
use color_eyre::eyre::WrapErr;
use color_eyre::{Help, Report, Result};
use gio::prelude::*;
use swayipc_async::Connection;
use tokio::sync::Mutex;
use tracing::debug;

/// Sets the wallpaper with sway's `output <name> bg <file> <mode>` command.
///
/// Keys are output names, or `*` for every output.
pub struct SwaySink {
    connection: Mutex<Connection>,
    mode: String,
}

impl std::fmt::Debug for SwaySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwaySink")
            .field("connection", &"Connection")
            .field("mode", &self.mode)
            .finish()
    }
}

impl SwaySink {
    pub fn new(mode: &str) -> Result<Self> {
        let connection = block_on(Connection::new())
            .wrap_err("Failed to connect to sway IPC")
            .suggestion("Make sure sway is running and `SWAYSOCK` is set")?;

        Ok(Self {
            connection: Mutex::new(connection),
            mode: mode.to_string(),
        })
    }
}

impl BackgroundSink for SwaySink {
    fn set_string(&self, output: &str, uri: &str) -> Result<()> {
        let command = bg_command(output, uri, &self.mode)?;
        debug!("Running sway command: {command}");

        block_on(async {
            let mut connection = self.connection.lock().await;

            for outcome in connection.run_command(&command).await? {
                outcome?;
            }

            Ok(())
        })
    }
}

/// Builds the command setting `uri` as the wallpaper of `output`.
/// sway only loads local files, so `uri` must be a `file://` URI.
pub fn bg_command(output: &str, uri: &str, mode: &str) -> Result<String> {
    let path = gio::File::for_uri(uri).path().ok_or_else(|| {
        Report::msg(format!("Wallpaper '{uri}' is not a local file"))
            .suggestion("Use an absolute path when setting the background through sway")
    })?;

    Ok(format!(
        "output {} bg {} {mode}",
        quote(output),
        quote(&path.to_string_lossy())
    ))
}

fn quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_for_every_output() {
        assert_eq!(
            bg_command("*", "file:///walls/busy.png", "fill").expect("local file"),
            r#"output "*" bg "/walls/busy.png" fill"#
        );
    }

    #[test]
    fn command_decodes_and_quotes_path() {
        assert_eq!(
            bg_command("eDP-1", "file:///walls/my%20%22best%22.png", "fit").expect("local file"),
            r#"output "eDP-1" bg "/walls/my \"best\".png" fit"#
        );
    }

    #[test]
    fn remote_uri_is_rejected() {
        assert!(bg_command("*", "https://example.com/wall.png", "fill").is_err());
    }
}
