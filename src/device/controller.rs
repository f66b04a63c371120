//! Device controller: session state and the single command gate
//!
//! All public operations acquire one mutex for their full duration, so the
//! device command stream is effectively single-threaded even when callers
//! arrive concurrently. The underlying transport is not safe for
//! interleaved calls.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;

use crate::events::EventLog;
use crate::{Error, Result, codec};

use super::sim::simulated_entry;
use super::{ActionCommand, AntennaColor, DeviceLink, DiscoveredDevice, LinkMode, UploadMethod};

/// BLE discovery timeout
const SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Device name fragments that identify the toy during discovery
const NAME_PATTERNS: [&str; 3] = ["Furby", "Furby Connect", "BlueFur"];

/// Connection state for the single logical device
#[derive(Debug, Clone)]
pub struct DeviceSession {
    pub connected: bool,
    pub address: Option<String>,
    pub mode: LinkMode,
}

/// Owns the logical connection and serializes every command
pub struct DeviceController {
    link: Arc<dyn DeviceLink>,
    session: Mutex<DeviceSession>,
    preferred_address: Option<String>,
    log: EventLog,
}

impl DeviceController {
    /// Create a controller over the given link
    #[must_use]
    pub fn new(
        link: Arc<dyn DeviceLink>,
        mode: LinkMode,
        preferred_address: Option<String>,
        log: EventLog,
    ) -> Self {
        Self {
            link,
            session: Mutex::new(DeviceSession {
                connected: false,
                address: None,
                mode,
            }),
            preferred_address,
            log,
        }
    }

    /// Snapshot of the current session state
    pub async fn session(&self) -> DeviceSession {
        self.session.lock().await.clone()
    }

    /// Discover nearby toys
    ///
    /// Filters discovery results by known name patterns. In simulated mode
    /// a canonical fake entry is synthesized when the filtered set is empty
    /// so the rest of the pipeline always has something to connect to.
    ///
    /// # Errors
    ///
    /// Never fails on discovery errors (they are logged and treated as an
    /// empty result).
    pub async fn scan(&self) -> Result<Vec<DiscoveredDevice>> {
        let session = self.session.lock().await;

        if session.connected {
            self.log.add(
                "[scan] WARNING: device is connected; connected devices may not appear in scan",
            );
        }

        self.log.add("[scan] searching for BLE devices...");
        let devices = match self.link.discover(SCAN_TIMEOUT).await {
            Ok(devices) => {
                self.log
                    .add(format!("[scan] {} BLE devices found", devices.len()));
                devices
            }
            Err(e) => {
                self.log.add(format!("[scan] discovery failed: {e}"));
                Vec::new()
            }
        };

        let mut items: Vec<DiscoveredDevice> = devices
            .into_iter()
            .filter(|d| NAME_PATTERNS.iter().any(|p| d.name.contains(p)))
            .collect();

        if session.mode == LinkMode::Simulated && items.is_empty() {
            items.push(simulated_entry());
        }

        self.log.add(format!("[scan] toys found: {}", items.len()));
        for item in &items {
            self.log
                .add(format!("[scan]   - {} @ {}", item.name, item.address));
        }

        Ok(items)
    }

    /// Connect to the toy
    ///
    /// Address resolution: explicit argument, then the preconfigured
    /// preferred address, then link self-discovery. There is deliberately no
    /// already-connected guard; the link is idempotent by assumption.
    ///
    /// # Errors
    ///
    /// Propagates link connect failures.
    pub async fn connect(&self, address: Option<&str>) -> Result<()> {
        let mut session = self.session.lock().await;

        let resolved = address.or(self.preferred_address.as_deref());
        let connected_address = self.link.connect(resolved).await?;

        session.connected = true;
        session.address = Some(connected_address);
        Ok(())
    }

    /// Disconnect from the toy, best-effort
    ///
    /// A failed link teardown is logged and the local session is force-
    /// cleared anyway; the consistent local invariant matters more than the
    /// transport error. Never fails, including when already disconnected.
    pub async fn disconnect(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        if session.connected {
            if let Err(e) = self.link.disconnect().await {
                self.log.add(format!("[disconnect] link error: {e}"));
            }
        }

        session.connected = false;
        session.address = None;
        Ok(())
    }

    /// Disconnect (best-effort) and unconditionally clear session state
    ///
    /// Recovery action for when scan/connect get stuck on a stale
    /// connected flag.
    pub async fn reset(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        if session.connected {
            if let Err(e) = self.link.disconnect().await {
                self.log.add(format!("[reset] link error: {e}"));
            }
        }

        session.connected = false;
        session.address = None;
        self.log.add("[reset] session state cleared");
        Ok(())
    }

    /// Set the antenna LED color
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when any channel falls outside [0, 255]; the
    /// device is never touched in that case.
    pub async fn set_antenna_color(&self, r: i32, g: i32, b: i32) -> Result<()> {
        let color = AntennaColor::new(r, g, b)?;
        let _session = self.session.lock().await;
        self.link.set_antenna_color(color).await
    }

    /// Trigger one built-in action cell, forwarded verbatim
    ///
    /// # Errors
    ///
    /// Propagates link failures; the device is the authority on whether the
    /// tuple is meaningful.
    pub async fn trigger_action(&self, cmd: ActionCommand) -> Result<()> {
        let _session = self.session.lock().await;
        self.link.trigger_action(cmd).await
    }

    /// Upload and play an audio file on the toy
    ///
    /// Ensures container form first, then tries the ranked upload methods
    /// in order; any temporary container file is deleted on every exit
    /// path.
    ///
    /// # Errors
    ///
    /// `NotFound` when the file is absent, `NotConnected` without an active
    /// session, `TransportExhausted` when every upload method failed.
    pub async fn play_audio(&self, path: &Path) -> Result<()> {
        let session = self.session.lock().await;

        if !path.exists() {
            return Err(Error::NotFound(format!("file not found: {}", path.display())));
        }
        if !session.connected {
            return Err(Error::NotConnected(
                "connect to the toy before playing audio".to_string(),
            ));
        }

        self.log
            .add(format!("[audio] loading {}...", path.display()));

        let container = codec::ensure_container(path)?;
        let is_temp = container != path;
        if is_temp {
            self.log.add(format!(
                "[audio] converted to container form: {}",
                container.display()
            ));
        } else {
            self.log.add("[audio] file already in container form");
        }

        let result = self.try_upload(&container).await;

        if is_temp {
            if let Err(e) = std::fs::remove_file(&container) {
                self.log
                    .add(format!("[audio] temp cleanup failed: {e}"));
            }
        }

        result
    }

    /// Try each ranked upload method until one succeeds
    async fn try_upload(&self, container: &Path) -> Result<()> {
        let mut failures = Vec::new();

        for method in UploadMethod::RANKED {
            self.log
                .add(format!("[audio] trying {}...", method.name()));
            match self.link.upload_audio(method, container).await {
                Ok(()) => {
                    self.log
                        .add(format!("[audio] audio sent via {}", method.name()));
                    return Ok(());
                }
                Err(e) => {
                    self.log
                        .add(format!("[audio] {} failed: {e}", method.name()));
                    failures.push(format!("  - {}: {e}", method.name()));
                }
            }
        }

        Err(Error::TransportExhausted(failures.join("\n")))
    }

    /// Trigger one gesture chosen uniformly from the curated table
    ///
    /// # Errors
    ///
    /// Propagates link failures.
    pub async fn random_action(&self) -> Result<ActionCommand> {
        let _session = self.session.lock().await;

        let cmd = ACTIONS[rand::thread_rng().gen_range(0..ACTIONS.len())];

        self.log.add(format!(
            "[random] action input={}, index={}, subindex={}, specific={}",
            cmd.input, cmd.index, cmd.subindex, cmd.specific
        ));
        self.link.trigger_action(cmd).await?;
        Ok(cmd)
    }
}

/// The curated table of known-good gesture tuples
#[must_use]
pub fn random_action_table() -> &'static [ActionCommand] {
    &ACTIONS
}

macro_rules! act {
    ($i:expr, $x:expr, $s:expr, $p:expr) => {
        ActionCommand::new($i, $x, $s, $p)
    };
}

/// Known-good gesture/sound cells, grouped by the sensor that normally
/// triggers them on the device
static ACTIONS: [ActionCommand; 102] = [
    // Generic reactions (pets)
    act!(1, 0, 0, 0), act!(1, 0, 0, 1), act!(1, 0, 0, 3), act!(1, 0, 0, 4),
    act!(1, 0, 1, 3), act!(1, 0, 1, 4), act!(1, 0, 1, 5),
    act!(1, 2, 0, 0), act!(1, 2, 0, 1), act!(1, 2, 0, 2), act!(1, 2, 0, 3),
    act!(1, 3, 0, 5), act!(1, 3, 0, 6), act!(1, 3, 0, 10), act!(1, 3, 0, 12),
    // Tickles
    act!(2, 0, 0, 0), act!(2, 0, 0, 1), act!(2, 0, 0, 2), act!(2, 0, 0, 3),
    act!(2, 0, 1, 0), act!(2, 0, 1, 1), act!(2, 0, 1, 2), act!(2, 0, 1, 4),
    act!(2, 3, 0, 0), act!(2, 3, 0, 1), act!(2, 3, 0, 4), act!(2, 3, 0, 11),
    // Pull/squeeze
    act!(3, 0, 0, 0), act!(3, 0, 0, 3), act!(3, 0, 0, 4), act!(3, 0, 0, 5),
    act!(3, 3, 0, 0), act!(3, 3, 0, 1), act!(3, 3, 0, 4), act!(3, 3, 0, 9),
    // Hugs
    act!(5, 0, 0, 0), act!(5, 0, 1, 0), act!(5, 0, 1, 1), act!(5, 0, 1, 2),
    act!(5, 3, 0, 0), act!(5, 3, 0, 3), act!(5, 3, 0, 4),
    // Farts & burps
    act!(7, 0, 0, 0), act!(7, 0, 0, 1), act!(7, 0, 0, 2), act!(7, 0, 0, 4),
    act!(7, 1, 0, 0), act!(7, 1, 0, 3), act!(7, 3, 0, 1), act!(7, 3, 0, 6),
    // Conversation
    act!(8, 0, 0, 0), act!(8, 0, 0, 1), act!(8, 0, 0, 3), act!(8, 0, 0, 9),
    act!(8, 0, 1, 0), act!(8, 0, 1, 3), act!(8, 0, 1, 4), act!(8, 0, 1, 9),
    act!(8, 3, 0, 0), act!(8, 3, 0, 3), act!(8, 3, 0, 7), act!(8, 3, 0, 17),
    // Shaking
    act!(9, 0, 0, 1), act!(9, 0, 1, 0), act!(9, 0, 1, 2), act!(9, 0, 1, 3),
    act!(9, 3, 0, 0), act!(9, 3, 0, 3), act!(9, 3, 0, 4),
    // Upside down
    act!(10, 0, 1, 0), act!(10, 0, 1, 1), act!(10, 0, 1, 4), act!(10, 0, 1, 6),
    act!(10, 3, 0, 0), act!(10, 3, 0, 4), act!(10, 3, 0, 6),
    // Hiccup/burp
    act!(16, 0, 0, 0), act!(16, 0, 2, 0), act!(16, 0, 2, 1), act!(16, 0, 2, 3),
    // Singing/dancing
    act!(17, 0, 0, 0), act!(17, 0, 0, 1), act!(17, 0, 0, 4), act!(17, 0, 0, 5),
    act!(17, 3, 0, 0), act!(17, 3, 0, 1), act!(17, 3, 0, 4), act!(17, 3, 0, 5),
    // Music reaction
    act!(18, 0, 1, 0), act!(18, 0, 1, 1), act!(18, 0, 1, 3), act!(18, 0, 1, 6),
    // Loud noise
    act!(20, 0, 0, 0), act!(20, 0, 0, 1), act!(20, 0, 0, 6),
    // Bored
    act!(24, 2, 0, 0), act!(24, 2, 0, 1), act!(24, 2, 0, 2), act!(24, 2, 1, 0),
    act!(24, 3, 0, 0), act!(24, 3, 0, 2), act!(24, 3, 0, 6),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_table_has_curated_entries() {
        assert_eq!(ACTIONS.len(), 102);
        // Spot-check a few groups
        assert!(ACTIONS.contains(&ActionCommand::new(1, 0, 0, 0)));
        assert!(ACTIONS.contains(&ActionCommand::new(17, 3, 0, 5)));
        assert!(ACTIONS.contains(&ActionCommand::new(24, 3, 0, 6)));
    }
}
