//! Simulated device link
//!
//! Lets the whole gateway run without a toy in range: commands are logged,
//! connect carries a small artificial latency so the UI behaves like the
//! real thing.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::events::EventLog;

use super::{ActionCommand, AntennaColor, DeviceLink, DiscoveredDevice, UploadMethod};

/// Canonical fake device name
pub const SIM_NAME: &str = "Furby Simulado";

/// Canonical fake device address
pub const SIM_ADDRESS: &str = "FA:KE:FU:RB:YY:00";

/// Log-only device link
pub struct SimulatedLink {
    log: EventLog,
}

impl SimulatedLink {
    #[must_use]
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl DeviceLink for SimulatedLink {
    async fn discover(&self, _timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        // No radio; the controller synthesizes the canonical fake entry
        Ok(Vec::new())
    }

    async fn connect(&self, address: Option<&str>) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let address = address.unwrap_or(SIM_ADDRESS).to_string();
        self.log.add(format!("[sim] connected @ {address}"));
        Ok(address)
    }

    async fn disconnect(&self) -> Result<()> {
        self.log.add("[sim] disconnected");
        Ok(())
    }

    async fn set_antenna_color(&self, color: AntennaColor) -> Result<()> {
        self.log.add(format!(
            "[sim] antenna RGB=({},{},{})",
            color.r, color.g, color.b
        ));
        Ok(())
    }

    async fn trigger_action(&self, cmd: ActionCommand) -> Result<()> {
        self.log.add(format!(
            "[sim] action input={}, index={}, subindex={}, specific={}",
            cmd.input, cmd.index, cmd.subindex, cmd.specific
        ));
        Ok(())
    }

    async fn upload_audio(&self, method: UploadMethod, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        self.log.add(format!(
            "[sim] audio upload via {}: {name}",
            method.name()
        ));
        Ok(())
    }
}

/// The entry the controller synthesizes when simulated discovery is empty
#[must_use]
pub fn simulated_entry() -> DiscoveredDevice {
    DiscoveredDevice {
        name: SIM_NAME.to_string(),
        address: SIM_ADDRESS.to_string(),
    }
}
