//! Device abstraction for the toy
//!
//! The BLE transport itself lives behind the [`DeviceLink`] trait; the rest
//! of the gateway only ever talks to that seam.

mod controller;
mod sim;

pub use controller::{DeviceController, DeviceSession, random_action_table};
pub use sim::SimulatedLink;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Whether the process drives a real toy or a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Simulated,
    Real,
}

impl LinkMode {
    /// Short label used in the mode endpoint and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Real => "real",
        }
    }
}

/// A device found during BLE discovery
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
}

/// One of the toy's built-in gesture/sound cells
///
/// Four independent byte selectors; the device's internal action table is
/// the only authority on which tuples are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub input: u8,
    pub index: u8,
    pub subindex: u8,
    pub specific: u8,
}

impl ActionCommand {
    #[must_use]
    pub const fn new(input: u8, index: u8, subindex: u8, specific: u8) -> Self {
        Self {
            input,
            index,
            subindex,
            specific,
        }
    }
}

/// Antenna LED color, each channel in [0, 255]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AntennaColor {
    /// Validate a widened RGB triple
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when any channel falls outside [0, 255].
    pub fn new(r: i32, g: i32, b: i32) -> Result<Self> {
        let channel = |v: i32, name: &str| -> Result<u8> {
            u8::try_from(v)
                .map_err(|_| Error::InvalidArgument(format!("{name}={v} outside [0, 255]")))
        };

        Ok(Self {
            r: channel(r, "r")?,
            g: channel(g, "g")?,
            b: channel(b, "b")?,
        })
    }
}

/// Ranked audio upload strategies
///
/// The real link's capability surface varies by firmware and library
/// version; strategies are tried in ranked order and each failure is
/// reported independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    /// Direct sound-file playback
    SoundFile,
    /// Two-phase upload then play
    UploadAndPlay,
    /// Raw GATT characteristic writes
    RawGatt,
}

impl UploadMethod {
    /// All strategies, most preferred first
    pub const RANKED: [Self; 3] = [Self::SoundFile, Self::UploadAndPlay, Self::RawGatt];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SoundFile => "sound_file",
            Self::UploadAndPlay => "upload_and_play",
            Self::RawGatt => "raw_gatt",
        }
    }
}

/// Transport capability for a single toy
///
/// Implementations are not required to be safe for interleaved calls; the
/// [`DeviceController`] serializes all access through one gate.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Discover nearby devices within the given timeout
    async fn discover(&self, timeout: std::time::Duration) -> Result<Vec<DiscoveredDevice>>;

    /// Connect, self-discovering when no address is given
    async fn connect(&self, address: Option<&str>) -> Result<String>;

    /// Disconnect from the device
    async fn disconnect(&self) -> Result<()>;

    /// Set the antenna LED color
    async fn set_antenna_color(&self, color: AntennaColor) -> Result<()>;

    /// Trigger one built-in action cell
    async fn trigger_action(&self, cmd: ActionCommand) -> Result<()>;

    /// Upload container-format audio via one named strategy
    async fn upload_audio(&self, method: UploadMethod, path: &Path) -> Result<()>;
}
