//! A18-style audio container encoder/validator
//!
//! The toy accepts audio in a GeneralPlus container: a fixed 16-byte magic
//! header, little-endian PCM metadata, then raw frames. This is a container
//! wrap around validated PCM, not the proprietary A1800 codec — playback
//! compatibility with a real device is best-effort.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Fixed container magic: sentinel bytes plus the GeneralPlus vendor tag
pub const MAGIC: [u8; 16] = *b"\x00\xff\x00\xffGENERALPLUS\x00";

/// Metadata header length: rate u32 + channels u16 + width u16 + data len u32
pub const HEADER_LEN: usize = 12;

/// Sample rates the toy's firmware accepts
const SUPPORTED_RATES: [u32; 3] = [8000, 16000, 16001];

/// Check whether a file already carries the container magic
///
/// Any read failure, including files shorter than the magic, yields `false`.
#[must_use]
pub fn is_container(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };

    let mut header = [0u8; MAGIC.len()];
    match file.read_exact(&mut header) {
        Ok(()) => header == MAGIC,
        Err(_) => false,
    }
}

/// Encode a WAV file into container form
///
/// Validates mono / 16-bit / supported sample rate before any output is
/// written; no resampling is performed. Returns the output path (a fresh
/// temporary `.a18` path when `output` is `None`).
///
/// # Errors
///
/// `UnsupportedFormat` when the PCM shape is outside the supported profile,
/// `Io` on read/write failure.
pub fn encode(wav_path: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let mut reader = hound::WavReader::open(wav_path).map_err(map_wav_err)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(Error::UnsupportedFormat(format!(
            "{} channels not supported, use mono",
            spec.channels
        )));
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(Error::UnsupportedFormat(format!(
            "{}-bit {:?} samples not supported, use 16-bit PCM",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    if !SUPPORTED_RATES.contains(&spec.sample_rate) {
        return Err(Error::UnsupportedFormat(format!(
            "sample rate {} not supported, use one of {SUPPORTED_RATES:?}",
            spec.sample_rate
        )));
    }

    let mut pcm = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.samples::<i16>() {
        let sample = sample.map_err(map_wav_err)?;
        pcm.extend_from_slice(&sample.to_le_bytes());
    }

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => tempfile::Builder::new()
            .prefix("fluff-")
            .suffix(".a18")
            .tempfile()?
            .into_temp_path()
            .keep()
            .map_err(|e| Error::Io(e.error))?,
    };

    let mut writer = BufWriter::new(File::create(&out_path)?);
    writer.write_all(&MAGIC)?;
    writer.write_all(&spec.sample_rate.to_le_bytes())?;
    writer.write_all(&spec.channels.to_le_bytes())?;
    writer.write_all(&u16::from(spec.bits_per_sample / 8).to_le_bytes())?;
    writer.write_all(&u32::try_from(pcm.len()).map_err(|_| {
        Error::UnsupportedFormat("audio payload exceeds container size limit".to_string())
    })?.to_le_bytes())?;
    writer.write_all(&pcm)?;
    writer.flush()?;

    Ok(out_path)
}

/// Return `path` unchanged if already in container form, else encode it
///
/// # Errors
///
/// Same failure modes as [`encode`].
pub fn ensure_container(path: &Path) -> Result<PathBuf> {
    if is_container(path) {
        Ok(path.to_path_buf())
    } else {
        encode(path, None)
    }
}

fn map_wav_err(e: hound::Error) -> Error {
    match e {
        hound::Error::IoError(io) => Error::Io(io),
        other => Error::UnsupportedFormat(format!("failed to read WAV: {other}")),
    }
}
