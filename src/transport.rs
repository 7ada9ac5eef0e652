use std::path::Path;

use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

use crate::error::{GlimmerError, GlimmerResult};

/// SPI clock matching the WS2812 bit timing (see `protocol`).
const SPI_SPEED_HZ: u32 = 6_400_000;
const SPI_BITS_PER_WORD: u8 = 8;

/// Sink contract for transmitting encoded frames to the strip.
///
/// `send` performs one blocking transfer of a fully encoded frame. The
/// handle is not safe for concurrent sends; only the render thread calls it.
pub trait Transport {
    fn send(&mut self, encoded: &[u8]) -> GlimmerResult<()>;
}

/// Physical bus transport over a Linux spidev handle.
///
/// The device is opened and configured once; the handle closes when the
/// transport drops.
pub struct SpiTransport {
    spi: Spidev,
}

impl SpiTransport {
    pub fn open(device: impl AsRef<Path>) -> GlimmerResult<Self> {
        let device = device.as_ref();
        let mut spi = Spidev::open(device).map_err(|e| {
            GlimmerError::transport(format!("open SPI device '{}': {e}", device.display()))
        })?;
        let options = SpidevOptions::new()
            .bits_per_word(SPI_BITS_PER_WORD)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| GlimmerError::transport(format!("configure SPI device: {e}")))?;
        tracing::info!(device = %device.display(), speed_hz = SPI_SPEED_HZ, "SPI device opened");
        Ok(Self { spi })
    }
}

impl Transport for SpiTransport {
    fn send(&mut self, encoded: &[u8]) -> GlimmerResult<()> {
        let mut transfer = SpidevTransfer::write(encoded);
        self.spi
            .transfer(&mut transfer)
            .map_err(|e| GlimmerError::transport(format!("SPI transfer failed: {e}")))
    }
}

/// In-memory transport for tests and the `frame` debug command.
///
/// Clones share one frame log, so a caller can hand a clone to the pipeline
/// and inspect transmissions through the handle it kept.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTransport {
    frames: std::sync::Arc<std::sync::Mutex<Vec<Vec<u8>>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded frames in transmission order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().expect("frame log poisoned").clone()
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.frames.lock().expect("frame log poisoned").last().cloned()
    }
}

impl Transport for InMemoryTransport {
    fn send(&mut self, encoded: &[u8]) -> GlimmerResult<()> {
        self.frames
            .lock()
            .expect("frame log poisoned")
            .push(encoded.to_vec());
        Ok(())
    }
}

/// Transport that always fails, for exercising the pipeline's
/// log-and-continue error path.
#[cfg(test)]
pub(crate) struct FailingTransport;

#[cfg(test)]
impl Transport for FailingTransport {
    fn send(&mut self, _encoded: &[u8]) -> GlimmerResult<()> {
        Err(GlimmerError::transport("bus unavailable"))
    }
}
