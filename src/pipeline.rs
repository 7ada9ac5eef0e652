use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::color::fix_color;
use crate::error::{GlimmerError, GlimmerResult};
use crate::layer::FrameContext;
use crate::pixel::PixelBuffer;
use crate::protocol;
use crate::sandbox;
use crate::store::LayerStore;
use crate::transport::Transport;

/// Default render rate (60 Hz).
pub const DEFAULT_FRAME_RATE: u32 = 60;
/// Default strip length.
pub const DEFAULT_LED_COUNT: usize = 60;

#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    pub led_count: usize,
    pub frame_rate: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            led_count: DEFAULT_LED_COUNT,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> GlimmerResult<()> {
        if self.led_count == 0 {
            return Err(GlimmerError::validation("led_count must be > 0"));
        }
        if self.frame_rate == 0 {
            return Err(GlimmerError::validation("frame_rate must be > 0"));
        }
        Ok(())
    }
}

/// The render scheduler/compositor.
///
/// Owns the pixel buffer and the tick clock; the layer store is shared with
/// the management boundary. One tick runs the full cycle: evict and order
/// layers, clear the buffer, execute every active script in order, apply
/// color correction, encode, transmit. No error inside a tick is fatal —
/// script and transport failures are logged and the loop carries on.
pub struct Pipeline {
    store: Arc<LayerStore>,
    transport: Box<dyn Transport + Send>,
    buffer: PixelBuffer,
    started_at: Instant,
    period: Duration,
}

impl Pipeline {
    pub fn new(
        store: Arc<LayerStore>,
        transport: Box<dyn Transport + Send>,
        config: PipelineConfig,
    ) -> GlimmerResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            transport,
            buffer: PixelBuffer::new(config.led_count),
            started_at: Instant::now(),
            period: Duration::from_nanos(1_000_000_000 / u64::from(config.frame_rate)),
        })
    }

    pub fn led_count(&self) -> usize {
        self.buffer.led_count()
    }

    /// Run one render tick at `now`.
    ///
    /// The render loop passes the wall clock; tests drive simulated instants.
    /// Ticks never overlap because only one caller ever owns the pipeline.
    #[tracing::instrument(level = "trace", skip(self, now))]
    pub fn tick(&mut self, now: Instant) {
        let active = self.store.active_layers(now);

        self.buffer.clear();
        let pipeline_elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        for layer in &active {
            let ctx = FrameContext {
                pipeline_elapsed,
                layer_elapsed: now.saturating_duration_since(layer.added_at).as_secs_f64(),
            };
            if let Err(e) = sandbox::execute(&layer.name, &layer.code, ctx, &mut self.buffer) {
                tracing::warn!(layer = %layer.name, error = %e, "layer script failed, tick continues");
            }
        }

        let colors: Vec<[u8; 3]> = (0..self.buffer.led_count())
            .map(|led| {
                let [r, g, b] = self.buffer.raw(led);
                fix_color(r, g, b)
            })
            .collect();
        let encoded = protocol::encode_frame(&colors);

        if let Err(e) = self.transport.send(&encoded) {
            tracing::warn!(error = %e, "frame transmission failed, tick continues");
        }
    }

    /// Transition Stopped -> Running: consume the pipeline and spawn the
    /// dedicated render thread. There is no stop path; the loop runs for the
    /// life of the process, and consuming `self` makes a second start
    /// unrepresentable.
    pub fn start(mut self) -> GlimmerResult<thread::JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("glimmer-render".into())
            .spawn(move || self.run())
            .context("spawn render thread")?;
        Ok(handle)
    }

    fn run(&mut self) {
        // Deadline-based pacing. If a tick overruns, the next tick is late
        // rather than concurrent; if we fall more than two periods behind,
        // the deadline resets to now instead of bursting catch-up ticks.
        let max_drift = self.period * 2;
        let mut next = Instant::now();
        tracing::info!(
            period_ms = self.period.as_millis() as u64,
            leds = self.buffer.led_count(),
            "render loop running"
        );
        loop {
            let now = Instant::now();
            if now > next + max_drift {
                next = now;
            }
            self.tick(now);
            next += self.period;
            if let Some(sleep) = next.checked_duration_since(Instant::now()) {
                thread::sleep(sleep);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerSpec;
    use crate::transport::FailingTransport;

    #[test]
    fn transport_failure_does_not_abort_ticks() {
        let store = Arc::new(LayerStore::new());
        store
            .add(LayerSpec {
                name: "base".into(),
                code: "set_pixel(0, 1.0, 1.0, 1.0);".into(),
                kind: "BASE".into(),
                priority: 0,
                timeout_secs: 0.0,
            })
            .unwrap();

        let mut pipeline = Pipeline::new(
            store,
            Box::new(FailingTransport),
            PipelineConfig {
                led_count: 4,
                frame_rate: 60,
            },
        )
        .unwrap();

        // Two ticks through a dead bus: neither panics nor propagates.
        let now = Instant::now();
        pipeline.tick(now);
        pipeline.tick(now + Duration::from_millis(17));
    }

    #[test]
    fn config_rejects_zero_values() {
        assert!(
            PipelineConfig {
                led_count: 0,
                frame_rate: 60
            }
            .validate()
            .is_err()
        );
        assert!(
            PipelineConfig {
                led_count: 60,
                frame_rate: 0
            }
            .validate()
            .is_err()
        );
    }
}
