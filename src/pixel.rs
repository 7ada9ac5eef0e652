/// Working frame buffer: one RGB triple per LED, stored as `f64` channels on
/// a 0..255 scale.
///
/// Scripts talk to it in unit range: writes clamp to [0, 1] and scale up,
/// reads scale back down. Because writes are pre-clamped, stored values can
/// never leave 0..255 and reads need no clamp of their own. Out-of-range
/// indices read as black and write as no-ops.
#[derive(Clone, Debug, Default)]
pub struct PixelBuffer {
    channels: Vec<f64>,
    leds: usize,
}

impl PixelBuffer {
    pub fn new(leds: usize) -> Self {
        Self {
            channels: vec![0.0; leds * 3],
            leds,
        }
    }

    pub fn led_count(&self) -> usize {
        self.leds
    }

    /// Zero every channel. Called at the start of each tick.
    pub fn clear(&mut self) {
        self.channels.fill(0.0);
    }

    /// Overwrite one pixel from unit-range channels. `index` past the strip
    /// is silently ignored; channels are clamped to [0, 1] before storage.
    pub fn set_unit(&mut self, index: i64, r: f64, g: f64, b: f64) {
        let Some(base) = self.channel_base(index) else {
            return;
        };
        self.channels[base] = r.clamp(0.0, 1.0) * 255.0;
        self.channels[base + 1] = g.clamp(0.0, 1.0) * 255.0;
        self.channels[base + 2] = b.clamp(0.0, 1.0) * 255.0;
    }

    /// Read one pixel back as unit-range channels; out-of-range reads black.
    pub fn get_unit(&self, index: i64) -> [f64; 3] {
        let Some(base) = self.channel_base(index) else {
            return [0.0, 0.0, 0.0];
        };
        [
            self.channels[base] / 255.0,
            self.channels[base + 1] / 255.0,
            self.channels[base + 2] / 255.0,
        ]
    }

    /// Raw 0..255 channels for one pixel, as fed to color correction.
    pub fn raw(&self, led: usize) -> [f64; 3] {
        let base = led * 3;
        [
            self.channels[base],
            self.channels[base + 1],
            self.channels[base + 2],
        ]
    }

    fn channel_base(&self, index: i64) -> Option<usize> {
        if index < 0 || index as usize >= self.leds {
            return None;
        }
        Some(index as usize * 3)
    }
}
