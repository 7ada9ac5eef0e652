#![forbid(unsafe_code)]

pub mod color;
pub mod error;
pub mod layer;
pub mod pipeline;
pub mod pixel;
pub mod protocol;
pub mod sandbox;
pub mod store;
pub mod transport;

pub use color::fix_color;
pub use error::{GlimmerError, GlimmerResult};
pub use layer::{FrameContext, Layer, LayerKind, LayerSpec};
pub use pipeline::{DEFAULT_FRAME_RATE, DEFAULT_LED_COUNT, Pipeline, PipelineConfig};
pub use pixel::PixelBuffer;
pub use store::LayerStore;
pub use transport::{InMemoryTransport, SpiTransport, Transport};
