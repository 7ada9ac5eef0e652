//! Isolated per-layer script execution.
//!
//! Every invocation builds a fresh `rhai::Engine`, so nothing a script does
//! can leak into another layer's run or a later tick. The engine sees
//! exactly four host functions plus the `LEDCount` constant; all other
//! effects are impossible by construction.
//!
//! Script API:
//! - `get_time() -> float` — seconds since the pipeline started
//! - `get_layer_elapsed_time() -> float` — seconds since this layer was added
//! - `get_pixel(index) -> [r, g, b]` — unit-range floats; out of range reads black
//! - `set_pixel(index, r, g, b)` — unit-range (int or float), clamped, overwrite
//! - `LEDCount` — strip length constant

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Dynamic, Engine, Scope};

use crate::error::{GlimmerError, GlimmerResult};
use crate::layer::FrameContext;
use crate::pixel::PixelBuffer;

/// Run one layer's script against the shared buffer.
///
/// Any compile or runtime fault comes back as a single `Script` error naming
/// the layer. Pixel writes made before a fault stay in the buffer; the tick
/// accepts partial output rather than rolling back.
pub fn execute(
    layer_name: &str,
    code: &str,
    ctx: FrameContext,
    buffer: &mut PixelBuffer,
) -> GlimmerResult<()> {
    let shared = Rc::new(RefCell::new(std::mem::take(buffer)));
    let result = run_isolated(code, ctx, &shared);
    // The engine and its host-function closures are gone by now, so the Rc
    // is unique again and the buffer moves back out without a copy.
    *buffer = Rc::try_unwrap(shared)
        .map(RefCell::into_inner)
        .unwrap_or_else(|shared| shared.borrow().clone());
    result.map_err(|e| GlimmerError::script(layer_name, e.to_string()))
}

fn run_isolated(
    code: &str,
    ctx: FrameContext,
    shared: &Rc<RefCell<PixelBuffer>>,
) -> Result<(), Box<rhai::EvalAltResult>> {
    let mut engine = Engine::new();
    let led_count = shared.borrow().led_count() as i64;

    let pipeline_elapsed = ctx.pipeline_elapsed;
    engine.register_fn("get_time", move || pipeline_elapsed);

    let layer_elapsed = ctx.layer_elapsed;
    engine.register_fn("get_layer_elapsed_time", move || layer_elapsed);

    let read = Rc::clone(shared);
    engine.register_fn("get_pixel", move |index: i64| -> rhai::Array {
        read.borrow()
            .get_unit(index)
            .iter()
            .copied()
            .map(Dynamic::from)
            .collect()
    });

    let write = Rc::clone(shared);
    engine.register_fn(
        "set_pixel",
        move |index: i64, r: Dynamic, g: Dynamic, b: Dynamic| {
            write
                .borrow_mut()
                .set_unit(index, channel(r), channel(g), channel(b));
        },
    );

    let mut scope = Scope::new();
    scope.push_constant("LEDCount", led_count);
    engine.run_with_scope(&mut scope, code)
}

/// Scripts may pass channels as ints or floats; anything else reads as 0.
fn channel(value: Dynamic) -> f64 {
    if let Some(f) = value.clone().try_cast::<f64>() {
        f
    } else if let Some(i) = value.try_cast::<i64>() {
        i as f64
    } else {
        0.0
    }
}
