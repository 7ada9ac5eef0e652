use std::sync::Arc;
use std::time::{Duration, Instant};

use glimmer::{
    InMemoryTransport, LayerSpec, LayerStore, Pipeline, PipelineConfig, fix_color,
    protocol::encode_frame,
};

const LEDS: usize = 6;

fn spec(name: &str, kind: &str, priority: i64, timeout_secs: f64, code: &str) -> LayerSpec {
    LayerSpec {
        name: name.into(),
        code: code.into(),
        kind: kind.into(),
        priority,
        timeout_secs,
    }
}

fn black_base() -> LayerSpec {
    spec(
        "base_black",
        "BASE",
        0,
        0.0,
        "for i in 0..LEDCount { set_pixel(i, 0.0, 0.0, 0.0); }",
    )
}

fn pipeline_with(
    store: &Arc<LayerStore>,
    transport: &InMemoryTransport,
) -> Pipeline {
    Pipeline::new(
        Arc::clone(store),
        Box::new(transport.clone()),
        PipelineConfig {
            led_count: LEDS,
            frame_rate: 60,
        },
    )
    .unwrap()
}

fn expected_frame(colors: &[[f64; 3]; LEDS]) -> Vec<u8> {
    let corrected: Vec<[u8; 3]> = colors.iter().map(|&[r, g, b]| fix_color(r, g, b)).collect();
    encode_frame(&corrected)
}

#[test]
fn temporary_overlay_renders_then_expires() {
    let store = Arc::new(LayerStore::new());
    let t0 = Instant::now();
    store.add_at(black_base(), t0).unwrap();
    store
        .add_at(
            spec("flash", "TEMPORARY", 1, 1.0, "set_pixel(0, 1, 0, 0);"),
            t0,
        )
        .unwrap();

    let transport = InMemoryTransport::new();
    let mut pipeline = pipeline_with(&store, &transport);

    // Immediately after the add: pixel 0 corrected-red, the rest black.
    pipeline.tick(t0 + Duration::from_millis(50));
    let mut colors = [[0.0; 3]; LEDS];
    colors[0] = [255.0, 0.0, 0.0];
    assert_eq!(transport.last_frame().unwrap(), expected_frame(&colors));

    // After the timeout: the overlay is evicted and everything is black.
    pipeline.tick(t0 + Duration::from_millis(1100));
    assert_eq!(
        transport.last_frame().unwrap(),
        expected_frame(&[[0.0; 3]; LEDS])
    );
    assert!(!store.contains("flash"));
    assert!(store.contains("base_black"));
}

#[test]
fn later_layers_overwrite_and_can_read_earlier_writes() {
    let store = Arc::new(LayerStore::new());
    let t0 = Instant::now();
    store
        .add_at(
            spec(
                "base_green",
                "BASE",
                0,
                0.0,
                "for i in 0..LEDCount { set_pixel(i, 0.0, 1.0, 0.0); }",
            ),
            t0,
        )
        .unwrap();
    store
        .add_at(
            spec("red0", "TEMPORARY", 1, 0.0, "set_pixel(0, 1.0, 0.0, 0.0);"),
            t0,
        )
        .unwrap();
    // Highest priority runs last: copies whatever pixel 0 holds into pixel 1.
    store
        .add_at(
            spec(
                "mirror",
                "TEMPORARY",
                2,
                0.0,
                "let p = get_pixel(0); set_pixel(1, p[0], p[1], p[2]);",
            ),
            t0,
        )
        .unwrap();

    let transport = InMemoryTransport::new();
    let mut pipeline = pipeline_with(&store, &transport);
    pipeline.tick(t0 + Duration::from_millis(16));

    let mut colors = [[0.0, 255.0, 0.0]; LEDS];
    colors[0] = [255.0, 0.0, 0.0];
    colors[1] = [255.0, 0.0, 0.0];
    assert_eq!(transport.last_frame().unwrap(), expected_frame(&colors));
}

#[test]
fn failing_script_does_not_stop_the_tick() {
    let store = Arc::new(LayerStore::new());
    let t0 = Instant::now();
    store.add_at(black_base(), t0).unwrap();
    store
        .add_at(spec("broken", "TEMPORARY", 1, 0.0, "nonsense("), t0)
        .unwrap();
    store
        .add_at(
            spec("after", "TEMPORARY", 2, 0.0, "set_pixel(2, 0.0, 0.0, 1.0);"),
            t0,
        )
        .unwrap();

    let transport = InMemoryTransport::new();
    let mut pipeline = pipeline_with(&store, &transport);
    pipeline.tick(t0 + Duration::from_millis(16));

    // The layer after the broken one still painted.
    let mut colors = [[0.0; 3]; LEDS];
    colors[2] = [0.0, 0.0, 255.0];
    assert_eq!(transport.last_frame().unwrap(), expected_frame(&colors));
}

#[test]
fn buffer_is_cleared_between_ticks() {
    let store = Arc::new(LayerStore::new());
    let t0 = Instant::now();
    // Only paints on the first tick; afterwards the layer is gone.
    store
        .add_at(
            spec("once", "TEMPORARY", 1, 0.1, "set_pixel(0, 1.0, 1.0, 1.0);"),
            t0,
        )
        .unwrap();

    let transport = InMemoryTransport::new();
    let mut pipeline = pipeline_with(&store, &transport);

    pipeline.tick(t0 + Duration::from_millis(16));
    pipeline.tick(t0 + Duration::from_millis(500));

    // Second frame must not carry the first frame's pixels.
    assert_eq!(
        transport.last_frame().unwrap(),
        expected_frame(&[[0.0; 3]; LEDS])
    );
    assert_eq!(transport.frames().len(), 2);
}

#[test]
fn every_frame_has_the_exact_encoded_length() {
    let store = Arc::new(LayerStore::new());
    let t0 = Instant::now();
    store.add_at(black_base(), t0).unwrap();

    let transport = InMemoryTransport::new();
    let mut pipeline = pipeline_with(&store, &transport);
    pipeline.tick(t0);

    assert_eq!(
        transport.last_frame().unwrap().len(),
        glimmer::protocol::encoded_len(LEDS)
    );
}

#[test]
fn time_varying_scripts_see_layer_elapsed_time() {
    let store = Arc::new(LayerStore::new());
    let t0 = Instant::now();
    store.add_at(black_base(), t0).unwrap();
    // Lights pixel 0 only once the layer is older than two seconds.
    store
        .add_at(
            spec(
                "delayed",
                "TEMPORARY",
                1,
                0.0,
                "if get_layer_elapsed_time() > 2.0 { set_pixel(0, 1.0, 1.0, 1.0); }",
            ),
            t0,
        )
        .unwrap();

    let transport = InMemoryTransport::new();
    let mut pipeline = pipeline_with(&store, &transport);

    pipeline.tick(t0 + Duration::from_millis(100));
    assert_eq!(
        transport.last_frame().unwrap(),
        expected_frame(&[[0.0; 3]; LEDS])
    );

    pipeline.tick(t0 + Duration::from_millis(2500));
    let mut colors = [[0.0; 3]; LEDS];
    colors[0] = [255.0, 255.0, 255.0];
    assert_eq!(transport.last_frame().unwrap(), expected_frame(&colors));
}
