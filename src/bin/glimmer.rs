use std::{fs::File, io::BufReader, path::Path, path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use glimmer::{
    InMemoryTransport, LayerSpec, LayerStore, Pipeline, PipelineConfig, SpiTransport,
};

#[derive(Parser, Debug)]
#[command(name = "glimmer", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the render loop against the SPI-attached strip.
    Run(RunArgs),
    /// Render one tick in memory and hex-dump the encoded frame.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// SPI device path.
    #[arg(long, default_value = "/dev/spidev1.0")]
    device: PathBuf,

    /// Number of LEDs on the strip.
    #[arg(long, default_value_t = glimmer::DEFAULT_LED_COUNT)]
    leds: usize,

    /// Target frame rate in Hz.
    #[arg(long, default_value_t = glimmer::DEFAULT_FRAME_RATE)]
    fps: u32,

    /// Optional JSON file with initial layers (array of layer specs).
    #[arg(long)]
    layers: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// JSON file with the layers to composite.
    #[arg(long)]
    layers: PathBuf,

    /// Number of LEDs on the strip.
    #[arg(long, default_value_t = glimmer::DEFAULT_LED_COUNT)]
    leds: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn read_layer_specs(path: &Path) -> anyhow::Result<Vec<LayerSpec>> {
    let f = File::open(path).with_context(|| format!("open layer file '{}'", path.display()))?;
    let r = BufReader::new(f);
    let specs: Vec<LayerSpec> =
        serde_json::from_reader(r).with_context(|| "parse layer JSON")?;
    Ok(specs)
}

/// Every pipeline starts with a black BASE layer so the strip always renders
/// a defined frame, even before any layer is submitted.
fn base_black_spec() -> LayerSpec {
    LayerSpec {
        name: "base_black".into(),
        code: "for i in 0..LEDCount { set_pixel(i, 0.0, 0.0, 0.0); }".into(),
        kind: "BASE".into(),
        priority: 0,
        timeout_secs: 0.0,
    }
}

fn populate_store(store: &LayerStore, layers: Option<&Path>) -> anyhow::Result<()> {
    store.add(base_black_spec())?;
    if let Some(path) = layers {
        for spec in read_layer_specs(path)? {
            let name = spec.name.clone();
            store
                .add(spec)
                .with_context(|| format!("add layer '{name}'"))?;
        }
    }
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let store = Arc::new(LayerStore::new());
    populate_store(&store, args.layers.as_deref())?;

    let transport = SpiTransport::open(&args.device)?;
    let pipeline = Pipeline::new(
        Arc::clone(&store),
        Box::new(transport),
        PipelineConfig {
            led_count: args.leds,
            frame_rate: args.fps,
        },
    )?;

    let handle = pipeline.start()?;
    tracing::info!(fps = args.fps, leds = args.leds, "pipeline started");

    // The render loop never returns; block this thread on it.
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("render thread panicked"))?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let store = Arc::new(LayerStore::new());
    populate_store(&store, Some(&args.layers))?;

    let transport = InMemoryTransport::new();
    let mut pipeline = Pipeline::new(
        Arc::clone(&store),
        Box::new(transport.clone()),
        PipelineConfig {
            led_count: args.leds,
            frame_rate: glimmer::DEFAULT_FRAME_RATE,
        },
    )?;

    pipeline.tick(Instant::now());
    let frame = transport
        .last_frame()
        .ok_or_else(|| anyhow::anyhow!("no frame transmitted"))?;

    for chunk in frame.chunks(24) {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{}", hex.join(" "));
    }
    Ok(())
}
