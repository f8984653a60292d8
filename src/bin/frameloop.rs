//! Frame Loop Application
//!
//! Runs the demo tone game against the first audio backend that opens.
//! Type `q` and Enter to quit.

use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frame_audio::{
    audio::{device::list_output_devices, select_device},
    config::{self, AppConfig},
    frame_loop::FrameLoop,
    platform::{ChannelEvents, ChecksumPresenter, NoControllers, PlatformEvent, ToneGame},
};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    frames: Option<u64>,
    fps: Option<u32>,
    backend: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = || iter.next().with_context(|| format!("{} needs a value", arg));
        match arg.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--frames" => args.frames = Some(value()?.parse().context("--frames")?),
            "--fps" => args.fps = Some(value()?.parse().context("--fps")?),
            "--backend" => args.backend = Some(value()?),
            other => bail!(
                "unknown argument '{}' (expected --config, --frames, --fps, --backend)",
                other
            ),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting frame loop");

    let args = parse_args()?;
    let mut config: AppConfig = match &args.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => config::load(),
    };
    if let Some(frames) = args.frames {
        config.frame.max_frames = Some(frames);
    }
    if let Some(fps) = args.fps {
        config.frame.target_fps = Some(fps);
    }
    if let Some(backend) = args.backend {
        config.audio.backends = vec![backend];
    }
    config.validate()?;

    // List available output devices
    let devices = list_output_devices();
    if !devices.is_empty() {
        println!("\n=== Available Output Devices ===");
        for device in &devices {
            let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
            println!("  {}{}", device.name, default_marker);
        }
        println!();
    }

    let stream = config.stream_config()?;
    let device = select_device(config.audio.backends.as_slice(), &stream);

    let (quit_tx, events) = ChannelEvents::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                let _ = quit_tx.send(PlatformEvent::Quit);
                break;
            }
        }
    });

    let mut frame_loop = FrameLoop::new(
        &config,
        device,
        Box::new(events),
        Box::new(NoControllers),
        Box::new(ChecksumPresenter::default()),
    )?;
    let mut game = ToneGame::new(config.audio.tone_volume);

    let stats = frame_loop.run(&mut game, config.frame.max_frames);
    println!(
        "Ran {} frames ({} without audio), {} samples written",
        stats.frames, stats.dropout_frames, stats.samples_written
    );

    Ok(())
}
