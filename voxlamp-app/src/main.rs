//! Voxlamp appliance entry point.
//!
//! ## Runtime note
//!
//! The pipeline is blocking and owns both engines, so it runs on one
//! `spawn_blocking` thread. The audio source is opened inside that closure
//! because `cpal::Stream` must stay on the thread that created it. The async
//! side only forwards status events and turns Ctrl-C into `stop()`.

mod console;
mod settings;

use anyhow::Context;
use tracing::{error, info};
use voxlamp_core::{
    actuation::LightBoard,
    audio::{device::list_input_devices, AudioSource, CaptureSource, WavSource},
    engine::Assistant,
    recognition::energy::{EnergyBackend, EnergyBackendConfig},
};

use console::ConsoleObserver;
use settings::{default_settings_path, load_settings};

#[tokio::main]
async fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("voxlamp_core=info,voxlamp=info")),
        )
        .init();

    info!("Voxlamp starting");
    if let Err(e) = run().await {
        error!("voxlamp halted: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let settings_path = default_settings_path();
    let mut settings = load_settings(&settings_path);
    settings.apply_env_overrides(|name| std::env::var(name).ok());
    info!(
        settings_path = %settings_path.display(),
        keywords = settings.keywords.len(),
        has_access_key = !settings.access_key.is_empty(),
        context = ?settings.context_path,
        input_wav = ?settings.input_wav,
        "settings loaded"
    );

    if settings.input_wav.is_none() {
        for device in list_input_devices() {
            info!(name = %device.name, is_default = device.is_default, "input device");
        }
    }

    // ── Engines ───────────────────────────────────────────────────────────
    let config = settings.assistant_config()?;
    let frame_length = config.frame_length;
    let sample_rate = config.sample_rate;
    let mut backend = EnergyBackend::new(EnergyBackendConfig {
        frame_length,
        sample_rate,
        ..EnergyBackendConfig::default()
    });
    let assistant = Assistant::bootstrap(config, &mut backend)?;
    let handle = assistant.handle();

    // ── Status forwarding + Ctrl-C ───────────────────────────────────────
    let mut status_rx = handle.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = status_rx.recv().await {
            info!(status = ?event.status, detail = ?event.detail, "assistant status");
        }
    });

    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            stopper.stop();
        }
    });

    // ── Pipeline ──────────────────────────────────────────────────────────
    let running = handle.running_flag();
    let input_wav = settings.input_wav.clone();
    let preferred_device = settings.preferred_input_device.clone();
    let board = LightBoard::new(settings.wake_chase());
    let observer = ConsoleObserver {
        json: settings.json_events,
    };

    tokio::task::spawn_blocking(move || -> voxlamp_core::Result<()> {
        let source: Box<dyn AudioSource> = match input_wav {
            Some(path) => Box::new(WavSource::open(&path, frame_length, sample_rate)?),
            None => Box::new(CaptureSource::open(
                preferred_device.as_deref(),
                frame_length,
                sample_rate,
                running,
            )?),
        };
        assistant.run(source, Box::new(board), Box::new(observer))
    })
    .await
    .context("pipeline thread panicked")??;

    let summary = handle.diagnostics_snapshot();
    info!(
        frames = summary.frames_in,
        wakes = summary.wake_detections,
        understood = summary.understood,
        not_understood = summary.not_understood,
        commands = summary.commands_applied,
        "Voxlamp stopped"
    );
    Ok(())
}
