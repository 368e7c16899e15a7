//! iris: live camera preview with GPU colour filters

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use iris::capture::{self, CameraSource, FrameProducer, TestPattern};
use iris::display::SdlSurfaceHost;
use iris::render::{self, RendererHooks};
use iris::stats::metrics_channel;
use iris::ui::{overlay_text, PreviewState, UiCommand};
use iris::{CameraKind, CaptureConfig, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    init_tracing();

    info!("iris launching...");

    let config = Config::load(config_path().as_deref())?;
    iris::CONFIG.store(Arc::new(config.clone()));
    info!(?config, "configuration loaded");

    let (recorder, metrics) = metrics_channel();
    let (producer_tx, producer_rx) = flume::unbounded::<FrameProducer>();
    let (ui_tx, ui_rx) = flume::unbounded::<UiCommand>();

    let input_tx = ui_tx.clone();
    let hooks = RendererHooks {
        observer: Box::new(recorder),
        on_texture_available: Some(Box::new(move |producer| {
            if producer_tx.send(producer).is_err() {
                warn!("camera is gone, texture left unfed");
            }
        })),
        on_input: Some(Box::new(move |command| {
            let _ = input_tx.send(command);
        })),
    };

    let display = config.display.clone();
    let render_thread = render::spawn(config.render.clone(), hooks, move || {
        SdlSurfaceHost::open(&display)
    })?;
    let render_handle = render_thread.handle();

    // Camera pump: one run per texture the renderer hands out
    let stop = Arc::new(AtomicBool::new(false));
    let camera_stop = stop.clone();
    let capture_config = config.capture.clone();
    let camera_handle = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut source = open_camera(&capture_config)?;
        for producer in producer_rx.iter() {
            capture::run_camera(&mut source, producer, camera_stop.clone())?;
            if camera_stop.load(Ordering::Relaxed) {
                break;
            }
        }
        Ok(())
    });

    // Text commands on stdin
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<UiCommand>() {
                Ok(command) => {
                    if ui_tx.send_async(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
    });

    let mut state = PreviewState::new(config.render.default_filter, config.metrics.show_overlay);
    let mut overlay = tokio::time::interval(Duration::from_millis(
        config.metrics.overlay_interval_ms.max(16),
    ));

    loop {
        tokio::select! {
            command = ui_rx.recv_async() => {
                let Ok(command) = command else { break };
                if !state.apply(command, &render_handle) {
                    break;
                }
            }
            _ = overlay.tick() => {
                if render_thread.is_finished() {
                    info!("render thread finished");
                    break;
                }
                if state.show_metrics {
                    let drawn = render_handle.active_filter().unwrap_or(state.selected);
                    info!("\n{}", overlay_text(drawn, &metrics.snapshot()));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
        }
    }

    info!("iris shutting down");
    stop.store(true, Ordering::Relaxed);
    let rendered = tokio::task::spawn_blocking(move || render_thread.shutdown()).await?;
    if let Err(e) = &rendered {
        error!("render thread failed: {e}");
    }
    match camera_handle.await? {
        Ok(()) => {}
        Err(e) => error!("camera failed: {e}"),
    }
    rendered
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iris=debug"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_timer(fmt::time::uptime()));

    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

/// `--config <path>`, if given.
fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn open_camera(config: &CaptureConfig) -> Result<Box<dyn CameraSource>> {
    match config.source {
        CameraKind::TestPattern => Ok(Box::new(TestPattern::new(
            config.width,
            config.height,
            config.fps,
        ))),
        #[cfg(feature = "v4l2-camera")]
        CameraKind::V4l2 => Ok(Box::new(capture::V4l2Camera::open(config.clone())?)),
        #[cfg(not(feature = "v4l2-camera"))]
        CameraKind::V4l2 => Err(eyre!("built without the v4l2-camera feature")),
    }
}
