//! triview - run one detection pass and render the three result views.
//!
//! Subcommands:
//! 1. `detect`: upload an image file and detect on it
//! 2. `camera`: start the synthetic camera, capture-and-detect N times, stop
//!
//! Detections come from a predictions file in the model wire format
//! (`[{"bbox": [x, y, w, h], "class": "person", "score": 0.9}]`). Each view is
//! written as `<view>.png`, or as a JSON draw-command log with `--commands`.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::ImageFormat;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use triview::media::{RasterDecoder, SyntheticCamera};
use triview::ui::Ui;
use triview::{
    DetectionModel, DrawingSurface, Event, LifecycleController, RasterSurface, RecordingSurface,
    ReplayModel, Tab, TriviewConfig, ViewKind,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render one detection pass as YOLO / RCNN / Hybrid views"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect objects in an image file.
    Detect {
        /// Image to upload.
        #[arg(long)]
        image: PathBuf,

        /// MIME type of the image (guessed from the extension if omitted).
        #[arg(long)]
        mime: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Capture frames from the synthetic camera and detect on each.
    Camera {
        /// Number of capture-and-detect passes.
        #[arg(long, default_value_t = 1)]
        captures: u32,

        /// Delay between captures.
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Predictions file in the model wire format.
    #[arg(long, env = "TRIVIEW_DETECTIONS")]
    detections: PathBuf,

    /// Output directory for the rendered views.
    #[arg(long, default_value = "triview-out")]
    out: PathBuf,

    /// Write draw-command logs (JSON) instead of PNG images.
    #[arg(long, default_value_t = false)]
    commands: bool,

    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto")]
    ui: String,
}

/// Where a panel's surface ends up on disk.
trait PanelOutput: DrawingSurface + Default {
    const EXTENSION: &'static str;

    fn write_to(&self, path: &Path) -> Result<()>;
}

impl PanelOutput for RasterSurface {
    const EXTENSION: &'static str = "png";

    fn write_to(&self, path: &Path) -> Result<()> {
        self.save(path)
    }
}

impl PanelOutput for RecordingSurface {
    const EXTENSION: &'static str = "json";

    fn write_to(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self.commands())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = TriviewConfig::load()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;

    let commands = match &cli.command {
        Command::Detect { common, .. } | Command::Camera { common, .. } => common.commands,
    };
    if commands {
        runtime.block_on(run::<RecordingSurface>(cli.command, &config))
    } else {
        runtime.block_on(run::<RasterSurface>(cli.command, &config))
    }
}

async fn run<S: PanelOutput>(command: Command, config: &TriviewConfig) -> Result<()> {
    let common = match &command {
        Command::Detect { common, .. } | Command::Camera { common, .. } => common,
    };
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&common.ui), is_tty, !stdout_is_tty);

    let camera = SyntheticCamera::new();
    let app: LifecycleController<S> = LifecycleController::new(
        config,
        Box::new(camera.clone()),
        Box::new(RasterDecoder),
        Default::default(),
    )
    .with_status_observer(Box::new(ui.status()));

    let predictions = common.detections.clone();
    app.load_model(async move {
        let model = ReplayModel::from_json_file(&predictions)?;
        Ok::<_, anyhow::Error>(Rc::new(model) as Rc<dyn DetectionModel>)
    })
    .await?;

    std::fs::create_dir_all(&common.out)
        .with_context(|| format!("failed to create {}", common.out.display()))?;

    match &command {
        Command::Detect { image, mime, common } => {
            let bytes = std::fs::read(image)
                .with_context(|| format!("failed to read image {}", image.display()))?;
            let mime = mime.clone().unwrap_or_else(|| guess_mime(image));

            app.dispatch(Event::SelectTab(Tab::Upload)).await?;
            app.dispatch(Event::FileSelected { bytes, mime }).await?;
            app.dispatch(Event::Detect).await?;
            write_panels(&app, &ui, &common.out, None)?;
        }
        Command::Camera {
            captures,
            interval_ms,
            common,
        } => {
            let hidden = Arc::new(AtomicBool::new(false));
            let flag = hidden.clone();
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::SeqCst);
            })
            .context("error setting Ctrl-C handler")?;

            app.dispatch(Event::SelectTab(Tab::Camera)).await?;
            app.dispatch(Event::StartCamera).await?;
            for pass in 1..=*captures {
                if hidden.load(Ordering::SeqCst) {
                    break;
                }
                app.dispatch(Event::CaptureFrame).await?;
                write_panels(&app, &ui, &common.out, Some(pass))?;
                if pass < *captures {
                    tokio::time::sleep(Duration::from_millis(*interval_ms)).await;
                }
            }

            if hidden.load(Ordering::SeqCst) {
                log::info!("interrupted, releasing camera");
                app.dispatch(Event::VisibilityChanged { hidden: true }).await?;
            } else {
                app.dispatch(Event::StopCamera).await?;
            }
            let stats = camera.stats();
            if stats.live_tracks != 0 {
                return Err(anyhow!("camera still has {} live tracks", stats.live_tracks));
            }
            log::info!(
                "camera captured {} frames over {} stream(s)",
                stats.frames_captured,
                stats.streams_opened
            );
        }
    }
    Ok(())
}

fn write_panels<S: PanelOutput>(
    app: &LifecycleController<S>,
    ui: &Ui,
    out: &Path,
    pass: Option<u32>,
) -> Result<()> {
    let _stage = ui.stage("Write result views");
    for view in ViewKind::ALL {
        let name = match pass {
            Some(pass) => format!("{}-{}.{}", view.slug(), pass, S::EXTENSION),
            None => format!("{}.{}", view.slug(), S::EXTENSION),
        };
        let path = out.join(name);
        app.with_surface(view, |surface| surface.write_to(&path))?;
        println!(
            "{:<7} {} -> {}",
            view.policy().name,
            app.panel_status(view),
            path.display()
        );
    }
    Ok(())
}

fn guess_mime(path: &Path) -> String {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}
