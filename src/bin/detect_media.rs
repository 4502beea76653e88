//! detect_media - analyze one local image or video and print the result as JSON

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use drowning_watch::{
    build_backend, Annotator, AppConfig, MediaDetector, MediaKind, MediaStore, VideoSampler,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image or video file to analyze.
    path: PathBuf,
    /// Config file (JSON or TOML); defaults to $DROWNING_CONFIG.
    #[arg(long, env = "DROWNING_CONFIG")]
    config: Option<PathBuf>,
    /// ONNX model path, or stub:// for the stub backend.
    #[arg(long)]
    model: Option<String>,
    /// Directory receiving results/ and frames/.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Minimum detection confidence (0, 1].
    #[arg(long)]
    confidence: Option<f32>,
    /// Analyze every Nth video frame.
    #[arg(long)]
    stride: Option<u64>,
    /// TrueType font for box labels.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = AppConfig::load_from(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(confidence) = args.confidence {
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(anyhow!("--confidence must be in (0, 1], got {}", confidence));
        }
        config.confidence = confidence;
    }
    if let Some(stride) = args.stride {
        if stride == 0 {
            return Err(anyhow!("--stride must be greater than zero"));
        }
        config.sampling.frame_stride = stride;
    }
    if let Some(font) = args.font {
        config.model.label_font = Some(font);
    }

    let store = MediaStore::open(&config.data_dir)?;
    let backend = build_backend(&config.model)?;
    let annotator = Annotator::from_font_path(config.model.label_font.as_deref());
    let mut detector = MediaDetector::new(backend, annotator, store.results_dir());

    let name = args.path.to_string_lossy();
    let output = match MediaKind::from_filename(&name) {
        MediaKind::Image => {
            let analysis = detector.detect_image(&args.path, config.confidence)?;
            serde_json::to_string_pretty(&analysis)?
        }
        MediaKind::Video => {
            let analysis = VideoSampler::new(&mut detector, &store, config.sampling)
                .process_video(&args.path, config.confidence)?;
            serde_json::to_string_pretty(&analysis)?
        }
    };
    println!("{}", output);
    Ok(())
}
