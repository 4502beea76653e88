//! drowning_web - upload-and-analyze web service
//!
//! This daemon:
//! 1. Loads configuration (DROWNING_CONFIG file + DROWNING_* overrides)
//! 2. Loads the detector model once
//! 3. Serves the upload page and analysis results until Ctrl-C

use anyhow::{anyhow, Result};
use std::sync::mpsc;

use drowning_watch::{
    build_backend, Annotator, AppConfig, MediaDetector, MediaStore, WebConfig, WebServer,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    let store = MediaStore::open(&config.data_dir)?;

    let mut backend = build_backend(&config.model)?;
    backend.warm_up()?;
    log::info!(
        "model {} loaded with {} backend",
        config.model.path,
        backend.name()
    );
    let annotator = Annotator::from_font_path(config.model.label_font.as_deref());
    let detector = MediaDetector::new(backend, annotator, store.results_dir());

    let handle = WebServer::new(WebConfig::from(&config), store, detector).spawn()?;
    log::info!(
        "drowning_web running. data dir {}, confidence {}, frame stride {}",
        config.data_dir.display(),
        config.confidence,
        config.sampling.frame_stride
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!("drowning_web waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping web server...");
    handle.stop()?;

    Ok(())
}
