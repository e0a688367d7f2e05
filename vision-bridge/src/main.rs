//! Actual Reader vision bridge process.
//!
//! A long-lived worker that loads the caption models once and then serves
//! image description requests until its parent closes stdin or sends
//! `shutdown`.
//!
//! Communication is JSON over stdin/stdout, one object per line; stderr
//! carries diagnostics only:
//!
//! ```text
//! Request:  {"type": "caption", "id": "req_001", "image_path": "/path/to/image.png", "context": {"page_number": 87, "position": "middle", "image_index": 2}}
//! Response: {"type": "caption", "id": "req_001", "caption": "Third image on page 87, ..."}
//! ```

mod engine;
mod service;

use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use bridge_core::bridge;
use bridge_core::device::{self, DevicePreference};
use bridge_core::logging;
use clap::Parser;

use crate::engine::OcrCaptioner;
use crate::service::VisionService;

#[derive(Debug, Parser)]
#[command(name = "vision-bridge", about = "Actual Reader image description bridge")]
struct Args {
    /// ocrs text-detection model (.rten).
    #[arg(long)]
    detection_model: PathBuf,

    /// ocrs text-recognition model (.rten).
    #[arg(long)]
    recognition_model: PathBuf,

    /// Inference device: auto, cuda, metal or cpu.
    #[arg(long, default_value = "auto")]
    device: DevicePreference,
}

fn main() {
    let args = Args::parse();
    logging::init("vision-bridge");

    log::info!("Vision bridge starting...");

    let device = device::resolve(args.device);
    log::info!("Using device: {}", device);

    log::info!("Loading caption models...");
    let captioner =
        match OcrCaptioner::load(&args.detection_model, &args.recognition_model, device) {
            Ok(captioner) => captioner,
            Err(err) => bridge::init_failure(format!("Failed to load model: {}", err)),
        };
    log::info!("Model loaded.");

    let mut service = VisionService::new(captioner);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = bridge::run(
        &mut service,
        BufReader::new(stdin.lock()),
        &mut BufWriter::new(stdout.lock()),
    );

    log::info!("Shutting down...");

    if let Err(err) = result {
        log::error!("Failed to write response: {}", err);
        std::process::exit(1);
    }
}
