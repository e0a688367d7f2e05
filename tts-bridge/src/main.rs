//! Actual Reader TTS bridge process.
//!
//! A long-lived worker that loads a Piper voice once and then serves
//! synthesis requests until its parent closes stdin or sends `shutdown`.
//!
//! Communication is JSON over stdin/stdout, one object per line; stderr
//! carries diagnostics only:
//!
//! ```text
//! Request:  {"type": "generate", "id": "req_001", "text": "Hello", "voice_sample": "/path/voice.wav", "options": {"exaggeration": 0.3}}
//! Response: {"type": "audio", "id": "req_001", "path": "/tmp/actual_reader_tts_x/tts_req_001_0001.wav", "duration": 1.5}
//! ```

mod engine;
mod service;

use std::io::{self, BufReader, BufWriter};

use bridge_core::bridge;
use bridge_core::device::{self, DevicePreference};
use bridge_core::logging;
use bridge_core::workdir::WorkDir;
use clap::Parser;

use crate::engine::PiperSpeech;
use crate::service::TtsService;

#[derive(Debug, Parser)]
#[command(name = "tts-bridge", about = "Actual Reader text-to-speech bridge")]
struct Args {
    /// Piper voice to load: the .onnx model, its .onnx.json config, or the
    /// base path.
    #[arg(long)]
    voice: String,

    /// Inference device: auto, cuda, metal or cpu.
    #[arg(long, default_value = "auto")]
    device: DevicePreference,
}

fn main() {
    let args = Args::parse();
    logging::init("tts-bridge");

    log::info!("TTS bridge starting...");

    let workdir = match WorkDir::new("actual_reader_tts_") {
        Ok(workdir) => workdir,
        Err(err) => bridge::init_failure(format!("Failed to create temp directory: {}", err)),
    };
    log::info!("Temp directory: {}", workdir.path().display());

    let device = device::resolve(args.device);
    log::info!("Using device: {}", device);

    log::info!("Loading Piper voice...");
    let piper = match PiperSpeech::load(&args.voice, device) {
        Ok(piper) => piper,
        Err(err) => {
            // init_failure exits the process, skipping destructors.
            workdir.close();
            bridge::init_failure(format!("Failed to load model: {}", err))
        }
    };
    log::info!("Model loaded.");

    let mut service = TtsService::new(piper, workdir);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = bridge::run(
        &mut service,
        BufReader::new(stdin.lock()),
        &mut BufWriter::new(stdout.lock()),
    );

    log::info!("Cleaning up...");
    service.into_workdir().close();

    if let Err(err) = result {
        log::error!("Failed to write response: {}", err);
        std::process::exit(1);
    }
}
