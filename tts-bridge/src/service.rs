//! Generate-request validation and dispatch.

use std::path::PathBuf;

use bridge_core::bridge::BridgeService;
use bridge_core::error::EngineError;
use bridge_core::protocol::{ErrorCode, RawRequest, Response};
use bridge_core::workdir::WorkDir;
use serde::Deserialize;

use crate::engine::{self, SpeechEngine};

/// Longest accepted text, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Synthesis knobs carried on the wire. Piper voices expose none of these
/// controls; the service accepts them for compatibility and ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SynthesisOptions {
    #[serde(default = "default_exaggeration")]
    pub exaggeration: f32,
    #[serde(default = "default_cfg_weight")]
    pub cfg_weight: f32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            exaggeration: default_exaggeration(),
            cfg_weight: default_cfg_weight(),
            temperature: default_temperature(),
        }
    }
}

fn default_exaggeration() -> f32 {
    0.5
}

fn default_cfg_weight() -> f32 {
    0.5
}

fn default_temperature() -> f32 {
    0.8
}

#[derive(Debug, Deserialize)]
struct GenerateFields {
    #[serde(default)]
    text: String,
    #[serde(default)]
    voice_sample: Option<String>,
    #[serde(default)]
    options: SynthesisOptions,
}

/// A validated `generate` request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCommand {
    pub text: String,
    pub voice_sample: Option<PathBuf>,
    pub options: SynthesisOptions,
}

/// Check a `generate` request without touching the engine. Rules apply in
/// order; the first failure wins.
pub fn validate_generate(
    request: &RawRequest,
    request_id: &str,
) -> Result<GenerateCommand, Response> {
    let fields: GenerateFields = match request.fields() {
        Ok(fields) => fields,
        Err(err) => {
            return Err(Response::Error {
                id: Some(request_id.to_string()),
                code: ErrorCode::InvalidRequest,
                message: format!("Invalid generate request: {}", err),
            })
        }
    };

    if fields.text.is_empty() {
        return Err(invalid_text(request_id, "Text is empty"));
    }
    if fields.text.chars().count() > MAX_TEXT_CHARS {
        return Err(invalid_text(request_id, "Text too long (max 10000 chars)"));
    }

    // An empty voice_sample means no cloning prompt, same as leaving it out.
    let voice_sample = fields
        .voice_sample
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);
    if let Some(path) = &voice_sample {
        if !path.exists() {
            return Err(Response::Error {
                id: Some(request_id.to_string()),
                code: ErrorCode::VoiceNotFound,
                message: format!("Voice sample not found: {}", path.display()),
            });
        }
    }

    Ok(GenerateCommand {
        text: fields.text,
        voice_sample,
        options: fields.options,
    })
}

fn invalid_text(request_id: &str, message: &str) -> Response {
    Response::Error {
        id: Some(request_id.to_string()),
        code: ErrorCode::InvalidText,
        message: message.to_string(),
    }
}

/// The speech service: one loaded voice plus the artifact directory.
pub struct TtsService<E> {
    engine: E,
    workdir: WorkDir,
}

impl<E: SpeechEngine> TtsService<E> {
    pub fn new(engine: E, workdir: WorkDir) -> Self {
        Self { engine, workdir }
    }

    /// Hand the artifact directory back for removal at shutdown.
    pub fn into_workdir(self) -> WorkDir {
        self.workdir
    }
}

impl<E: SpeechEngine> BridgeService for TtsService<E> {
    type Command = GenerateCommand;

    fn validate(
        &self,
        request: &RawRequest,
        request_id: &str,
    ) -> Result<GenerateCommand, Response> {
        match request.kind() {
            Some("generate") => validate_generate(request, request_id),
            _ => Err(Response::unknown_type(request, request_id)),
        }
    }

    fn invoke(
        &mut self,
        request_id: &str,
        command: GenerateCommand,
    ) -> Result<Response, EngineError> {
        if command.voice_sample.is_some() || command.options != SynthesisOptions::default() {
            log::debug!("Voice sample and synthesis options are ignored; the loaded voice is fixed");
        }

        let samples = self.engine.synthesize(&command.text)?;

        let path = self
            .workdir
            .next_artifact(&format!("tts_{}", request_id), "wav");
        engine::write_wav(&path, &samples)
            .map_err(|err| EngineError::classify(format!("Failed to write audio file: {}", err)))?;

        Ok(Response::Audio {
            id: request_id.to_string(),
            path: path.display().to_string(),
            duration: duration_secs(samples.len()),
        })
    }
}

/// Seconds of audio at the Piper rate, rounded to the millisecond.
pub fn duration_secs(samples: usize) -> f64 {
    let seconds = samples as f64 / engine::SAMPLE_RATE as f64;
    (seconds * 1000.0).round() / 1000.0
}
