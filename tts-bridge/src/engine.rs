//! Piper speech synthesis capability.

use std::path::Path;

use bridge_core::device::DeviceKind;
use bridge_core::error::EngineError;
use piper_rs::synth::PiperSpeechSynthesizer;

/// Piper voices are published at 22050 Hz.
pub const SAMPLE_RATE: u32 = 22050;

/// Speech backends the service can drive. The bridge ships Piper; tests
/// substitute a canned fake.
pub trait SpeechEngine {
    /// Synthesize the whole text as mono f32 samples at [`SAMPLE_RATE`].
    fn synthesize(&self, text: &str) -> Result<Vec<f32>, EngineError>;
}

/// A Piper voice loaded once for the lifetime of the process.
pub struct PiperSpeech {
    synth: PiperSpeechSynthesizer,
}

impl PiperSpeech {
    /// Load a voice. Accepts the `.onnx.json` config itself, the `.onnx`
    /// model path, or a base path to which `.onnx.json` is appended.
    pub fn load(voice_path: &str, device: DeviceKind) -> Result<Self, String> {
        let config_path = if voice_path.ends_with(".onnx") {
            format!("{}.json", voice_path)
        } else if voice_path.ends_with(".onnx.json") {
            voice_path.to_string()
        } else {
            format!("{}.onnx.json", voice_path)
        };

        let path = Path::new(&config_path);
        if !path.exists() {
            return Err(format!("Voice config file does not exist: {}", config_path));
        }

        log::debug!("Synthesis device: {}", device);

        let model = piper_rs::from_config_path(path)
            .map_err(|e| format!("Failed to load Piper voice config: {}", e))?;
        let synth = PiperSpeechSynthesizer::new(model)
            .map_err(|e| format!("Failed to create Piper synthesizer: {}", e))?;

        Ok(Self { synth })
    }
}

impl SpeechEngine for PiperSpeech {
    fn synthesize(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let audio_results = self
            .synth
            .synthesize_parallel(text.to_string(), None)
            .map_err(|e| EngineError::classify(format!("Failed to synthesize: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        for result in audio_results {
            let chunk = result
                .map_err(|e| EngineError::classify(format!("Failed to get audio chunk: {}", e)))?;
            samples.extend(chunk.into_vec());
        }

        if samples.is_empty() {
            return Err(EngineError::classify("Synthesis produced no audio"));
        }

        Ok(samples)
    }
}

/// Write mono 16-bit PCM at the Piper sample rate.
pub fn write_wav(path: &Path, samples: &[f32]) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let sample_i16 = (sample * i16::MAX as f32) as i16;
        writer.write_sample(sample_i16)?;
    }
    writer.finalize()
}
