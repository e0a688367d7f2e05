//! OCR-based captioning capability.
//!
//! Describes an image from what the pipeline can actually see: the
//! picture's composition plus any printed text recognized by ocrs. The
//! output is shaped for audio narration.

use std::path::Path;

use bridge_core::device::DeviceKind;
use bridge_core::error::EngineError;
use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;

/// Longest run of recognized text quoted into a description.
const MAX_QUOTED_CHARS: usize = 300;

/// Caption backends the service can drive. The bridge ships an OCR
/// pipeline; tests substitute a canned fake.
pub trait CaptionEngine {
    /// Describe one image for audio narration.
    fn caption(&self, image_path: &Path) -> Result<String, EngineError>;
}

/// ocrs detection and recognition models, loaded once for the lifetime of
/// the process.
pub struct OcrCaptioner {
    engine: OcrEngine,
}

impl OcrCaptioner {
    /// Load both models, failing fast when either file is missing.
    pub fn load(
        detection_path: &Path,
        recognition_path: &Path,
        device: DeviceKind,
    ) -> Result<Self, String> {
        if !detection_path.exists() {
            return Err(format!(
                "Detection model does not exist: {}",
                detection_path.display()
            ));
        }
        if !recognition_path.exists() {
            return Err(format!(
                "Recognition model does not exist: {}",
                recognition_path.display()
            ));
        }

        log::debug!("Caption inference on {}", device);

        let detection_model = Model::load_file(detection_path)
            .map_err(|e| format!("Failed to load detection model: {}", e))?;
        let recognition_model = Model::load_file(recognition_path)
            .map_err(|e| format!("Failed to load recognition model: {}", e))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| format!("Failed to create OCR engine: {}", e))?;

        Ok(Self { engine })
    }

    fn recognize_text(&self, image: &RgbImage) -> Result<String, EngineError> {
        let source = ImageSource::from_bytes(image.as_raw(), image.dimensions())
            .map_err(|e| EngineError::classify(format!("Failed to prepare image: {}", e)))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| EngineError::classify(format!("Failed to prepare OCR input: {}", e)))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|e| EngineError::classify(format!("Text recognition failed: {}", e)))?;
        Ok(text)
    }
}

impl CaptionEngine for OcrCaptioner {
    fn caption(&self, image_path: &Path) -> Result<String, EngineError> {
        let image = image::open(image_path)
            .map_err(|e| EngineError::classify(format!("Failed to open image: {}", e)))?
            .into_rgb8();

        let text = self.recognize_text(&image)?;
        Ok(describe_image(&image, &text))
    }
}

/// Compose the narration description from the picture's composition and
/// the recognized text.
fn describe_image(image: &RgbImage, text: &str) -> String {
    let (width, height) = image.dimensions();
    let orientation = if width > height {
        "landscape"
    } else if height > width {
        "portrait"
    } else {
        "square"
    };
    let color = if is_grayscale(image) {
        "grayscale"
    } else {
        "color"
    };

    let mut description = format!(
        "A {} {} image, {} by {} pixels",
        orientation, color, width, height
    );

    let text = normalize_whitespace(text);
    if text.is_empty() {
        description.push_str(", with no readable text.");
    } else {
        description.push_str(&format!(". Visible text reads: \"{}\".", quote_text(&text)));
    }

    description
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn quote_text(text: &str) -> String {
    if text.chars().count() <= MAX_QUOTED_CHARS {
        return text.to_string();
    }
    let mut quoted: String = text.chars().take(MAX_QUOTED_CHARS).collect();
    quoted.push_str("...");
    quoted
}

fn is_grayscale(image: &RgbImage) -> bool {
    image.pixels().all(|p| p[0] == p[1] && p[1] == p[2])
}
