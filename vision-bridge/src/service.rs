//! Caption-request validation, position phrasing, and dispatch.

use std::path::PathBuf;

use bridge_core::bridge::BridgeService;
use bridge_core::error::EngineError;
use bridge_core::protocol::{ErrorCode, RawRequest, Response};
use serde::Deserialize;

use crate::engine::CaptionEngine;

/// Where an image sits in the source document, as reported by the reader.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionContext {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default)]
    pub image_index: u32,
}

impl Default for CaptionContext {
    fn default() -> Self {
        Self {
            page_number: None,
            position: default_position(),
            image_index: 0,
        }
    }
}

fn default_position() -> String {
    "middle".to_string()
}

#[derive(Debug, Deserialize)]
struct CaptionFields {
    #[serde(default)]
    image_path: Option<String>,
    #[serde(default)]
    context: CaptionContext,
}

/// A validated `caption` request.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCommand {
    pub image_path: PathBuf,
    pub context: CaptionContext,
}

/// Check a `caption` request without touching the engine.
pub fn validate_caption(
    request: &RawRequest,
    request_id: &str,
) -> Result<CaptionCommand, Response> {
    let fields: CaptionFields = match request.fields() {
        Ok(fields) => fields,
        Err(err) => {
            return Err(Response::Error {
                id: Some(request_id.to_string()),
                code: ErrorCode::InvalidRequest,
                message: format!("Invalid caption request: {}", err),
            })
        }
    };

    let image_path = match fields.image_path.filter(|path| !path.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => {
            return Err(Response::Error {
                id: Some(request_id.to_string()),
                code: ErrorCode::InvalidRequest,
                message: "image_path is required".to_string(),
            })
        }
    };

    if !image_path.exists() {
        return Err(Response::Error {
            id: Some(request_id.to_string()),
            code: ErrorCode::ImageNotFound,
            message: format!("Image not found: {}", image_path.display()),
        });
    }

    Ok(CaptionCommand {
        image_path,
        context: fields.context,
    })
}

const ORDINALS: [&str; 10] = [
    "First", "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth", "Tenth",
];

/// Phrase the document position for narration: which image on which page,
/// and where on the page it sits.
pub fn format_position(context: &CaptionContext) -> String {
    let position = match context.position.as_str() {
        "top" => "near the top of the page",
        "middle" => "in the middle of the page",
        "bottom" => "near the bottom of the page",
        "full-page" => "taking the full page",
        "inline" => "inline with the text",
        _ => "on the page",
    };

    let ordinal = match ORDINALS.get(context.image_index as usize) {
        Some(ordinal) => (*ordinal).to_string(),
        None => format!("Image {}", context.image_index as u64 + 1),
    };

    match context.page_number {
        Some(page) => format!("{} image on page {}, {}", ordinal, page, position),
        None => format!("{} image, {}", ordinal, position),
    }
}

/// The caption service around one loaded engine.
pub struct VisionService<E> {
    engine: E,
}

impl<E: CaptionEngine> VisionService<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: CaptionEngine> BridgeService for VisionService<E> {
    type Command = CaptionCommand;

    fn validate(
        &self,
        request: &RawRequest,
        request_id: &str,
    ) -> Result<CaptionCommand, Response> {
        match request.kind() {
            Some("caption") => validate_caption(request, request_id),
            _ => Err(Response::unknown_type(request, request_id)),
        }
    }

    fn invoke(
        &mut self,
        request_id: &str,
        command: CaptionCommand,
    ) -> Result<Response, EngineError> {
        let description = self.engine.caption(&command.image_path)?;
        let caption = format!("{}: {}", format_position(&command.context), description);
        Ok(Response::Caption {
            id: request_id.to_string(),
            caption,
        })
    }
}
