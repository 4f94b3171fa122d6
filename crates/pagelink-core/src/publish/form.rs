use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::GeneratedImage;

/// Which compose form a publish comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeMode {
    #[default]
    Generated,
    Manual,
}

impl ComposeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComposeMode::Generated => "generated",
            ComposeMode::Manual => "manual",
        }
    }
}

impl fmt::Display for ComposeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComposeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generated" | "ai" => Ok(ComposeMode::Generated),
            "manual" => Ok(ComposeMode::Manual),
            other => Err(format!("Unknown compose mode: {other}")),
        }
    }
}

/// A file picked by the user, held in memory until publish.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Transportable form of the file contents.
    pub fn encode(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The single upload slot of a compose form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadSlot {
    #[default]
    Empty,
    Photo(UploadedFile),
    Video(UploadedFile),
}

impl UploadSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, UploadSlot::Empty)
    }
}

/// State of the AI-assisted compose form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedDraft {
    /// Literal generated (and possibly edited) text
    pub content: Option<String>,
    /// Prompt for server-side text generation at publish time
    pub content_prompt: Option<String>,
    /// Image already generated by the backend
    pub generated_image: Option<GeneratedImage>,
    /// Prompt for server-side image generation at publish time
    pub image_prompt: Option<String>,
    pub upload: UploadSlot,
}

/// State of the manual compose form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualDraft {
    pub text: String,
    pub upload: UploadSlot,
}

/// Both compose forms; only the active one is reset after a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeForms {
    pub generated: GeneratedDraft,
    pub manual: ManualDraft,
}

impl ComposeForms {
    pub fn reset(&mut self, mode: ComposeMode) {
        match mode {
            ComposeMode::Generated => self.generated = GeneratedDraft::default(),
            ComposeMode::Manual => self.manual = ManualDraft::default(),
        }
    }
}
