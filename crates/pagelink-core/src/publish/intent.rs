//! Publish intent resolution.
//!
//! A `PublishIntent` is rebuilt from form state on every attempt and
//! never persisted. Resolution applies the text and media precedence
//! rules, validation runs before anything touches the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::form::{ComposeForms, ComposeMode, GeneratedDraft, ManualDraft, UploadSlot, UploadedFile};
use crate::backend::GeneratedImage;
use crate::error::{PagelinkError, Result};

/// Field a publish request lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishField {
    /// Literal text or a content prompt
    Text,
    /// Any image, image prompt or video
    Media,
}

impl fmt::Display for PublishField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishField::Text => f.write_str("text"),
            PublishField::Media => f.write_str("media"),
        }
    }
}

/// Where the post text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    Literal(String),
    /// The backend generates the text at publish time
    Prompt(String),
    Empty,
}

/// Media kinds, for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    None,
    GeneratedImage,
    ImagePrompt,
    UploadedPhoto,
    UploadedVideo,
}

/// The one media item a publish carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    None,
    GeneratedImage(GeneratedImage),
    /// The backend generates the image at publish time
    ImagePrompt(String),
    Photo(UploadedFile),
    Video(UploadedFile),
}

impl MediaSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaSource::None => MediaKind::None,
            MediaSource::GeneratedImage(_) => MediaKind::GeneratedImage,
            MediaSource::ImagePrompt(_) => MediaKind::ImagePrompt,
            MediaSource::Photo(_) => MediaKind::UploadedPhoto,
            MediaSource::Video(_) => MediaKind::UploadedVideo,
        }
    }
}

/// Blank values count as absent; anything else is kept as written.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn upload_media(slot: &UploadSlot) -> MediaSource {
    match slot {
        UploadSlot::Empty => MediaSource::None,
        UploadSlot::Photo(file) => MediaSource::Photo(file.clone()),
        UploadSlot::Video(file) => MediaSource::Video(file.clone()),
    }
}

/// Fully resolved publish request, before it is encoded for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishIntent {
    pub mode: ComposeMode,
    pub text: TextSource,
    pub media: MediaSource,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl PublishIntent {
    pub fn from_forms(forms: &ComposeForms, mode: ComposeMode) -> Self {
        match mode {
            ComposeMode::Generated => Self::from_generated(&forms.generated),
            ComposeMode::Manual => Self::from_manual(&forms.manual),
        }
    }

    /// Literal content beats a prompt; a generated image beats an image
    /// prompt, which beats an uploaded photo, which beats a video.
    pub fn from_generated(draft: &GeneratedDraft) -> Self {
        let text = if let Some(content) = non_blank(draft.content.as_deref()) {
            TextSource::Literal(content)
        } else if let Some(prompt) = non_blank(draft.content_prompt.as_deref()) {
            TextSource::Prompt(prompt)
        } else {
            TextSource::Empty
        };

        let media = if let Some(image) = draft.generated_image.clone() {
            MediaSource::GeneratedImage(image)
        } else if let Some(prompt) = non_blank(draft.image_prompt.as_deref()) {
            MediaSource::ImagePrompt(prompt)
        } else {
            upload_media(&draft.upload)
        };

        Self {
            mode: ComposeMode::Generated,
            text,
            media,
            scheduled_for: None,
        }
    }

    pub fn from_manual(draft: &ManualDraft) -> Self {
        let text = match non_blank(Some(&draft.text)) {
            Some(text) => TextSource::Literal(text),
            None => TextSource::Empty,
        };
        Self {
            mode: ComposeMode::Manual,
            text,
            media: upload_media(&draft.upload),
            scheduled_for: None,
        }
    }

    pub fn scheduled_for(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.scheduled_for = at;
        self
    }

    /// Text is required unless the media is a video, and something must
    /// be present at all.
    pub fn validate(&self) -> Result<()> {
        let has_text = !matches!(self.text, TextSource::Empty);
        let media = self.media.kind();

        let mut missing = Vec::new();
        if !has_text && media != MediaKind::UploadedVideo {
            missing.push(PublishField::Text);
        }
        if !has_text && media == MediaKind::None {
            missing.push(PublishField::Media);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PagelinkError::PublishValidation { missing })
        }
    }

    /// Validates and encodes the intent for `createPost`.
    pub fn into_request(self, account_id: Option<&str>) -> Result<PublishRequest> {
        self.validate()?;

        let mut request = PublishRequest {
            mode: self.mode,
            account_id: account_id.map(str::to_string),
            scheduled_for: self.scheduled_for,
            ..Default::default()
        };

        match self.text {
            TextSource::Literal(text) => request.message = Some(text),
            TextSource::Prompt(prompt) => request.content_prompt = Some(prompt),
            TextSource::Empty => {}
        }

        match self.media {
            MediaSource::None => {}
            MediaSource::GeneratedImage(image) => {
                request.image_url = Some(image.url);
                request.image_filename = Some(image.filename);
            }
            MediaSource::ImagePrompt(prompt) => request.image_prompt = Some(prompt),
            MediaSource::Photo(file) => {
                request.photo_base64 = Some(file.encode());
                request.photo_filename = Some(file.filename);
            }
            MediaSource::Video(file) => {
                request.video_base64 = Some(file.encode());
                request.video_filename = Some(file.filename);
            }
        }

        Ok(request)
    }
}

/// Wire body of `createPost`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishRequest {
    pub mode: ComposeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}
