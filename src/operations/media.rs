//! Media toolkit: comic stories and video scripts.

use serde::{Deserialize, Serialize};

use super::fields::{opt_count, opt_text, present, require, take};
use super::{GenerationOperation, TEXT_EVENT_STREAM};
use crate::error::RelayError;
use crate::streaming::LinePolicy;

const DEFAULT_COMIC_PANELS: u32 = 4;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicGeneration {
    #[serde(default, deserialize_with = "opt_text")]
    instructions: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    grade: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    language: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    num_panels: Option<u32>,
    #[serde(default, deserialize_with = "opt_text")]
    visual_style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComicPayload {
    pub instructions: String,
    pub grade_level: String,
    pub language: String,
    pub num_panels: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,
}

impl GenerationOperation for ComicGeneration {
    type Payload = ComicPayload;

    const NAME: &'static str = "comic-generation";
    // The comic service streams panel text as plain lines between events.
    const LINE_POLICY: LinePolicy = LinePolicy::ForwardPlainLines;

    fn validate(&self) -> Result<(), RelayError> {
        require(&[
            ("instructions", present(&self.instructions)),
            ("grade", present(&self.grade)),
            ("language", present(&self.language)),
        ])?;

        if self.num_panels == Some(0) {
            return Err(RelayError::Validation(
                "numPanels must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    fn upstream_path(&self) -> Result<&'static str, RelayError> {
        Ok("/api/v1/media/comic-story")
    }

    fn into_payload(self) -> ComicPayload {
        ComicPayload {
            instructions: take(self.instructions),
            grade_level: take(self.grade),
            language: take(self.language),
            num_panels: self.num_panels.unwrap_or(DEFAULT_COMIC_PANELS),
            visual_style: self.visual_style,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoScript {
    #[serde(default, deserialize_with = "opt_text")]
    topic: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    grade: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    language: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    duration_minutes: Option<u32>,
    #[serde(default, deserialize_with = "opt_text")]
    tone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoScriptPayload {
    pub topic: String,
    pub grade_level: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

impl GenerationOperation for VideoScript {
    type Payload = VideoScriptPayload;

    const NAME: &'static str = "video-script";
    const CONTENT_TYPE: &'static str = TEXT_EVENT_STREAM;

    fn validate(&self) -> Result<(), RelayError> {
        require(&[
            ("topic", present(&self.topic)),
            ("grade", present(&self.grade)),
            ("language", present(&self.language)),
        ])
    }

    fn upstream_path(&self) -> Result<&'static str, RelayError> {
        Ok("/api/v1/media/video-script")
    }

    fn into_payload(self) -> VideoScriptPayload {
        VideoScriptPayload {
            topic: take(self.topic),
            grade_level: take(self.grade),
            language: take(self.language),
            duration_minutes: self.duration_minutes,
            tone: self.tone,
        }
    }
}
