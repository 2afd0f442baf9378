//! Lesson content generation.

use serde::{Deserialize, Serialize};

use super::fields::{opt_count, opt_flag, opt_text, present, require, take};
use super::{GenerationOperation, TEXT_EVENT_STREAM};
use crate::error::RelayError;

/// Kind of lesson material, selects the upstream path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    LessonPlan,
    Quiz,
    Worksheet,
    Presentation,
}

impl ContentKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "lesson-plan" | "lesson_plan" => Some(Self::LessonPlan),
            "quiz" => Some(Self::Quiz),
            "worksheet" => Some(Self::Worksheet),
            "presentation" => Some(Self::Presentation),
            _ => None,
        }
    }

    pub fn upstream_path(self) -> &'static str {
        match self {
            Self::LessonPlan => "/api/v1/content/lesson-plan",
            Self::Quiz => "/api/v1/content/quiz",
            Self::Worksheet => "/api/v1/content/worksheet",
            Self::Presentation => "/api/v1/content/presentation",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentGeneration {
    #[serde(default, deserialize_with = "opt_text")]
    grade: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    subject: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    language: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    topic: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    learning_objective: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    content_type: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    difficulty_level: Option<String>,
    #[serde(default, deserialize_with = "opt_flag")]
    emotional_consideration: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    adaptive_learning: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    include_assessment: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    multimedia_suggestions: Option<bool>,
    #[serde(default, deserialize_with = "opt_text")]
    instruction_depth: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    number_of_sessions: Option<u32>,
    #[serde(default, deserialize_with = "opt_text")]
    duration_of_session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentPayload {
    pub grade: String,
    pub subject: String,
    pub language: String,
    pub topic: String,
    pub learning_objective: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_consideration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_learning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_assessment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multimedia_suggestions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_depth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_sessions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_of_session: Option<String>,
}

impl GenerationOperation for ContentGeneration {
    type Payload = ContentPayload;

    const NAME: &'static str = "content-generation";
    const CONTENT_TYPE: &'static str = TEXT_EVENT_STREAM;

    fn validate(&self) -> Result<(), RelayError> {
        require(&[
            ("grade", present(&self.grade)),
            ("subject", present(&self.subject)),
            ("language", present(&self.language)),
            ("topic", present(&self.topic)),
            ("learningObjective", present(&self.learning_objective)),
            ("contentType", present(&self.content_type)),
        ])
    }

    fn upstream_path(&self) -> Result<&'static str, RelayError> {
        let raw = self.content_type.as_deref().unwrap_or_default();
        ContentKind::parse(raw)
            .map(ContentKind::upstream_path)
            .ok_or_else(|| RelayError::Validation(format!("Unsupported content type: {}", raw)))
    }

    fn into_payload(self) -> ContentPayload {
        ContentPayload {
            grade: take(self.grade),
            subject: take(self.subject),
            language: take(self.language),
            topic: take(self.topic),
            learning_objective: take(self.learning_objective),
            difficulty_level: self.difficulty_level,
            emotional_consideration: self.emotional_consideration,
            adaptive_learning: self.adaptive_learning,
            include_assessment: self.include_assessment,
            multimedia_suggestions: self.multimedia_suggestions,
            instruction_depth: self.instruction_depth,
            number_of_sessions: self.number_of_sessions,
            duration_of_session: self.duration_of_session,
        }
    }
}
