//! Exam paper generation.

use serde::{Deserialize, Serialize};

use super::fields::{opt_count, opt_text, present, require, take};
use super::GenerationOperation;
use crate::error::RelayError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamGeneration {
    #[serde(default, deserialize_with = "opt_text")]
    organisation_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    exam_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    duration: Option<String>,
    #[serde(default)]
    topics: Option<Vec<String>>,
    #[serde(default, deserialize_with = "opt_text")]
    grade: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    subject: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    total_marks: Option<u32>,
    #[serde(default, deserialize_with = "opt_text")]
    difficulty_level: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExamPayload {
    pub organisation_name: String,
    pub exam_name: String,
    pub duration: String,
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl GenerationOperation for ExamGeneration {
    type Payload = ExamPayload;

    const NAME: &'static str = "exam-generation";

    fn validate(&self) -> Result<(), RelayError> {
        let topics_present = self.topics.as_ref().is_some_and(|t| !t.is_empty());

        require(&[
            ("organisationName", present(&self.organisation_name)),
            ("examName", present(&self.exam_name)),
            ("duration", present(&self.duration)),
            ("topics", topics_present),
        ])?;

        if let Some(topics) = &self.topics {
            if topics.iter().any(|t| t.trim().is_empty()) {
                return Err(RelayError::Validation(
                    "Topics must not contain empty entries".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn upstream_path(&self) -> Result<&'static str, RelayError> {
        Ok("/api/v1/exam/generate")
    }

    fn into_payload(self) -> ExamPayload {
        ExamPayload {
            organisation_name: take(self.organisation_name),
            exam_name: take(self.exam_name),
            duration: take(self.duration),
            topics: self
                .topics
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.trim().to_string())
                .collect(),
            grade: self.grade,
            subject: self.subject,
            total_marks: self.total_marks,
            difficulty_level: self.difficulty_level,
            instructions: self.instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::prepare;
    use serde_json::json;

    #[test]
    fn test_exam_payload() {
        let body = serde_json::to_vec(&json!({
            "organisationName": "Riverside High",
            "examName": "Midterm",
            "duration": 90,
            "topics": ["Algebra ", "Geometry"],
            "totalMarks": 100,
        }))
        .unwrap();

        let prepared = prepare::<ExamGeneration>(&body).unwrap();

        assert_eq!(prepared.path, "/api/v1/exam/generate");
        assert_eq!(
            prepared.payload,
            json!({
                "organisation_name": "Riverside High",
                "exam_name": "Midterm",
                "duration": "90",
                "topics": ["Algebra", "Geometry"],
                "total_marks": 100,
            })
        );
    }

    #[test]
    fn test_topics_required_and_non_empty() {
        let empty = serde_json::to_vec(&json!({
            "organisationName": "Riverside High",
            "examName": "Midterm",
            "duration": "1h",
            "topics": [],
        }))
        .unwrap();
        let err = prepare::<ExamGeneration>(&empty).unwrap_err();
        assert_eq!(err.client_message(), "Missing required fields: topics");

        let blank = serde_json::to_vec(&json!({
            "organisationName": "Riverside High",
            "examName": "Midterm",
            "duration": "1h",
            "topics": ["Algebra", "  "],
        }))
        .unwrap();
        assert!(prepare::<ExamGeneration>(&blank).is_err());
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = prepare::<ExamGeneration>(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.client_message(), "Request body must be a JSON object");

        let err = prepare::<ExamGeneration>(b"{not json").unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);
    }
}
