//! Question-set (assessment) generation.

use serde::{Deserialize, Serialize};

use super::fields::{opt_count, opt_flag, opt_text, present, require, take};
use super::GenerationOperation;
use crate::error::RelayError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentGeneration {
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
    difficulty_level: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    assessment_type: Option<String>,
    #[serde(default, deserialize_with = "opt_count")]
    mcq_count: Option<u32>,
    #[serde(default, deserialize_with = "opt_count")]
    true_false_count: Option<u32>,
    #[serde(default, deserialize_with = "opt_count")]
    short_answer_count: Option<u32>,
    #[serde(default, deserialize_with = "opt_count")]
    long_answer_count: Option<u32>,
    #[serde(default, deserialize_with = "opt_flag")]
    include_answer_key: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AssessmentPayload {
    pub grade: String,
    pub subject: String,
    pub language: String,
    pub topic: String,
    pub learning_objective: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_mcq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_true_false: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_short_answer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_long_answer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_answer_key: Option<bool>,
}

impl AssessmentGeneration {
    fn total_questions(&self) -> u64 {
        [
            self.mcq_count,
            self.true_false_count,
            self.short_answer_count,
            self.long_answer_count,
        ]
        .iter()
        .map(|c| u64::from(c.unwrap_or(0)))
        .sum()
    }
}

impl GenerationOperation for AssessmentGeneration {
    type Payload = AssessmentPayload;

    const NAME: &'static str = "assessment-generation";

    fn validate(&self) -> Result<(), RelayError> {
        require(&[
            ("grade", present(&self.grade)),
            ("subject", present(&self.subject)),
            ("language", present(&self.language)),
            ("topic", present(&self.topic)),
            ("learningObjective", present(&self.learning_objective)),
        ])?;

        if self.total_questions() == 0 {
            return Err(RelayError::Validation(
                "At least one question count must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    fn upstream_path(&self) -> Result<&'static str, RelayError> {
        Ok("/api/v1/assessment/generate")
    }

    fn into_payload(self) -> AssessmentPayload {
        AssessmentPayload {
            grade: take(self.grade),
            subject: take(self.subject),
            language: take(self.language),
            topic: take(self.topic),
            learning_objective: take(self.learning_objective),
            difficulty_level: self.difficulty_level,
            assessment_type: self.assessment_type,
            number_of_mcq: self.mcq_count,
            number_of_true_false: self.true_false_count,
            number_of_short_answer: self.short_answer_count,
            number_of_long_answer: self.long_answer_count,
            include_answer_key: self.include_answer_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::prepare;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "grade": "9",
            "subject": "Math",
            "language": "English",
            "topic": "Quadratics",
            "learningObjective": "Factor quadratic expressions",
        })
    }

    #[test]
    fn test_counts_renamed() {
        let mut request = base();
        request["mcqCount"] = json!(5);
        request["trueFalseCount"] = json!("3");
        request["includeAnswerKey"] = json!(true);
        request["assessmentType"] = json!("quiz");

        let prepared =
            prepare::<AssessmentGeneration>(&serde_json::to_vec(&request).unwrap()).unwrap();

        assert_eq!(prepared.path, "/api/v1/assessment/generate");
        assert_eq!(prepared.content_type, "text/plain; charset=utf-8");
        assert_eq!(prepared.payload["number_of_mcq"], 5);
        assert_eq!(prepared.payload["number_of_true_false"], 3);
        assert_eq!(prepared.payload["include_answer_key"], true);
        assert_eq!(prepared.payload["assessment_type"], "quiz");
        assert_eq!(prepared.payload["learning_objective"], "Factor quadratic expressions");
        assert!(prepared.payload.get("number_of_short_answer").is_none());
        assert!(prepared.payload.get("mcqCount").is_none());
    }

    #[test]
    fn test_requires_a_question() {
        let mut request = base();
        request["mcqCount"] = json!(0);

        let err =
            prepare::<AssessmentGeneration>(&serde_json::to_vec(&request).unwrap()).unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
        assert!(err.client_message().contains("question count"));
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut request = base();
        request["longAnswerCount"] = json!(-2);

        let err =
            prepare::<AssessmentGeneration>(&serde_json::to_vec(&request).unwrap()).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);
    }
}
