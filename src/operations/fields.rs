//! Field helpers shared by the operation structs.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::RelayError;

/// Deserialize an optional text field that forms may send as a number
/// (`"grade": 7` as well as `"grade": "7"`).
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

/// Deserialize an optional non-negative count sent as a number or a
/// numeric string.
pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative count, got {}", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a non-negative count, got {:?}", s))),
        Some(other) => Err(D::Error::custom(format!(
            "expected a non-negative count, got {}",
            other
        ))),
    }
}

/// Deserialize an optional flag sent as a boolean or as `"true"`/`"false"`.
pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            "" => Ok(None),
            _ => Err(D::Error::custom(format!("expected a boolean, got {:?}", s))),
        },
        Some(other) => Err(D::Error::custom(format!(
            "expected a boolean, got {}",
            other
        ))),
    }
}

/// True when a text field is present and not blank.
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Fail with every missing field named, in declaration order.
pub fn require(fields: &[(&'static str, bool)]) -> Result<(), RelayError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RelayError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Trimmed value of a field already checked by [`require`].
pub fn take(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_text")]
        text: Option<String>,
        #[serde(default, deserialize_with = "opt_count")]
        count: Option<u32>,
    }

    fn probe(json: &str) -> Result<Probe, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_opt_text_accepts_numbers() {
        assert_eq!(probe(r#"{"text":7}"#).unwrap().text.as_deref(), Some("7"));
        assert_eq!(probe(r#"{"text":"7"}"#).unwrap().text.as_deref(), Some("7"));
        assert_eq!(probe(r#"{"text":null}"#).unwrap().text, None);
        assert_eq!(probe("{}").unwrap().text, None);
        assert!(probe(r#"{"text":[1]}"#).is_err());
    }

    #[test]
    fn test_opt_count() {
        assert_eq!(probe(r#"{"count":5}"#).unwrap().count, Some(5));
        assert_eq!(probe(r#"{"count":" 12 "}"#).unwrap().count, Some(12));
        assert_eq!(probe(r#"{"count":""}"#).unwrap().count, None);
        assert!(probe(r#"{"count":-1}"#).is_err());
        assert!(probe(r#"{"count":"lots"}"#).is_err());
    }

    #[test]
    fn test_opt_flag() {
        #[derive(Deserialize)]
        struct Flag {
            #[serde(default, deserialize_with = "opt_flag")]
            flag: Option<bool>,
        }
        let flag = |json: &str| serde_json::from_str::<Flag>(json).map(|f| f.flag);

        assert_eq!(flag(r#"{"flag":true}"#).unwrap(), Some(true));
        assert_eq!(flag(r#"{"flag":"False"}"#).unwrap(), Some(false));
        assert_eq!(flag("{}").unwrap(), None);
        assert!(flag(r#"{"flag":"maybe"}"#).is_err());
    }

    #[test]
    fn test_require_lists_missing_fields() {
        let err = require(&[("grade", true), ("subject", false), ("topic", false)]).unwrap_err();
        assert_eq!(
            err.client_message(),
            "Missing required fields: subject, topic"
        );
    }

    #[test]
    fn test_present() {
        assert!(present(&Some("x".into())));
        assert!(!present(&Some("  ".into())));
        assert!(!present(&None));
    }
}
