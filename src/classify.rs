//! Turns the model's free-form reply into a [`RecognitionResult`].
//!
//! The reply must be a single JSON object whose boolean `is_biological` field
//! selects the shape. A biological result also needs a string `name`. Every
//! other field is kept exactly as the model sent it, including fields the
//! instruction never asked for. Type mismatches and advisory violations are
//! reported by [`RecognitionResult::advisories`] but never rejected.

use crate::errors::ClassificationError;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::Display;

const DISCRIMINANT: &str = "is_biological";
const NAME: &str = "name";
const CONFIDENCE: &str = "confidence";
const TEXT_FIELDS: &[&str] = &["scientific_name", "type", "habitat", "description"];
pub const MIN_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Biological {
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Biological {
    pub fn scientific_name(&self) -> Option<&str> {
        self.text("scientific_name")
    }

    pub fn kind(&self) -> Option<&str> {
        self.text("type")
    }

    pub fn habitat(&self) -> Option<&str> {
        self.text("habitat")
    }

    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    /// Numbers and numeric strings both count; anything else is `None`.
    pub fn confidence(&self) -> Option<f64> {
        match self.fields.get(CONFIDENCE)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonBiological {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NonBiological {
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    Biological(Biological),
    NonBiological(NonBiological),
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    is_biological: bool,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for RecognitionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecognitionResult::Biological(body) => Tagged {
                is_biological: true,
                body,
            }
            .serialize(serializer),
            RecognitionResult::NonBiological(body) => Tagged {
                is_biological: false,
                body,
            }
            .serialize(serializer),
        }
    }
}

/// Contract fields the model was asked for but did not honor.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    ConfidenceMissing,
    ConfidenceAsText(String),
    ConfidenceNotNumeric(Value),
    ConfidenceOutOfRange(f64),
    NotText(&'static str),
    ShortDescription(usize),
    MissingScientificName,
}

impl Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::ConfidenceMissing => write!(f, "confidence is missing"),
            Advisory::ConfidenceAsText(s) => write!(f, "confidence {s:?} is a string"),
            Advisory::ConfidenceNotNumeric(v) => write!(f, "confidence {v} is not a number"),
            Advisory::ConfidenceOutOfRange(v) => write!(f, "confidence {v} is outside [0, 1]"),
            Advisory::NotText(key) => write!(f, "{key} is not a string"),
            Advisory::ShortDescription(n) => write!(
                f,
                "description has {n} characters, expected at least {MIN_DESCRIPTION_CHARS}"
            ),
            Advisory::MissingScientificName => write!(f, "scientific_name is empty"),
        }
    }
}

impl RecognitionResult {
    pub fn is_biological(&self) -> bool {
        matches!(self, RecognitionResult::Biological(_))
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        let RecognitionResult::Biological(bio) = self else {
            return vec![];
        };
        let mut found = vec![];
        match bio.fields.get(CONFIDENCE) {
            None | Some(Value::Null) => found.push(Advisory::ConfidenceMissing),
            Some(Value::String(s)) if bio.confidence().is_some() => {
                found.push(Advisory::ConfidenceAsText(s.clone()))
            }
            Some(Value::Number(_)) => {}
            Some(other) => found.push(Advisory::ConfidenceNotNumeric(other.clone())),
        }
        if let Some(v) = bio.confidence().filter(|v| !(0.0..=1.0).contains(v)) {
            found.push(Advisory::ConfidenceOutOfRange(v));
        }
        for &key in TEXT_FIELDS {
            if bio
                .fields
                .get(key)
                .is_some_and(|v| !v.is_null() && !v.is_string())
            {
                found.push(Advisory::NotText(key));
            }
        }
        let chars = bio.description().map_or(0, |d| d.chars().count());
        if chars < MIN_DESCRIPTION_CHARS {
            found.push(Advisory::ShortDescription(chars));
        }
        if bio.scientific_name().is_none_or(|s| s.trim().is_empty()) {
            found.push(Advisory::MissingScientificName);
        }
        found
    }
}

pub fn classify(raw_text: &str) -> Result<RecognitionResult, ClassificationError> {
    let value: Value = serde_json::from_str(raw_text.trim())
        .map_err(|e| ClassificationError::MalformedResult(e.to_string()))?;

    let Value::Object(mut fields) = value else {
        return Err(unrecognized("reply is not a JSON object".to_string()));
    };
    let tag = match fields.remove(DISCRIMINANT) {
        Some(Value::Bool(tag)) => tag,
        Some(other) => {
            return Err(unrecognized(format!(
                "{DISCRIMINANT} is not a boolean: {other}"
            )));
        }
        None => return Err(unrecognized(format!("{DISCRIMINANT} is missing"))),
    };

    if !tag {
        return Ok(RecognitionResult::NonBiological(NonBiological { fields }));
    }
    let name = match fields.remove(NAME) {
        Some(Value::String(name)) => name,
        Some(other) => return Err(unrecognized(format!("{NAME} is not a string: {other}"))),
        None => return Err(unrecognized(format!("{NAME} is missing"))),
    };
    Ok(RecognitionResult::Biological(Biological { name, fields }))
}

fn unrecognized(reason: String) -> ClassificationError {
    ClassificationError::Unrecognized(reason)
}
