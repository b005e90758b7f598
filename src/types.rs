use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// Kind of content submitted for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Video => "video",
        }
    }

    /// Media kind for uploads; `None` for text.
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            ContentType::Text => None,
            ContentType::Image => Some(MediaKind::Image),
            ContentType::Video => Some(MediaKind::Video),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "video" => Ok(ContentType::Video),
            other => Err(format!("unsupported content type: {other}")),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub content: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verification_id: String,
    pub status: String,
    pub confidence: f64,
    pub classification: String,
    pub explanation: String,
    pub sources: Vec<String>,
}

/// Compact view of a stored verification, used by the status and
/// listing endpoints.
#[derive(Debug, Serialize)]
pub struct VerificationSummary {
    pub verification_id: String,
    pub status: String,
    pub content_type: String,
    pub classification: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VerificationListResponse {
    pub data: Vec<VerificationSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// A single text submitted to the analysis engine.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Model output for one text: the full score distribution plus the
/// winning label.
#[derive(Debug, Clone)]
pub struct TextAnalysis {
    pub predicted: String,
    pub scores: Vec<LabelScore>,
    pub token_count: usize,
}

impl TextAnalysis {
    /// Score of the strongest label; 0.0 for an empty distribution.
    pub fn top_score(&self) -> f64 {
        self.scores.iter().map(|s| s.score).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parses_known_values() {
        assert_eq!("text".parse::<ContentType>().unwrap(), ContentType::Text);
        assert_eq!("image".parse::<ContentType>().unwrap(), ContentType::Image);
        assert_eq!("video".parse::<ContentType>().unwrap(), ContentType::Video);
    }

    #[test]
    fn content_type_rejects_unknown_values() {
        let err = "audio".parse::<ContentType>().unwrap_err();
        assert!(err.contains("audio"));
    }

    #[test]
    fn content_type_deserializes_lowercase() {
        let ct: ContentType = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(ct, ContentType::Text);
        assert!(serde_json::from_str::<ContentType>("\"TEXT\"").is_err());
    }

    #[test]
    fn only_media_types_have_a_media_kind() {
        assert!(ContentType::Text.media_kind().is_none());
        assert_eq!(ContentType::Image.media_kind(), Some(MediaKind::Image));
        assert_eq!(ContentType::Video.media_kind(), Some(MediaKind::Video));
    }

    #[test]
    fn verify_response_uses_the_wire_field_names() {
        let response = VerifyResponse {
            verification_id: "abc".to_string(),
            status: "completed".to_string(),
            confidence: 0.87,
            classification: "Verificado".to_string(),
            explanation: "ok".to_string(),
            sources: vec!["https://a".to_string(), "https://b".to_string()],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["verification_id"], "abc");
        assert_eq!(value["classification"], "Verificado");
        assert_eq!(value["confidence"], 0.87);
        assert_eq!(value["sources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn top_score_returns_the_maximum() {
        let analysis = TextAnalysis {
            predicted: "a".to_string(),
            scores: vec![
                LabelScore { label: "a".to_string(), score: 0.7 },
                LabelScore { label: "b".to_string(), score: 0.3 },
            ],
            token_count: 4,
        };
        assert!((analysis.top_score() - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn top_score_of_empty_distribution_is_zero() {
        let analysis = TextAnalysis {
            predicted: String::new(),
            scores: Vec::new(),
            token_count: 0,
        };
        assert_eq!(analysis.top_score(), 0.0);
    }
}
