use crate::media::{MediaKind, MediaMetadata};
use crate::types::TextAnalysis;

/// Reference sources attached to text verdicts.
pub const TEXT_SOURCES: &[&str] = &[
    "https://www.gov.br",
    "https://www.who.int",
    "https://www.un.org",
];

/// Fixed confidence for media verdicts while media analysis is
/// metadata-only.
pub const IMAGE_CONFIDENCE: f64 = 0.7;
pub const VIDEO_CONFIDENCE: f64 = 0.6;

/// Verification verdict. The wire labels are the Portuguese display
/// strings the UI badge renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    Suspicious,
    Fake,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Verified => "Verificado",
            Verdict::Suspicious => "Suspeito",
            Verdict::Fake => "Falso",
        }
    }

    fn explanation(self) -> &'static str {
        match self {
            Verdict::Verified => {
                "O conteúdo foi verificado e considerado confiável com base em fontes oficiais."
            }
            Verdict::Suspicious => {
                "O conteúdo apresenta elementos que requerem verificação adicional."
            }
            Verdict::Fake => "O conteúdo apresenta indícios de desinformação.",
        }
    }
}

/// Everything the API reports about one piece of content.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub verdict: Verdict,
    pub confidence: f64,
    pub explanation: String,
    pub sources: Vec<String>,
}

/// Maps analysis output to a verdict. Text verdicts follow a threshold
/// rule over the model's top score; media verdicts are fixed until real
/// media analysis lands.
#[derive(Debug, Clone)]
pub struct Classifier {
    confidence_threshold: f64,
}

impl Classifier {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn assess_text(&self, analysis: &TextAnalysis) -> Assessment {
        let confidence = analysis.top_score();

        let verdict = if confidence >= self.confidence_threshold {
            Verdict::Verified
        } else if confidence >= 0.5 {
            Verdict::Suspicious
        } else {
            Verdict::Fake
        };

        Assessment {
            verdict,
            confidence,
            explanation: verdict.explanation().to_string(),
            sources: TEXT_SOURCES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn assess_media(&self, media: &MediaMetadata) -> Assessment {
        let (confidence, explanation) = match media.kind {
            MediaKind::Image => (
                IMAGE_CONFIDENCE,
                "A análise automática de imagens ainda está em desenvolvimento; o conteúdo requer verificação adicional.",
            ),
            MediaKind::Video => (
                VIDEO_CONFIDENCE,
                "A análise automática de vídeos ainda está em desenvolvimento; o conteúdo requer verificação adicional.",
            ),
        };

        Assessment {
            verdict: Verdict::Suspicious,
            confidence,
            explanation: explanation.to_string(),
            sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabelScore;

    fn analysis_with_top_score(score: f64) -> TextAnalysis {
        TextAnalysis {
            predicted: "confiável".to_string(),
            scores: vec![
                LabelScore {
                    label: "confiável".to_string(),
                    score,
                },
                LabelScore {
                    label: "não confiável".to_string(),
                    score: 1.0 - score,
                },
            ],
            token_count: 12,
        }
    }

    fn media(kind: MediaKind) -> MediaMetadata {
        MediaMetadata {
            filename: "arquivo".to_string(),
            extension: "jpg".to_string(),
            kind,
            size_bytes: 100,
        }
    }

    #[test]
    fn high_confidence_text_is_verified() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_text(&analysis_with_top_score(0.92));
        assert_eq!(assessment.verdict, Verdict::Verified);
        assert_eq!(assessment.verdict.label(), "Verificado");
        assert!((assessment.confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn threshold_is_inclusive() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_text(&analysis_with_top_score(0.85));
        assert_eq!(assessment.verdict, Verdict::Verified);
    }

    #[test]
    fn mid_confidence_text_is_suspicious() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_text(&analysis_with_top_score(0.6));
        assert_eq!(assessment.verdict, Verdict::Suspicious);
        assert_eq!(assessment.verdict.label(), "Suspeito");
    }

    #[test]
    fn low_confidence_text_is_fake() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_text(&analysis_with_top_score(0.3));
        assert_eq!(assessment.verdict, Verdict::Fake);
        assert_eq!(assessment.verdict.label(), "Falso");
        assert!(assessment.explanation.contains("desinformação"));
    }

    #[test]
    fn text_verdicts_carry_reference_sources() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_text(&analysis_with_top_score(0.9));
        assert_eq!(assessment.sources.len(), TEXT_SOURCES.len());
        assert!(assessment.sources[0].starts_with("https://"));
    }

    #[test]
    fn image_verdict_is_suspicious_at_fixed_confidence() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_media(&media(MediaKind::Image));
        assert_eq!(assessment.verdict, Verdict::Suspicious);
        assert!((assessment.confidence - IMAGE_CONFIDENCE).abs() < f64::EPSILON);
        assert!(assessment.sources.is_empty());
    }

    #[test]
    fn video_verdict_uses_the_video_confidence() {
        let classifier = Classifier::new(0.85);
        let assessment = classifier.assess_media(&media(MediaKind::Video));
        assert_eq!(assessment.verdict, Verdict::Suspicious);
        assert!((assessment.confidence - VIDEO_CONFIDENCE).abs() < f64::EPSILON);
    }
}
