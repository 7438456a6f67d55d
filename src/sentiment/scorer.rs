//! # Lexicon Scorer
//!
//! Scores one text: the lexicon weights of matched terms are summed and the
//! raw sum is squashed into [-1, 1].

use super::lexicon::{tokenize, Lexicon};
use crate::config::SentimentSettings;
use crate::defaults::{
    CONFIDENCE_FULL_LENGTH, NEGATIVE_THRESHOLD, POSITIVE_THRESHOLD, SENTIMENT_NORMALIZER,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentiment class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a normalized score: above 0.1 positive, below -0.1 negative
pub fn classify(score: f64) -> SentimentLabel {
    if score > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if score < NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Sentiment of one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    /// Normalized score in [-1, 1]
    pub score: f64,
    /// Trust in the score in [0, 1]; short texts stay low
    pub confidence: f64,
    /// Sum of matched weights before normalization
    pub raw_score: i32,
    /// Raw score per token
    pub comparative: f64,
    pub token_count: usize,
    /// Whitespace-separated words, used for confidence
    pub word_count: usize,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl SentimentScore {
    /// Result for empty or missing text
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            confidence: 0.0,
            raw_score: 0,
            comparative: 0.0,
            token_count: 0,
            word_count: 0,
            positive: Vec::new(),
            negative: Vec::new(),
        }
    }
}

/// Scores texts against a [`Lexicon`]
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer {
    lexicon: Lexicon,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Default lexicon plus the configured extra terms
    pub fn from_settings(settings: &SentimentSettings) -> Self {
        Self::with_lexicon(
            Lexicon::new().with_terms(
                settings
                    .extra_terms
                    .iter()
                    .map(|(term, weight)| (term.clone(), *weight)),
            ),
        )
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Score one text; never fails
    pub fn score(&self, text: &str) -> SentimentScore {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return SentimentScore::neutral();
        }

        let matches = self.lexicon.find_matches(&tokens);
        let raw_score: i32 = matches.iter().map(|m| m.weight).sum();
        let (positive, negative): (Vec<_>, Vec<_>) =
            matches.into_iter().filter(|m| m.weight != 0).partition(|m| m.weight > 0);

        let score = (raw_score as f64 / SENTIMENT_NORMALIZER).clamp(-1.0, 1.0);
        let word_count = text.split_whitespace().count();
        let length_factor = (word_count as f64 / CONFIDENCE_FULL_LENGTH).min(1.0);

        SentimentScore {
            label: classify(score),
            score,
            confidence: (score.abs() * length_factor).min(1.0),
            raw_score,
            comparative: raw_score as f64 / tokens.len() as f64,
            token_count: tokens.len(),
            word_count,
            positive: positive.into_iter().map(|m| m.term).collect(),
            negative: negative.into_iter().map(|m| m.term).collect(),
        }
    }

    /// Score text that may be absent
    pub fn score_opt(&self, text: Option<&str>) -> SentimentScore {
        text.map_or_else(SentimentScore::neutral, |t| self.score(t))
    }
}
