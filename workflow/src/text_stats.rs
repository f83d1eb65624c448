use crate::stages::Analyzer;
use async_trait::async_trait;
use scraipe_core::{AnalyzerKind, CoreError};
use serde_json::json;

/// Local analyzer used when no language model is available. Reports basic
/// counts over the scraped text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextStatsAnalyzer;

impl TextStatsAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn stats(content: &str) -> serde_json::Value {
        let characters = content.chars().count();
        let words: Vec<&str> = content.split_whitespace().collect();
        let sentences = content
            .split(['.', '!', '?'])
            .filter(|sentence| sentence.chars().any(char::is_alphanumeric))
            .count();

        let word_chars: usize = words
            .iter()
            .map(|word| word.chars().filter(|c| c.is_alphanumeric()).count())
            .sum();
        let average_word_length = if words.is_empty() {
            0.0
        } else {
            (word_chars as f64 / words.len() as f64 * 100.0).round() / 100.0
        };

        json!({
            "characters": characters,
            "words": words.len(),
            "sentences": sentences,
            "average_word_length": average_word_length,
        })
    }
}

#[async_trait]
impl Analyzer for TextStatsAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::TextStats
    }

    async fn analyze(&self, content: &str) -> Result<serde_json::Value, CoreError> {
        Ok(Self::stats(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let stats = TextStatsAnalyzer::stats("Hips up. Tap early! Why?");
        assert_eq!(stats["characters"], 24);
        assert_eq!(stats["words"], 5);
        assert_eq!(stats["sentences"], 3);
        // Punctuation does not count towards word length: 17 / 5
        assert_eq!(stats["average_word_length"], 3.4);
    }

    #[test]
    fn test_empty_content() {
        let stats = TextStatsAnalyzer::stats("");
        assert_eq!(stats["characters"], 0);
        assert_eq!(stats["words"], 0);
        assert_eq!(stats["sentences"], 0);
        assert_eq!(stats["average_word_length"], 0.0);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let stats = TextStatsAnalyzer::stats("jiu-jítsu 🥋");
        assert_eq!(stats["characters"], 11);
        assert_eq!(stats["words"], 2);
    }

    #[tokio::test]
    async fn test_analyzer_kind_and_output() {
        let analyzer = TextStatsAnalyzer::new();
        assert_eq!(analyzer.kind(), AnalyzerKind::TextStats);
        let output = analyzer.analyze("One two.").await.unwrap();
        assert_eq!(output["words"], 2);
    }
}
