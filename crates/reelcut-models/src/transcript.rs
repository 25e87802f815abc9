//! Word-level transcripts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One transcript token with its time alignment in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

/// Transcript returned by the transcription service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Transcript {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Render the words as `[index] word` tokens for the selection prompt.
    pub fn indexed_text(&self) -> String {
        let mut out = String::with_capacity(self.words.len() * 12);
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("[{}] {}", i, w.word.trim()));
        }
        out
    }

    /// Time span covered by the inclusive word range, or `None` if out of bounds.
    pub fn time_span(&self, start_idx: usize, end_idx: usize) -> Option<(f64, f64)> {
        if start_idx > end_idx {
            return None;
        }
        let first = self.words.get(start_idx)?;
        let last = self.words.get(end_idx)?;
        Some((first.start, last.end))
    }

    /// Words whose start falls inside `[start, end)`.
    pub fn words_between(&self, start: f64, end: f64) -> impl Iterator<Item = &Word> {
        self.words
            .iter()
            .filter(move |w| w.start >= start && w.start < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcript {
        Transcript {
            text: "hello big world".to_string(),
            words: vec![
                Word::new("hello", 0.0, 0.4),
                Word::new(" big", 0.5, 0.8),
                Word::new("world", 0.9, 1.3),
            ],
        }
    }

    #[test]
    fn test_indexed_text() {
        assert_eq!(transcript().indexed_text(), "[0] hello [1] big [2] world");
    }

    #[test]
    fn test_time_span() {
        let t = transcript();
        assert_eq!(t.time_span(0, 2), Some((0.0, 1.3)));
        assert_eq!(t.time_span(1, 1), Some((0.5, 0.8)));
        assert_eq!(t.time_span(2, 3), None);
        assert_eq!(t.time_span(2, 1), None);
    }

    #[test]
    fn test_words_between() {
        let t = transcript();
        let words: Vec<_> = t.words_between(0.5, 1.0).map(|w| w.word.trim()).collect();
        assert_eq!(words, vec!["big", "world"]);
    }
}
