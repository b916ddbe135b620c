//! Prompt library boundary: the human-readable prompt library is an
//! external collaborator, out of scope for this core. `RoundService` only
//! ever sees this trait, the same way [`crate::validator`] only ever sees
//! `Dictionary` and `SimilarityModel` — the library's contents are data, not
//! engine logic.

use uuid::Uuid;

/// A read-only source of prompts, loaded once at startup.
pub trait PromptSource: Send + Sync {
    /// Pick one prompt at random. `None` only if the library is empty.
    fn random_prompt(&self) -> Option<(Uuid, String)>;
}

/// A prompt source backed by a fixed in-memory list, keyed by a stable id
/// derived from each line's content so restarts reuse the same ids.
pub struct WordListPromptSource {
    prompts: Vec<(Uuid, String)>,
}

impl WordListPromptSource {
    pub fn from_lines<I: IntoIterator<Item = String>>(lines: I) -> Self {
        let prompts = lines
            .into_iter()
            .map(|text| (Uuid::new_v5(&Uuid::NAMESPACE_OID, text.as_bytes()), text))
            .collect();
        WordListPromptSource { prompts }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()))
    }
}

impl PromptSource for WordListPromptSource {
    fn random_prompt(&self) -> Option<(Uuid, String)> {
        if self.prompts.is_empty() {
            return None;
        }
        let idx = rand::random::<usize>() % self.prompts.len();
        Some(self.prompts[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_returns_none() {
        let src = WordListPromptSource::from_lines(Vec::<String>::new());
        assert!(src.random_prompt().is_none());
    }

    #[test]
    fn nonempty_source_always_returns_one_of_its_lines() {
        let src = WordListPromptSource::from_text("FAMOUS\nHAPPY\nQUIET");
        for _ in 0..20 {
            let (_, text) = src.random_prompt().unwrap();
            assert!(["FAMOUS", "HAPPY", "QUIET"].contains(&text.as_str()));
        }
    }
}
