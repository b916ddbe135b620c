//! Phrase normalisation, shape, dictionary, and similarity checks.
//!
//! Pure and side-effect free: every function here takes its inputs
//! (including the dictionary and similarity model as trait objects) and
//! returns a `Result`, with no storage access — safe to call concurrently
//! from any number of handlers.

use crate::error::Error;

/// Function words permitted anywhere in a phrase without a dictionary check,
/// but which still count toward the 5-token limit.
const FUNCTION_WORDS: [&str; 4] = ["A", "AN", "THE", "I"];

const MIN_TOKENS: usize = 1;
const MAX_TOKENS: usize = 5;
const MIN_CHARS: usize = 2;
const MAX_CHARS: usize = 100;

/// A membership test over the preloaded word list (NASPA in production).
/// Implementations are expected to be loaded once at startup and are
/// read-only thereafter.
pub trait Dictionary: Send + Sync {
    fn contains(&self, word: &str) -> bool;
}

/// A deterministic sentence encoder's similarity capability:
/// `similarity(a, b)` must return the same value for the same pair of
/// strings every time it's called.
pub trait SimilarityModel: Send + Sync {
    /// Cosine similarity in `[-1.0, 1.0]`, normally `[0.0, 1.0]` for phrases.
    fn similarity(&self, a: &str, b: &str) -> f32;
}

/// Normalise a raw submission: trim, collapse internal whitespace, uppercase.
/// Idempotent: `normalise(normalise(x)) == normalise(x)`.
pub fn normalise(raw: &str) -> String {
    raw.split_ascii_whitespace()
        .map(|w| w.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_shape_valid(normalised: &str) -> bool {
    if normalised.len() < MIN_CHARS || normalised.len() > MAX_CHARS {
        return false;
    }
    if !normalised
        .chars()
        .all(|c| c.is_ascii_uppercase() || c == ' ')
    {
        return false;
    }
    let tokens: Vec<&str> = normalised.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.len() >= MIN_TOKENS && tokens.len() <= MAX_TOKENS
}

/// Dictionary-check every non-function token of an already shape-validated,
/// normalised phrase.
fn all_tokens_known(normalised: &str, dictionary: &dyn Dictionary) -> bool {
    normalised.split(' ').filter(|t| !t.is_empty()).all(|tok| {
        FUNCTION_WORDS.contains(&tok) || dictionary.contains(tok)
    })
}

/// Validate a prompt submission: shape + dictionary only.
pub fn validate_prompt(raw: &str, dictionary: &dyn Dictionary) -> Result<String, Error> {
    let normalised = normalise(raw);
    if !is_shape_valid(&normalised) {
        return Err(Error::InvalidPhrase);
    }
    if !all_tokens_known(&normalised, dictionary) {
        return Err(Error::InvalidPhrase);
    }
    Ok(normalised)
}

/// Validate a copy submission: shape + dictionary, then must differ from the
/// (already normalised) original and stay strictly below the similarity
/// threshold.
pub fn validate_copy(
    raw: &str,
    original_normalised: &str,
    dictionary: &dyn Dictionary,
    similarity_model: &dyn SimilarityModel,
    similarity_threshold: f32,
) -> Result<String, Error> {
    let normalised = normalise(raw);
    if !is_shape_valid(&normalised) {
        return Err(Error::InvalidPhrase);
    }
    if !all_tokens_known(&normalised, dictionary) {
        return Err(Error::InvalidPhrase);
    }
    if normalised == original_normalised {
        return Err(Error::DuplicatePhrase);
    }
    if similarity_model.similarity(&normalised, original_normalised) >= similarity_threshold {
        return Err(Error::DuplicatePhrase);
    }
    Ok(normalised)
}

/// An in-memory dictionary backed by a loaded word set. Production callers
/// build this once at startup from the NASPA word list;
/// `data/dictionary.txt` ships a representative subset for tests and local
/// development.
pub struct WordSetDictionary {
    words: std::collections::HashSet<String>,
}

impl WordSetDictionary {
    pub fn from_words<I: IntoIterator<Item = String>>(words: I) -> Self {
        WordSetDictionary {
            words: words.into_iter().map(|w| w.to_ascii_uppercase()).collect(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_words(text.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()))
    }
}

impl Dictionary for WordSetDictionary {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> WordSetDictionary {
        WordSetDictionary::from_words(
            ["FAMOUS", "POPULAR", "WEALTHY", "FAST", "QUICK", "CAT", "DOG"]
                .into_iter()
                .map(String::from),
        )
    }

    #[test]
    fn normalise_is_idempotent() {
        let raw = "  quick   Brown   ";
        let once = normalise(raw);
        let twice = normalise(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalise_collapses_and_uppercases() {
        assert_eq!(normalise("  fast   cat "), "FAST CAT");
    }

    #[test]
    fn accepts_function_words_without_dictionary_hit() {
        let d = dict();
        assert_eq!(validate_prompt("THE CAT", &d).unwrap(), "THE CAT");
    }

    #[test]
    fn rejects_unknown_token() {
        let d = dict();
        assert_eq!(validate_prompt("ZZQX", &d), Err(Error::InvalidPhrase));
    }

    #[test]
    fn rejects_too_many_tokens() {
        let d = dict();
        assert_eq!(
            validate_prompt("THE CAT AND DOG AND CAT", &d),
            Err(Error::InvalidPhrase)
        );
    }

    #[test]
    fn rejects_non_letter_characters() {
        let d = dict();
        assert_eq!(validate_prompt("CAT123", &d), Err(Error::InvalidPhrase));
    }

    struct FixedSimilarity(f32);
    impl SimilarityModel for FixedSimilarity {
        fn similarity(&self, _a: &str, _b: &str) -> f32 {
            self.0
        }
    }

    #[test]
    fn copy_equal_to_original_is_duplicate() {
        let d = dict();
        let sim = FixedSimilarity(0.0);
        let err = validate_copy("FAMOUS", "FAMOUS", &d, &sim, 0.85).unwrap_err();
        assert_eq!(err, Error::DuplicatePhrase);
    }

    #[test]
    fn copy_above_threshold_is_duplicate() {
        let d = dict();
        let sim = FixedSimilarity(0.9);
        let err = validate_copy("POPULAR", "FAMOUS", &d, &sim, 0.85).unwrap_err();
        assert_eq!(err, Error::DuplicatePhrase);
    }

    #[test]
    fn copy_below_threshold_is_accepted() {
        let d = dict();
        let sim = FixedSimilarity(0.1);
        assert_eq!(
            validate_copy("POPULAR", "FAMOUS", &d, &sim, 0.85).unwrap(),
            "POPULAR"
        );
    }
}
