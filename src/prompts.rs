//! Classification prompt and verdict parsing.
//!
//! The prompt asks the model for a one-word answer; [`parse_verdict`] turns
//! whatever text comes back into a [`Verdict`]. Both live here so the wording
//! and the matching rule change together.
//!
//! Callers can override the prompt via [`crate::config::ClassifyConfig::prompt`].
//! A custom prompt must still ask for a SI/NO (or YES/NO) answer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default instruction sent with every image.
///
/// Asks for `SI` when the image holds objects, people, landscapes or other
/// semantic content and `NO` when it only holds basic geometric figures or
/// abstract patterns.
pub const DEFAULT_CLASSIFY_PROMPT: &str = "Analiza esta imagen y responde 'SI' si la imagen contiene \
objetos, personas, paisajes u otro contenido con significado semántico. Responde 'NO' si la imagen \
solo contiene figuras geométricas básicas sin significado (como círculos, cuadrados, líneas) o \
patrones abstractos sin contenido reconocible. Responde ÚNICAMENTE con SI o NO.";

/// The model's judgement of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Concrete semantic content; the image is routed.
    Meaningful,
    /// Geometric or abstract; the image stays in place.
    NotMeaningful,
    /// The answer matched no keyword; treated as not meaningful.
    Ambiguous,
}

impl Verdict {
    /// The routing flag: only [`Verdict::Meaningful`] is routed.
    pub fn is_meaningful(self) -> bool {
        matches!(self, Verdict::Meaningful)
    }

    /// Short label used in progress output.
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Meaningful => "meaningful",
            Verdict::NotMeaningful => "discarded",
            Verdict::Ambiguous => "ambiguous",
        }
    }
}

// Leading keyword, after any quotes/asterisks/whitespace, followed by a non-word char or the end.
static RE_VERDICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\p{L}\p{N}]*(SÍ|SI|YES|NO)(?:[^\p{L}\p{N}]|$)").unwrap());

/// Interpret the model's free-text answer.
///
/// Only the first word counts: `SI`, `SÍ` or `YES` → meaningful, `NO` → not
/// meaningful, case-insensitive and ignoring surrounding punctuation
/// (`"Sí."`, `"**NO**"`, `"SI, contiene una persona"`). Anything else is
/// [`Verdict::Ambiguous`].
pub fn parse_verdict(text: &str) -> Verdict {
    let normalised = text.trim().to_uppercase();
    match RE_VERDICT
        .captures(&normalised)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    {
        Some("SI") | Some("SÍ") | Some("YES") => Verdict::Meaningful,
        Some("NO") => Verdict::NotMeaningful,
        _ => Verdict::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_answers() {
        assert_eq!(parse_verdict("SI"), Verdict::Meaningful);
        assert_eq!(parse_verdict("NO"), Verdict::NotMeaningful);
    }

    #[test]
    fn case_accents_and_whitespace() {
        assert_eq!(parse_verdict("  si\n"), Verdict::Meaningful);
        assert_eq!(parse_verdict("Sí"), Verdict::Meaningful);
        assert_eq!(parse_verdict("no"), Verdict::NotMeaningful);
        assert_eq!(parse_verdict("Yes"), Verdict::Meaningful);
    }

    #[test]
    fn punctuation_and_trailing_explanation() {
        assert_eq!(parse_verdict("SI."), Verdict::Meaningful);
        assert_eq!(parse_verdict("**NO**"), Verdict::NotMeaningful);
        assert_eq!(parse_verdict("'SI'"), Verdict::Meaningful);
        assert_eq!(
            parse_verdict("SI, la imagen muestra una persona"),
            Verdict::Meaningful
        );
    }

    #[test]
    fn keyword_must_be_a_whole_word() {
        assert_eq!(parse_verdict("Nope"), Verdict::Ambiguous);
        assert_eq!(parse_verdict("Simple shapes"), Verdict::Ambiguous);
        assert_eq!(parse_verdict("Nothing recognisable"), Verdict::Ambiguous);
    }

    #[test]
    fn keyword_must_come_first() {
        assert_eq!(
            parse_verdict("La respuesta es SI"),
            Verdict::Ambiguous
        );
        assert_eq!(parse_verdict(""), Verdict::Ambiguous);
    }

    #[test]
    fn only_meaningful_is_routed() {
        assert!(Verdict::Meaningful.is_meaningful());
        assert!(!Verdict::NotMeaningful.is_meaningful());
        assert!(!Verdict::Ambiguous.is_meaningful());
    }

    #[test]
    fn default_prompt_asks_for_one_word() {
        assert!(DEFAULT_CLASSIFY_PROMPT.contains("ÚNICAMENTE con SI o NO"));
    }
}
