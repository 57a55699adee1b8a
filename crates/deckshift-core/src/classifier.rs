//! Outcome Classifier.
//!
//! Maps a non-zero converter exit plus its captured stderr to a user-facing
//! category. Matching is a heuristic over unstructured text: anything not
//! recognised falls back to [`FailureCategory::ConversionFailed`].
//!
//! New signatures are added to [`SIGNATURES`]; the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::outcome::ConversionOutcome;

/// Maximum number of characters of stderr forwarded to the caller.
pub const DIAGNOSTIC_EXCERPT_CHARS: usize = 800;

/// Substituted when the converter wrote nothing to stderr.
pub const NO_DIAGNOSTIC_PLACEHOLDER: &str = "(the converter produced no diagnostic output)";

/// User-facing category of a failed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The converter's own dependencies could not be resolved.
    DependencyMissing,
    /// Anything else.
    ConversionFailed,
}

impl FailureCategory {
    pub fn message(self) -> &'static str {
        match self {
            FailureCategory::DependencyMissing => "The converter's Python dependencies are missing.",
            FailureCategory::ConversionFailed => "Conversion failed.",
        }
    }
}

struct Signature {
    pattern: Regex,
    category: FailureCategory,
    hint: &'static str,
}

static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    vec![Signature {
        pattern: Regex::new(r#"ModuleNotFoundError|No module named ['"]"#)
            .expect("static regex is valid"),
        category: FailureCategory::DependencyMissing,
        hint: "Activate the virtual environment in the project root and run \
               `pip install -r requirements.txt`.",
    }]
});

/// Classify a converter that exited non-zero.
///
/// `exit_code` is `None` when the process was terminated by a signal.
pub fn classify(exit_code: Option<i32>, diagnostic: &str) -> ConversionOutcome {
    let trimmed = diagnostic.trim();
    let matched = SIGNATURES.iter().find(|s| s.pattern.is_match(trimmed));

    let (category, hint) = match matched {
        Some(sig) => (sig.category, Some(sig.hint.to_owned())),
        None => (FailureCategory::ConversionFailed, None),
    };

    ConversionOutcome::ProcessExitFailure {
        exit_code,
        category,
        diagnostic_excerpt: excerpt(trimmed),
        hint,
    }
}

fn excerpt(diagnostic: &str) -> String {
    if diagnostic.is_empty() {
        return NO_DIAGNOSTIC_PLACEHOLDER.to_owned();
    }
    diagnostic.chars().take(DIAGNOSTIC_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn unpack(outcome: ConversionOutcome) -> (FailureCategory, String, Option<String>) {
        match outcome {
            ConversionOutcome::ProcessExitFailure {
                category,
                diagnostic_excerpt,
                hint,
                ..
            } => (category, diagnostic_excerpt, hint),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn module_not_found_gets_a_hint() {
        let (category, detail, hint) =
            unpack(classify(Some(1), "ModuleNotFoundError: no module named 'x'"));
        assert_eq!(category, FailureCategory::DependencyMissing);
        assert!(detail.contains("ModuleNotFoundError"));
        assert!(!hint.unwrap().is_empty());
    }

    #[test]
    fn no_module_named_phrase_is_recognised() {
        let stderr = "Traceback (most recent call last):\nImportError: No module named 'fitz'";
        let (category, _, hint) = unpack(classify(Some(1), stderr));
        assert_eq!(category, FailureCategory::DependencyMissing);
        assert!(hint.is_some());
    }

    #[test]
    fn unknown_text_degrades_to_generic() {
        let (category, detail, hint) = unpack(classify(Some(2), "ValueError: PDF is corrupt"));
        assert_eq!(category, FailureCategory::ConversionFailed);
        assert_eq!(detail, "ValueError: PDF is corrupt");
        assert!(hint.is_none());
    }

    #[test]
    fn empty_stderr_uses_placeholder() {
        let (_, detail, hint) = unpack(classify(Some(1), "  \n "));
        assert_eq!(detail, NO_DIAGNOSTIC_PLACEHOLDER);
        assert!(hint.is_none());
    }

    #[test]
    fn excerpt_is_truncated_by_characters() {
        let long = "é".repeat(DIAGNOSTIC_EXCERPT_CHARS + 50);
        let (_, detail, _) = unpack(classify(None, &long));
        assert_eq!(detail.chars().count(), DIAGNOSTIC_EXCERPT_CHARS);
    }

    #[test]
    fn signal_exit_is_kept() {
        match classify(None, "killed") {
            ConversionOutcome::ProcessExitFailure { exit_code, .. } => assert_eq!(exit_code, None),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
