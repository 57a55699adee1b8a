//! File-name rules shared by the endpoint and the client.

/// Extension an upload must carry (compared case-insensitively).
pub const ACCEPTED_EXTENSION: &str = "pdf";

/// Extension of the produced artifact.
pub const ARTIFACT_EXTENSION: &str = "pptx";

/// MIME type of the produced artifact.
pub const ARTIFACT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Returns `true` if `file_name` ends in `.pdf`, ignoring case.
pub fn has_accepted_extension(file_name: &str) -> bool {
    split_accepted_extension(file_name).is_some()
}

/// Derive the artifact name by replacing a trailing `.pdf` (any case) with
/// `.pptx`. Names without the accepted extension get `.pptx` appended.
pub fn derive_artifact_name(file_name: &str) -> String {
    let stem = split_accepted_extension(file_name).unwrap_or(file_name);
    format!("{stem}.{ARTIFACT_EXTENSION}")
}

fn split_accepted_extension(file_name: &str) -> Option<&str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION).then_some(stem)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_pdf_in_any_case() {
        for name in ["deck.pdf", "DECK.PDF", "a.b.Pdf", ".pdf"] {
            assert!(has_accepted_extension(name), "{name} should be accepted");
        }
    }

    #[test]
    fn rejects_other_names() {
        for name in ["x.txt", "pdf", "deck.pdf.zip", "deckpdf", ""] {
            assert!(!has_accepted_extension(name), "{name} should be rejected");
        }
    }

    #[test]
    fn artifact_name_swaps_only_the_last_extension() {
        assert_eq!(derive_artifact_name("sample.pdf"), "sample.pptx");
        assert_eq!(derive_artifact_name("Q3.review.PDF"), "Q3.review.pptx");
        assert_eq!(derive_artifact_name("資料.pdf"), "資料.pptx");
    }

    #[test]
    fn artifact_name_appends_when_extension_missing() {
        assert_eq!(derive_artifact_name("notes"), "notes.pptx");
    }
}
