//! Output naming: derive the translated file's name from the upload's.
//!
//! `report.docx` translated to `FR` becomes `report_FR.docx`; a name without
//! an extension gets the suffix appended (`notes` → `notes_FR`). A leading
//! dot alone does not count as an extension, so `.env` → `.env_FR`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that must not reach a quoted `Content-Disposition` filename.
static UNSAFE_HEADER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\x00-\x1F\x7F"\\]"#).expect("valid regex"));

/// Strip any directory components a client may have sent with the filename.
///
/// Browsers send bare names, but older clients (and curl with `;filename=`)
/// can send full Windows or Unix paths.
pub fn base_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Split a filename into `(stem, extension)`; the extension keeps its dot.
///
/// Only the last dot counts, and only when it is not the first character.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Compute the translated document's filename.
pub fn output_file_name(original_name: &str, target_lang: &str) -> String {
    let name = base_file_name(original_name);
    let (stem, ext) = split_extension(name);
    format!("{stem}_{target_lang}{ext}")
}

/// Extension usable for a temp file name: plain ASCII alphanumerics, no dot.
///
/// Returns `None` for anything else so a hostile filename can never shape
/// the temp path.
pub fn artifact_extension(original_name: &str) -> Option<&str> {
    let (_, ext) = split_extension(base_file_name(original_name));
    let ext = ext.strip_prefix('.')?;
    if !ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

/// Build an `attachment` `Content-Disposition` value for `file_name`.
pub fn content_disposition(file_name: &str) -> String {
    let safe = UNSAFE_HEADER_CHARS.replace_all(file_name, "_");
    format!("attachment; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_language_before_extension() {
        assert_eq!(output_file_name("report.docx", "FR"), "report_FR.docx");
        assert_eq!(output_file_name("deck.v2.pptx", "DE"), "deck.v2_DE.pptx");
    }

    #[test]
    fn appends_when_no_extension() {
        assert_eq!(output_file_name("notes", "FR"), "notes_FR");
        assert_eq!(output_file_name(".env", "FR"), ".env_FR");
    }

    #[test]
    fn drops_directory_components() {
        assert_eq!(output_file_name("C:\\Users\\me\\cv.pdf", "EN-GB"), "cv_EN-GB.pdf");
        assert_eq!(output_file_name("/tmp/x/readme.txt", "ES"), "readme_ES.txt");
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("a.b"), ("a", ".b"));
        assert_eq!(split_extension("a"), ("a", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("trailing."), ("trailing", "."));
    }

    #[test]
    fn artifact_extension_rejects_odd_input() {
        assert_eq!(artifact_extension("report.docx"), Some("docx"));
        assert_eq!(artifact_extension("notes"), None);
        assert_eq!(artifact_extension("trailing."), None);
        assert_eq!(artifact_extension("x.d o c"), None);
        assert_eq!(artifact_extension("evil.../../etc"), None);
    }

    #[test]
    fn content_disposition_quotes_and_sanitises() {
        assert_eq!(
            content_disposition("report_FR.docx"),
            "attachment; filename=\"report_FR.docx\""
        );
        assert_eq!(
            content_disposition("a\"b\r\n.pdf"),
            "attachment; filename=\"a_b__.pdf\""
        );
    }
}
