//! Shared key generation for storage backends.
//!
//! Key format: uploads go to `uploads/{filename}`, the converter writes
//! `converted/{basename}.pdf`.

use pdfdrop_core::constants::{OUTPUT_EXTENSION, OUTPUT_PREFIX, UPLOAD_PREFIX};

/// Key an uploaded file is stored under.
pub fn upload_key(filename: &str) -> String {
    format!("{}/{}", UPLOAD_PREFIX, filename)
}

/// Key the converted PDF for `filename` is expected at.
///
/// Only the final `.` segment is dropped, so `archive.tar.gz` becomes
/// `converted/archive.tar.pdf`. A name without any `.` has an empty basename
/// and maps to `converted/.pdf`.
pub fn derive_output_key(filename: &str) -> String {
    let basename = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or("");
    format!("{}/{}.{}", OUTPUT_PREFIX, basename, OUTPUT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_extension() {
        assert_eq!(derive_output_key("report.docx"), "converted/report.pdf");
    }

    #[test]
    fn drops_only_final_segment() {
        assert_eq!(derive_output_key("archive.tar.gz"), "converted/archive.tar.pdf");
    }

    #[test]
    fn no_extension_gives_empty_basename() {
        assert_eq!(derive_output_key("noext"), "converted/.pdf");
        assert_eq!(derive_output_key(""), "converted/.pdf");
    }

    #[test]
    fn dotfiles_and_trailing_dots() {
        assert_eq!(derive_output_key(".bashrc"), "converted/.pdf");
        assert_eq!(derive_output_key("notes."), "converted/notes.pdf");
        assert_eq!(derive_output_key("a..b"), "converted/a..pdf");
    }

    #[test]
    fn is_deterministic() {
        for name in ["report.docx", "archive.tar.gz", "noext", "x y.z.doc"] {
            assert_eq!(derive_output_key(name), derive_output_key(name));
        }
    }

    #[test]
    fn upload_key_keeps_original_name() {
        assert_eq!(upload_key("report.docx"), "uploads/report.docx");
        assert_eq!(upload_key("noext"), "uploads/noext");
    }
}
