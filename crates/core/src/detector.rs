use crate::error::PipelineError;
use crate::models::Format;
use std::io::Cursor;
use std::path::Path;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
const PDF_HEADER_WINDOW: usize = 1024;
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const DOCX_MANIFEST_ENTRY: &str = "word/document.xml";
pub const DEFAULT_PLAIN_TEXT_CEILING: usize = 2 * 1024 * 1024;

/// Signatures of formats we recognise but refuse to process.
const REJECTED_SIGNATURES: [(&[u8], &str); 6] = [
    (b"\x89PNG\r\n\x1a\n", "png image"),
    (b"\xff\xd8\xff", "jpeg image"),
    (b"GIF8", "gif image"),
    (b"{\\rtf", "rtf document"),
    (b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1", "legacy office document"),
    (b"\x7fELF", "executable"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sniffed {
    Known(Format),
    Rejected(&'static str),
    Inconclusive,
}

#[derive(Debug, Clone, Copy)]
pub struct FormatDetector {
    pub plain_text_ceiling: usize,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self {
            plain_text_ceiling: DEFAULT_PLAIN_TEXT_CEILING,
        }
    }
}

impl FormatDetector {
    pub fn new(plain_text_ceiling: usize) -> Self {
        Self { plain_text_ceiling }
    }

    /// Classifies `bytes` by magic bytes first, then by the extension of
    /// `filename`, then as plain text. Ambiguous input is rejected.
    pub fn detect(&self, bytes: &[u8], filename: &str) -> Result<Format, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{filename} is empty"
            )));
        }

        match sniff(bytes) {
            Sniffed::Known(format) => return Ok(format),
            Sniffed::Rejected(kind) => {
                return Err(PipelineError::UnsupportedFormat(format!(
                    "{filename} looks like a {kind}"
                )))
            }
            Sniffed::Inconclusive => {}
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => return Ok(Format::Pdf),
            Some("docx") => return Ok(Format::Docx),
            Some("txt" | "text" | "md") => {
                return if std::str::from_utf8(bytes).is_ok() {
                    Ok(Format::Text)
                } else {
                    Err(PipelineError::UnsupportedFormat(format!(
                        "{filename} is declared as text but is not valid UTF-8"
                    )))
                };
            }
            _ => {}
        }

        if bytes.len() <= self.plain_text_ceiling && looks_like_text(bytes) {
            return Ok(Format::Text);
        }

        Err(PipelineError::UnsupportedFormat(format!(
            "could not classify {filename} as pdf, docx or text"
        )))
    }
}

/// Detection with the default plain-text ceiling.
pub fn detect(bytes: &[u8], filename: &str) -> Result<Format, PipelineError> {
    FormatDetector::default().detect(bytes, filename)
}

fn sniff(bytes: &[u8]) -> Sniffed {
    // Zip first: a stored entry can carry `%PDF-` inside the header window.
    if bytes.starts_with(ZIP_SIGNATURE) {
        match zip::ZipArchive::new(Cursor::new(bytes)) {
            Ok(archive) => {
                return if archive.file_names().any(|name| name == DOCX_MANIFEST_ENTRY) {
                    Sniffed::Known(Format::Docx)
                } else {
                    Sniffed::Rejected("zip archive without a word document")
                };
            }
            Err(_) => return Sniffed::Inconclusive,
        }
    }

    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    if window
        .windows(PDF_SIGNATURE.len())
        .any(|candidate| candidate == PDF_SIGNATURE)
    {
        return Sniffed::Known(Format::Pdf);
    }

    for (signature, kind) in REJECTED_SIGNATURES {
        if bytes.starts_with(signature) {
            return Sniffed::Rejected(kind);
        }
    }

    Sniffed::Inconclusive
}

fn looks_like_text(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(text) => !text
            .chars()
            .any(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t' | '\u{c}')),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(entries: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for name in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("entry should start");
            writer.write_all(b"<x/>").expect("entry should be written");
        }
        writer.finish().expect("zip should finish").into_inner()
    }

    #[test]
    fn pdf_signature_wins_over_extension() {
        let format = detect(b"%PDF-1.7\n...", "resume.txt").expect("pdf should be detected");
        assert_eq!(format, Format::Pdf);
    }

    #[test]
    fn zip_with_word_manifest_is_docx() {
        let bytes = zip_with(&["[Content_Types].xml", DOCX_MANIFEST_ENTRY]);
        assert_eq!(detect(&bytes, "upload.bin").expect("docx"), Format::Docx);
    }

    #[test]
    fn stored_docx_mentioning_pdf_is_still_docx() {
        let stored =
            || SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("notes.txt", stored()).expect("entry should start");
        writer
            .write_all(b"%PDF-1.4 export of the same resume")
            .expect("entry should be written");
        writer
            .start_file(DOCX_MANIFEST_ENTRY, stored())
            .expect("entry should start");
        writer.write_all(b"<w:document/>").expect("entry should be written");
        let bytes = writer.finish().expect("zip should finish").into_inner();

        assert_eq!(detect(&bytes, "resume.docx").expect("docx"), Format::Docx);
    }

    #[test]
    fn zip_without_word_manifest_is_rejected() {
        let bytes = zip_with(&["content.xml", "mimetype"]);
        let result = detect(&bytes, "resume.docx");
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn known_image_signature_is_rejected() {
        let result = detect(b"\x89PNG\r\n\x1a\nrest", "resume.txt");
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn extension_is_used_when_sniffing_is_inconclusive() {
        assert_eq!(detect(b"garbage", "cv.pdf").expect("pdf"), Format::Pdf);
        assert_eq!(detect(b"notes", "cv.md").expect("text"), Format::Text);
    }

    #[test]
    fn utf8_without_extension_is_text() {
        let format = detect("Jane Doe\nSKILLS\nRust".as_bytes(), "resume").expect("text");
        assert_eq!(format, Format::Text);
    }

    #[test]
    fn binary_without_extension_is_rejected() {
        let result = detect(&[0x00, 0x9f, 0x92, 0x96, 0x01], "resume");
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn text_over_ceiling_without_extension_is_rejected() {
        let detector = FormatDetector::new(8);
        let result = detector.detect(b"plain text over the ceiling", "resume");
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            detect(b"", "resume.txt"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }
}
