use crate::detector::DOCX_MANIFEST_ENTRY;
use crate::error::PipelineError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Paragraph text of a word document, in the order paragraphs open.
#[derive(Debug, Clone, Default)]
pub struct DocxContent {
    pub paragraphs: Vec<String>,
    /// Indices into `paragraphs` of paragraphs nested inside another one,
    /// which is how text boxes are stored.
    pub nested_paragraphs: Vec<usize>,
    pub has_tables: bool,
    pub has_drawings: bool,
}

pub fn read_document(bytes: &[u8], max_entry_bytes: u64) -> Result<DocxContent, PipelineError> {
    let xml = read_manifest_entry(bytes, max_entry_bytes)?;
    parse_document_xml(&xml)
}

fn read_manifest_entry(bytes: &[u8], max_entry_bytes: u64) -> Result<Vec<u8>, PipelineError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| PipelineError::ExtractionFailed(format!("docx archive: {error}")))?;
    let entry = archive.by_name(DOCX_MANIFEST_ENTRY).map_err(|error| {
        PipelineError::ExtractionFailed(format!("{DOCX_MANIFEST_ENTRY}: {error}"))
    })?;

    // Read one byte past the limit so an entry of exactly the limit passes.
    let mut xml = Vec::new();
    entry
        .take(max_entry_bytes.saturating_add(1))
        .read_to_end(&mut xml)
        .map_err(|error| PipelineError::ExtractionFailed(format!("docx entry: {error}")))?;

    if xml.len() as u64 > max_entry_bytes {
        return Err(PipelineError::DocumentTooLarge {
            unit: "decompressed bytes",
            actual: xml.len() as u64,
            limit: max_entry_bytes,
        });
    }

    Ok(xml)
}

fn parse_document_xml(xml: &[u8]) -> Result<DocxContent, PipelineError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut content = DocxContent::default();
    // Open paragraphs, innermost last, as indices into `content.paragraphs`.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"p" => {
                    if !open.is_empty() {
                        content.nested_paragraphs.push(content.paragraphs.len());
                    }
                    open.push(content.paragraphs.len());
                    content.paragraphs.push(String::new());
                }
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                b"tab" if !in_tab_stops => push_to_open(&mut content, &open, "\t"),
                b"br" | b"cr" => push_to_open(&mut content, &open, "\n"),
                b"tbl" => content.has_tables = true,
                b"drawing" | b"pict" => content.has_drawings = true,
                _ => {}
            },
            Ok(Event::Empty(element)) => match element.local_name().as_ref() {
                b"p" => {
                    if !open.is_empty() {
                        content.nested_paragraphs.push(content.paragraphs.len());
                    }
                    content.paragraphs.push(String::new());
                }
                b"tab" if !in_tab_stops => push_to_open(&mut content, &open, "\t"),
                b"br" | b"cr" => push_to_open(&mut content, &open, "\n"),
                b"drawing" | b"pict" => content.has_drawings = true,
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                let unescaped = text.unescape().map_err(|error| {
                    PipelineError::ExtractionFailed(format!("docx text: {error}"))
                })?;
                push_to_open(&mut content, &open, &unescaped);
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                b"p" => {
                    open.pop();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(PipelineError::ExtractionFailed(format!(
                    "docx xml at byte {}: {error}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(content)
}

/// Text outside any paragraph is dropped.
fn push_to_open(content: &mut DocxContent, open: &[usize], text: &str) {
    if let Some(paragraph) = open.last().and_then(|&index| content.paragraphs.get_mut(index)) {
        paragraph.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::docx_bytes;

    #[test]
    fn paragraphs_keep_document_order() {
        let bytes = docx_bytes(&["Jane Doe", "SKILLS", "Rust & Go"], false);
        let content = read_document(&bytes, 1024 * 1024).expect("docx should parse");
        assert_eq!(content.paragraphs, vec!["Jane Doe", "SKILLS", "Rust & Go"]);
        assert!(!content.has_tables);
    }

    #[test]
    fn runs_tabs_and_breaks_are_joined() {
        let xml = br#"<w:document xmlns:w="urn:w"><w:body>
            <w:p><w:r><w:t>Senior</w:t></w:r><w:r><w:t xml:space="preserve"> Engineer</w:t></w:r><w:r><w:tab/><w:t>2020</w:t></w:r></w:p>
            <w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
            <w:p/>
        </w:body></w:document>"#;

        let content = parse_document_xml(xml).expect("xml should parse");
        assert_eq!(
            content.paragraphs,
            vec!["Senior Engineer\t2020", "line one\nline two", ""]
        );
    }

    #[test]
    fn text_box_paragraphs_do_not_split_their_host() {
        let xml = br#"<w:document xmlns:w="urn:w"><w:body>
            <w:p><w:r><w:t>Jane</w:t></w:r><w:r><w:drawing><w:txbxContent>
                <w:p><w:r><w:t>Inner</w:t></w:r></w:p>
            </w:txbxContent></w:drawing></w:r><w:r><w:t xml:space="preserve"> Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t>After</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let content = parse_document_xml(xml).expect("xml should parse");
        assert_eq!(content.paragraphs, vec!["Jane Doe", "Inner", "After"]);
        assert_eq!(content.nested_paragraphs, vec![1]);
        assert!(content.has_drawings);
    }

    #[test]
    fn tab_stop_definitions_are_not_text() {
        let xml = br#"<w:document xmlns:w="urn:w"><w:body>
            <w:p><w:pPr><w:tabs><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr><w:r><w:t>Acme</w:t><w:tab/><w:t>2020</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let content = parse_document_xml(xml).expect("xml should parse");
        assert_eq!(content.paragraphs, vec!["Acme\t2020"]);
    }

    #[test]
    fn drawings_are_flagged() {
        let xml = br#"<w:document xmlns:w="urn:w"><w:body>
            <w:p><w:r><w:drawing><wp:inline xmlns:wp="urn:wp"/></w:drawing></w:r></w:p>
        </w:body></w:document>"#;
        let content = parse_document_xml(xml).expect("xml should parse");
        assert!(content.has_drawings);
    }

    #[test]
    fn oversized_entry_is_rejected() {
        let bytes = docx_bytes(&["a paragraph long enough to exceed the limit"], false);
        let result = read_document(&bytes, 16);
        assert!(matches!(result, Err(PipelineError::DocumentTooLarge { .. })));
    }

    #[test]
    fn archive_without_manifest_fails() {
        let result = read_document(b"PK\x03\x04 not really a zip", 1024);
        assert!(matches!(result, Err(PipelineError::ExtractionFailed(_))));
    }
}
