use crate::docx;
use crate::error::PipelineError;
use crate::models::{
    BlockKind, ExtractionLimits, ExtractionResult, ExtractionWarning, Format, RawDocument,
    TextBlock, WarningLocation,
};
use lopdf::Document;
use tracing::debug;

/// Text of one PDF page, or the reason it could not be decoded.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
    pub error: Option<String>,
}

impl PageText {
    pub fn readable(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            error: None,
        }
    }

    pub fn unreadable(number: u32, error: impl Into<String>) -> Self {
        Self {
            number,
            text: String::new(),
            error: Some(error.into()),
        }
    }
}

pub trait PdfExtractor: Send + Sync {
    /// Decodes every page of `bytes`. Must fail with `DocumentTooLarge`
    /// before decoding text when the page count exceeds `max_pages`.
    fn extract_pages(&self, bytes: &[u8], max_pages: usize)
        -> Result<Vec<PageText>, PipelineError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(
        &self,
        bytes: &[u8],
        max_pages: usize,
    ) -> Result<Vec<PageText>, PipelineError> {
        let document = Document::load_mem(bytes)
            .map_err(|error| PipelineError::ExtractionFailed(format!("pdf parse error: {error}")))?;

        if document.is_encrypted() {
            return Err(PipelineError::ExtractionFailed(
                "pdf is encrypted".to_string(),
            ));
        }

        let pages = document.get_pages();
        if pages.len() > max_pages {
            return Err(PipelineError::too_large("pages", pages.len(), max_pages));
        }

        let mut extracted = Vec::with_capacity(pages.len());
        for (page_no, _page_id) in pages {
            match document.extract_text(&[page_no]) {
                Ok(text) => extracted.push(PageText::readable(page_no, text)),
                Err(error) => extracted.push(PageText::unreadable(page_no, error.to_string())),
            }
        }

        Ok(extracted)
    }
}

/// Converts raw document bytes into normalized text, dispatching once on
/// the detected [`Format`].
#[derive(Debug, Clone)]
pub struct TextExtractor<P = LopdfExtractor> {
    limits: ExtractionLimits,
    pdf: P,
}

impl TextExtractor<LopdfExtractor> {
    pub fn new(limits: ExtractionLimits) -> Self {
        Self {
            limits,
            pdf: LopdfExtractor,
        }
    }
}

impl<P: PdfExtractor> TextExtractor<P> {
    pub fn with_pdf_extractor(limits: ExtractionLimits, pdf: P) -> Self {
        Self { limits, pdf }
    }

    pub fn limits(&self) -> &ExtractionLimits {
        &self.limits
    }

    pub fn extract(
        &self,
        document: &RawDocument,
        format: Format,
    ) -> Result<ExtractionResult, PipelineError> {
        if document.len() > self.limits.max_document_bytes {
            return Err(PipelineError::too_large(
                "bytes",
                document.len(),
                self.limits.max_document_bytes,
            ));
        }

        let assembled = match format {
            Format::Pdf => self.extract_pdf(document)?,
            Format::Docx => self.extract_docx(document)?,
            Format::Text => extract_plain_text(document)?,
        };

        debug!(
            file = document.filename(),
            %format,
            blocks = assembled.boundaries.len(),
            warnings = assembled.warnings.len(),
            "document extracted"
        );

        Ok(assembled.finish(self.limits.max_text_chars))
    }

    fn extract_pdf(&self, document: &RawDocument) -> Result<Assembled, PipelineError> {
        let pages = self
            .pdf
            .extract_pages(document.bytes(), self.limits.max_pages)?;
        if pages.len() > self.limits.max_pages {
            return Err(PipelineError::too_large(
                "pages",
                pages.len(),
                self.limits.max_pages,
            ));
        }

        let page_count = pages.len() as u32;
        let mut assembled = Assembled::new(BlockKind::Page);
        assembled.page_count = Some(page_count);

        for page in pages {
            if let Some(error) = page.error {
                assembled
                    .warnings
                    .push(ExtractionWarning::page(page.number, format!("unreadable ({error})")));
                continue;
            }

            let normalized = normalize_text(&page.text);
            if normalized.trim().is_empty() {
                assembled
                    .warnings
                    .push(ExtractionWarning::page(page.number, "no extractable text"));
                continue;
            }

            assembled.push_block(page.number, normalized.trim_matches('\n'));
        }

        if assembled.text.trim().is_empty() {
            return Err(PipelineError::ExtractionFailed(format!(
                "none of the {page_count} page(s) of {} had extractable text",
                document.filename()
            )));
        }

        Ok(assembled)
    }

    fn extract_docx(&self, document: &RawDocument) -> Result<Assembled, PipelineError> {
        let content = docx::read_document(document.bytes(), self.limits.max_xml_entry_bytes)?;
        let mut assembled = Assembled::new(BlockKind::Paragraph);

        for (index, paragraph) in content.paragraphs.iter().enumerate() {
            let normalized = normalize_text(paragraph);
            if normalized.trim().is_empty() {
                continue;
            }
            assembled.push_block(index as u32 + 1, normalized.trim_matches('\n'));
        }

        if assembled.text.trim().is_empty() {
            return Err(PipelineError::ExtractionFailed(format!(
                "none of the {} paragraph(s) of {} had text",
                content.paragraphs.len(),
                document.filename()
            )));
        }

        for &index in &content.nested_paragraphs {
            let has_text = content
                .paragraphs
                .get(index)
                .is_some_and(|paragraph| !paragraph.trim().is_empty());
            if has_text {
                assembled.warnings.push(ExtractionWarning::paragraph(
                    index as u32 + 1,
                    "text box content, which many ATS parsers skip",
                ));
            }
        }

        if content.has_tables {
            assembled.warnings.push(ExtractionWarning::document(
                "document contains tables, which many ATS parsers read out of order",
            ));
        }
        if content.has_drawings {
            assembled.warnings.push(ExtractionWarning::document(
                "document contains images or drawings whose text is not extractable",
            ));
        }

        Ok(assembled)
    }
}

fn extract_plain_text(document: &RawDocument) -> Result<Assembled, PipelineError> {
    let raw = std::str::from_utf8(document.bytes()).map_err(|error| {
        PipelineError::ExtractionFailed(format!(
            "{} is not valid UTF-8: {error}",
            document.filename()
        ))
    })?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let text = normalize_text(raw);

    if text.trim().is_empty() {
        return Err(PipelineError::ExtractionFailed(format!(
            "{} contains no text",
            document.filename()
        )));
    }

    let mut assembled = Assembled::new(BlockKind::Paragraph);
    assembled.boundaries = paragraph_blocks(&text);
    assembled.text = text;
    Ok(assembled)
}

/// Normalizes line endings and whitespace shared by every format: CRLF and
/// CR become LF, form feeds become LF, NBSP becomes a space, other control
/// characters are dropped and trailing whitespace is trimmed per line.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    let cleaned: String = unified
        .chars()
        .filter_map(|ch| match ch {
            '\r' | '\u{c}' => Some('\n'),
            '\u{a0}' => Some(' '),
            '\n' | '\t' => Some(ch),
            ch if ch.is_control() => None,
            ch => Some(ch),
        })
        .collect();

    cleaned
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Groups runs of non-blank lines into paragraph blocks.
fn paragraph_blocks(text: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut line_total = 0;

    for (index, line) in text.split('\n').enumerate() {
        line_total = index + 1;
        match (line.trim().is_empty(), start) {
            (false, None) => start = Some(index),
            (true, Some(begin)) => {
                blocks.push(TextBlock {
                    kind: BlockKind::Paragraph,
                    number: blocks.len() as u32 + 1,
                    start_line: begin,
                    line_count: index - begin,
                });
                start = None;
            }
            _ => {}
        }
    }

    if let Some(begin) = start {
        blocks.push(TextBlock {
            kind: BlockKind::Paragraph,
            number: blocks.len() as u32 + 1,
            start_line: begin,
            line_count: line_total - begin,
        });
    }

    blocks
}

/// Extraction output under construction.
#[derive(Debug)]
struct Assembled {
    kind: BlockKind,
    text: String,
    boundaries: Vec<TextBlock>,
    warnings: Vec<ExtractionWarning>,
    page_count: Option<u32>,
    next_line: usize,
}

impl Assembled {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            text: String::new(),
            boundaries: Vec::new(),
            warnings: Vec::new(),
            page_count: None,
            next_line: 0,
        }
    }

    fn push_block(&mut self, number: u32, block: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        let line_count = block.split('\n').count();
        self.boundaries.push(TextBlock {
            kind: self.kind,
            number,
            start_line: self.next_line,
            line_count,
        });
        self.text.push_str(block);
        self.next_line += line_count;
    }

    fn finish(self, max_text_chars: usize) -> ExtractionResult {
        let Assembled {
            text,
            mut boundaries,
            warnings,
            page_count,
            ..
        } = self;

        let (text, truncated) = match truncate_at_line(&text, max_text_chars) {
            Some(cut) => (cut, true),
            None => (text, false),
        };

        if truncated {
            let kept_lines = text.split('\n').count();
            boundaries.retain(|block| block.start_line < kept_lines);
            for block in &mut boundaries {
                block.line_count = block.line_count.min(kept_lines - block.start_line);
            }
        }

        ExtractionResult {
            text,
            boundaries,
            warnings: sort_warnings(warnings),
            page_count,
            truncated,
        }
    }
}

/// Cuts `text` to at most `max_chars` characters, ending on a line break
/// when one exists. Returns `None` when no cut is needed.
fn truncate_at_line(text: &str, max_chars: usize) -> Option<String> {
    let (byte_limit, _) = text.char_indices().nth(max_chars)?;
    let head = &text[..byte_limit];
    let cut = match head.rfind('\n') {
        Some(newline) if newline > 0 => &head[..newline],
        _ => head,
    };
    Some(cut.to_string())
}

fn sort_warnings(mut warnings: Vec<ExtractionWarning>) -> Vec<ExtractionWarning> {
    warnings.sort_by_key(|warning| match warning.location {
        WarningLocation::Page(number) | WarningLocation::Paragraph(number) => (0, number),
        WarningLocation::Document => (1, 0),
    });
    warnings
}
