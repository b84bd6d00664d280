use crate::profile::Profile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Uploaded bytes plus the filename the client declared for them.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    filename: String,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-cased extension of the declared filename, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Docx,
    Text,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Text => "text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Page,
    Paragraph,
}

/// One page (PDF) or paragraph (DOCX, plain text) of the normalized text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub number: u32,
    pub start_line: usize,
    pub line_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "number", rename_all = "lowercase")]
pub enum WarningLocation {
    Page(u32),
    Paragraph(u32),
    Document,
}

/// A non-fatal extraction problem. Warnings travel as data and lower the
/// ATS score instead of aborting the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionWarning {
    pub location: WarningLocation,
    pub message: String,
}

impl ExtractionWarning {
    pub fn page(number: u32, message: impl Into<String>) -> Self {
        Self {
            location: WarningLocation::Page(number),
            message: message.into(),
        }
    }

    pub fn paragraph(number: u32, message: impl Into<String>) -> Self {
        Self {
            location: WarningLocation::Paragraph(number),
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self {
            location: WarningLocation::Document,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            WarningLocation::Page(number) => write!(f, "page {number}: {}", self.message),
            WarningLocation::Paragraph(number) => {
                write!(f, "paragraph {number}: {}", self.message)
            }
            WarningLocation::Document => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    pub boundaries: Vec<TextBlock>,
    pub warnings: Vec<ExtractionWarning>,
    pub page_count: Option<u32>,
    pub truncated: bool,
}

impl ExtractionResult {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum SectionLabel {
    Contact,
    Summary,
    Experience,
    Education,
    Skills,
    Other,
}

impl SectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::Contact => "CONTACT",
            SectionLabel::Summary => "SUMMARY",
            SectionLabel::Experience => "EXPERIENCE",
            SectionLabel::Education => "EDUCATION",
            SectionLabel::Skills => "SKILLS",
            SectionLabel::Other => "OTHER",
        }
    }
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open range of line indices into `ExtractionResult::text`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub label: SectionLabel,
    pub heading: Option<String>,
    pub heading_line: Option<usize>,
    pub spans: Vec<LineSpan>,
    pub lines: Vec<String>,
}

impl Section {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Normalized tokens with their weights. Backed by an ordered map so every
/// traversal is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeywordSet {
    weights: BTreeMap<String, f64>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `token`, keeping the larger of the existing and new weight.
    pub fn insert_max(&mut self, token: impl Into<String>, weight: f64) {
        let entry = self.weights.entry(token.into()).or_insert(weight);
        if weight > *entry {
            *entry = weight;
        }
    }

    pub fn weight(&self, token: &str) -> Option<f64> {
        self.weights.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.weights.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(token, weight)| (token.as_str(), *weight))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        for (token, weight) in iter {
            set.insert_max(token, weight);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Ats,
    Match,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub kind: ScoreKind,
    pub total: f64,
    pub breakdown: BTreeMap<String, f64>,
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    pub document_digest: String,
    pub format: Format,
    pub page_count: Option<u32>,
    pub truncated: bool,
    pub extraction_warnings: Vec<ExtractionWarning>,
    pub sections: Vec<Section>,
    pub profile: Profile,
    pub keywords: KeywordSet,
    pub ats_score: ScoreResult,
    pub match_score: Option<ScoreResult>,
}

impl PipelineResult {
    pub fn section(&self, label: SectionLabel) -> Option<&Section> {
        self.sections.iter().find(|section| section.label == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub max_document_bytes: usize,
    pub max_pages: usize,
    pub max_xml_entry_bytes: u64,
    pub max_text_chars: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: 10 * 1024 * 1024,
            max_pages: 50,
            max_xml_entry_bytes: 50 * 1024 * 1024,
            max_text_chars: 200_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordOptions {
    pub min_token_len: usize,
    pub section_boost: f64,
    pub job_skill_boost: f64,
}

impl Default for KeywordOptions {
    fn default() -> Self {
        Self {
            min_token_len: 2,
            section_boost: 2.0,
            job_skill_boost: 2.0,
        }
    }
}

/// Point values of the ATS checklist. The defaults sum to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtsWeights {
    pub contact: f64,
    pub experience: f64,
    pub education_or_skills: f64,
    pub clean_extraction: f64,
    pub conventional_order: f64,
    pub action_verbs: f64,
}

impl Default for AtsWeights {
    fn default() -> Self {
        Self {
            contact: 20.0,
            experience: 25.0,
            education_or_skills: 20.0,
            clean_extraction: 15.0,
            conventional_order: 10.0,
            action_verbs: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub plain_text_ceiling: usize,
    pub limits: ExtractionLimits,
    pub keywords: KeywordOptions,
    pub ats_weights: AtsWeights,
    pub max_hints: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            plain_text_ceiling: 2 * 1024 * 1024,
            limits: ExtractionLimits::default(),
            keywords: KeywordOptions::default(),
            ats_weights: AtsWeights::default(),
            max_hints: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_set_keeps_maximum_weight() {
        let mut set = KeywordSet::new();
        set.insert_max("rust", 1.0);
        set.insert_max("rust", 2.0);
        set.insert_max("rust", 1.0);
        assert_eq!(set.weight("rust"), Some(2.0));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn raw_document_extension_is_lowercased() {
        let doc = RawDocument::new(b"abc".to_vec(), "Jane_Doe.PDF");
        assert_eq!(doc.extension().as_deref(), Some("pdf"));
        assert_eq!(RawDocument::new(b"abc".to_vec(), "resume").extension(), None);
    }

    #[test]
    fn digest_is_reproducible() {
        let first = RawDocument::new(b"same bytes".to_vec(), "a.txt");
        let second = RawDocument::new(b"same bytes".to_vec(), "b.txt");
        assert_eq!(first.digest(), second.digest());
        assert_eq!(first.digest().len(), 64);
    }

    #[test]
    fn default_ats_weights_sum_to_one_hundred() {
        let w = AtsWeights::default();
        let sum = w.contact
            + w.experience
            + w.education_or_skills
            + w.clean_extraction
            + w.conventional_order
            + w.action_verbs;
        assert_eq!(sum, 100.0);
    }

    #[test]
    fn warning_display_names_page() {
        let warning = ExtractionWarning::page(3, "no extractable text");
        assert_eq!(warning.to_string(), "page 3: no extractable text");
    }
}
