use crate::detector::FormatDetector;
use crate::error::PipelineError;
use crate::extractor::{LopdfExtractor, PdfExtractor, TextExtractor};
use crate::keywords::KeywordIndexBuilder;
use crate::models::{KeywordSet, PipelineConfig, PipelineResult, RawDocument};
use crate::profile::build_profile;
use crate::scoring::{score_ats, score_match};
use crate::segmenter::segment;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Runs detection, extraction, segmentation, keyword indexing and scoring
/// for one document at a time. Holds no per-document state, so one
/// instance can serve concurrent invocations.
pub struct Pipeline<P = LopdfExtractor>
where
    P: PdfExtractor,
{
    config: PipelineConfig,
    detector: FormatDetector,
    extractor: TextExtractor<P>,
    keywords: KeywordIndexBuilder,
}

impl Pipeline<LopdfExtractor> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_pdf_extractor(config, LopdfExtractor)
    }
}

impl Default for Pipeline<LopdfExtractor> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<P> Pipeline<P>
where
    P: PdfExtractor,
{
    pub fn with_pdf_extractor(config: PipelineConfig, pdf: P) -> Self {
        Self {
            config,
            detector: FormatDetector::new(config.plain_text_ceiling),
            extractor: TextExtractor::with_pdf_extractor(config.limits, pdf),
            keywords: KeywordIndexBuilder::new(config.keywords),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reads `path` into a `RawDocument`, refusing files over
    /// `max_document_bytes` before their content is loaded.
    pub fn load(&self, path: &Path) -> Result<RawDocument, PipelineError> {
        let limit = self.config.limits.max_document_bytes as u64;
        let declared = fs::metadata(path)?.len();
        if declared > limit {
            return Err(PipelineError::DocumentTooLarge {
                unit: "bytes",
                actual: declared,
                limit,
            });
        }

        // The file may grow after the metadata check.
        let mut bytes = Vec::new();
        File::open(path)?
            .take(limit.saturating_add(1))
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > limit {
            return Err(PipelineError::DocumentTooLarge {
                unit: "bytes",
                actual: bytes.len() as u64,
                limit,
            });
        }

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        Ok(RawDocument::new(bytes, filename))
    }

    /// Keywords of a job description. A description without a single usable
    /// keyword, blank text included, is `InsufficientInput`.
    pub fn job_keywords(&self, job_description: &str) -> Result<KeywordSet, PipelineError> {
        let keywords = self.keywords.build_job(job_description);
        if keywords.is_empty() {
            return Err(PipelineError::InsufficientInput(
                "job description has no usable keywords".to_string(),
            ));
        }
        Ok(keywords)
    }

    /// Produces the structured profile of `document`.
    ///
    /// Any failure before scoring aborts the run. ATS scoring always runs;
    /// match scoring runs only when a job description is supplied, and a
    /// supplied description without usable keywords is an error rather than
    /// a zero score.
    pub fn run(
        &self,
        document: &RawDocument,
        job_description: Option<&str>,
    ) -> Result<PipelineResult, PipelineError> {
        let job_keywords = job_description
            .map(|text| self.job_keywords(text))
            .transpose()?;
        self.run_with_job_keywords(document, job_keywords.as_ref())
    }

    /// Same as `run` with the job keywords already built, so a batch
    /// tokenizes its job description once.
    pub fn run_with_job_keywords(
        &self,
        document: &RawDocument,
        job_keywords: Option<&KeywordSet>,
    ) -> Result<PipelineResult, PipelineError> {
        let format = self.detector.detect(document.bytes(), document.filename())?;
        debug!(file = document.filename(), %format, bytes = document.len(), "format detected");

        let extraction = self.extractor.extract(document, format)?;
        for warning in &extraction.warnings {
            warn!(file = document.filename(), %warning, "extraction warning");
        }

        let sections = segment(&extraction);
        debug!(
            file = document.filename(),
            sections = sections.len(),
            lines = extraction.lines().count(),
            "document segmented"
        );

        let profile = build_profile(&sections);
        let resume_keywords = self.keywords.build_resume(&sections);
        let ats_score = score_ats(&sections, &extraction.warnings, &self.config.ats_weights);

        let match_score = job_keywords
            .map(|job| score_match(&resume_keywords, job, self.config.max_hints))
            .transpose()?;

        debug!(
            file = document.filename(),
            ats = ats_score.total,
            matched = match_score.as_ref().map(|score| score.total),
            level = %profile.experience_level,
            "document scored"
        );

        Ok(PipelineResult {
            document_digest: document.digest(),
            format,
            page_count: extraction.page_count,
            truncated: extraction.truncated,
            extraction_warnings: extraction.warnings,
            sections,
            profile,
            keywords: resume_keywords,
            ats_score,
            match_score,
        })
    }
}
