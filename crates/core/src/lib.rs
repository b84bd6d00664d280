pub mod assistant;
pub mod batch;
pub mod detector;
pub mod docx;
pub mod error;
pub mod extractor;
pub mod keywords;
pub mod models;
pub mod orchestrator;
pub mod profile;
pub mod providers;
pub mod scoring;
pub mod segmenter;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use assistant::{
    career_prompt, complete_with_retry, enrich, enrich_with_retry, parse_rewrite,
    rewrite_prompt, Enrichment, RetryPolicy, Rewrite, RewriteStyle,
};
pub use batch::{
    discover_resume_files, score_folder_best_effort, BatchReport, ScoredDocument,
    SkippedDocument,
};
pub use detector::{detect, FormatDetector};
pub use error::{PipelineError, ProviderError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor, TextExtractor};
pub use keywords::{tokenize, KeywordIndexBuilder};
pub use models::{
    AtsWeights, BlockKind, ExtractionLimits, ExtractionResult, ExtractionWarning, Format,
    KeywordOptions, KeywordSet, LineSpan, PipelineConfig, PipelineResult, RawDocument,
    ScoreKind, ScoreResult, Section, SectionLabel, TextBlock, WarningLocation,
};
pub use orchestrator::Pipeline;
pub use profile::{build_profile, extract_contact, ContactInfo, ExperienceLevel, Profile};
pub use providers::{GeminiProvider, OpenAiCompatibleProvider};
pub use scoring::{score_ats, score_match};
pub use segmenter::{classify_heading, segment, segment_text};
pub use traits::{CompletionContext, CompletionProvider};
