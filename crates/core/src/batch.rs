use crate::error::PipelineError;
use crate::extractor::PdfExtractor;
use crate::models::PipelineResult;
use crate::orchestrator::Pipeline;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use walkdir::WalkDir;

const RESUME_EXTENSIONS: [&str; 5] = ["pdf", "docx", "txt", "text", "md"];

pub fn discover_resume_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_resume = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                RESUME_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_resume {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub path: PathBuf,
    pub result: PipelineResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub scored: Vec<ScoredDocument>,
    pub skipped: Vec<SkippedDocument>,
}

/// Scores every resume under `folder`, one blocking task per file.
///
/// A document that fails is recorded in `skipped` with its reason and never
/// aborts the batch. A job description without usable keywords fails the
/// whole batch up front. Both lists come back in path order.
pub async fn score_folder_best_effort<P>(
    pipeline: Arc<Pipeline<P>>,
    folder: &Path,
    job_description: Option<&str>,
) -> Result<BatchReport, PipelineError>
where
    P: PdfExtractor + 'static,
{
    let files = discover_resume_files(folder);

    if files.is_empty() {
        return Err(PipelineError::InvalidArgument(format!(
            "no resume files found in {}",
            folder.display()
        )));
    }

    let job_keywords = job_description
        .map(|text| pipeline.job_keywords(text))
        .transpose()?
        .map(Arc::new);
    let mut tasks = JoinSet::new();

    for (index, path) in files.iter().cloned().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let job_keywords = job_keywords.clone();
        tasks.spawn_blocking(move || {
            let outcome = pipeline.load(&path).and_then(|document| {
                pipeline.run_with_job_keywords(&document, job_keywords.as_deref())
            });
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<Result<PipelineResult, PipelineError>>> =
        files.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(error) => warn!(%error, "scoring task did not complete"),
        }
    }

    let mut report = BatchReport::default();
    for (path, outcome) in files.into_iter().zip(outcomes) {
        match outcome {
            Some(Ok(result)) => report.scored.push(ScoredDocument { path, result }),
            Some(Err(error)) => {
                warn!(path = %path.display(), %error, "skipping resume");
                report.skipped.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                });
            }
            None => report.skipped.push(SkippedDocument {
                path,
                reason: "scoring task aborted".to_string(),
            }),
        }
    }

    info!(
        folder = %folder.display(),
        scored = report.scored.len(),
        skipped = report.skipped.len(),
        "batch finished"
    );
    Ok(report)
}
