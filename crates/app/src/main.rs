use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use resume_profile_core::providers::gemini::GEMINI_DEFAULT_MODEL;
use resume_profile_core::providers::openai::{OPENAI_DEFAULT_MODEL, OPENAI_ENDPOINT};
use resume_profile_core::providers::{gemini::GEMINI_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
use resume_profile_core::{
    enrich_with_retry, score_folder_best_effort, CompletionProvider, Enrichment,
    ExtractionLimits, GeminiProvider, KeywordOptions, OpenAiCompatibleProvider, Pipeline,
    PipelineConfig, PipelineResult, RetryPolicy, RewriteStyle, ScoreKind, ScoreResult,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "resume-profile", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Largest accepted document in bytes.
    #[arg(long, global = true, env = "RESUME_MAX_BYTES", default_value_t = 10 * 1024 * 1024)]
    max_bytes: usize,

    /// Largest accepted PDF page count.
    #[arg(long, global = true, env = "RESUME_MAX_PAGES", default_value_t = 50)]
    max_pages: usize,

    /// Weight multiplier for keywords found in SKILLS and EXPERIENCE.
    #[arg(long, global = true, env = "RESUME_SECTION_BOOST", default_value_t = 2.0)]
    section_boost: f64,
}

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        if !self.section_boost.is_finite() || self.section_boost < 1.0 {
            bail!("--section-boost must be a finite number >= 1.0");
        }
        if self.max_bytes == 0 || self.max_pages == 0 {
            bail!("--max-bytes and --max-pages must be positive");
        }

        let defaults = PipelineConfig::default();
        Ok(PipelineConfig {
            limits: ExtractionLimits {
                max_document_bytes: self.max_bytes,
                max_pages: self.max_pages,
                ..defaults.limits
            },
            keywords: KeywordOptions {
                section_boost: self.section_boost,
                ..defaults.keywords
            },
            ..defaults
        })
    }
}

#[derive(Args)]
struct JobArgs {
    /// File holding the job description to match against.
    #[arg(long, conflicts_with = "job_text")]
    job_file: Option<PathBuf>,

    /// Job description passed inline.
    #[arg(long)]
    job_text: Option<String>,
}

impl JobArgs {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        match (&self.job_file, &self.job_text) {
            (Some(path), _) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading job description {}", path.display()))?;
                Ok(Some(text))
            }
            (None, Some(text)) => Ok(Some(text.clone())),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderKind {
    Gemini,
    Openai,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, segment and score a single resume.
    Score {
        /// Resume file (PDF, DOCX or plain text).
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        job: JobArgs,
        /// Print the full result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Score every resume in a folder, skipping unreadable files.
    Batch {
        /// Folder searched recursively for resumes.
        #[arg(long)]
        folder: PathBuf,
        #[command(flatten)]
        job: JobArgs,
        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Score a resume, then ask a completion provider to rewrite it.
    Rewrite {
        /// Resume file (PDF, DOCX or plain text).
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        job: JobArgs,
        /// professional, ats_optimized, executive or technical.
        #[arg(long, default_value = "professional")]
        style: String,
        /// Completion backend.
        #[arg(long, value_enum, default_value_t = ProviderKind::Gemini)]
        provider: ProviderKind,
        /// Provider API key.
        #[arg(long, env = "RESUME_PROVIDER_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Model name; defaults per provider.
        #[arg(long)]
        model: Option<String>,
        /// Base URL of the provider API.
        #[arg(long)]
        endpoint: Option<String>,
        /// Retries for rate-limited or timed-out requests.
        #[arg(long, default_value = "3")]
        retries: u32,
        /// Base wait between retries in milliseconds; grows linearly.
        #[arg(long, default_value = "1000")]
        backoff_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let pipeline = Arc::new(Pipeline::new(cli.pipeline_config()?));

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "resume-profile boot"
    );

    match cli.command {
        Command::Score { file, job, json } => {
            let job_description = job.load().await?;
            let result = score_file(Arc::clone(&pipeline), &file, job_description).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&file, &result);
            }
        }
        Command::Batch { folder, job, json } => {
            let job_description = job.load().await?;
            let report =
                score_folder_best_effort(pipeline, &folder, job_description.as_deref()).await?;

            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped resume");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for scored in &report.scored {
                    print_report(&scored.path, &scored.result);
                    println!();
                }
                println!(
                    "{} resume(s) scored, {} skipped at {}",
                    report.scored.len(),
                    report.skipped.len(),
                    Utc::now().to_rfc3339()
                );
            }
        }
        Command::Rewrite {
            file,
            job,
            style,
            provider,
            api_key,
            model,
            endpoint,
            retries,
            backoff_ms,
        } => {
            let style: RewriteStyle = style.parse()?;
            let job_description = job.load().await?;
            let result = score_file(Arc::clone(&pipeline), &file, job_description).await?;

            let provider = build_provider(provider, api_key, model, endpoint)?;
            let policy = RetryPolicy {
                max_retries: retries,
                backoff: Duration::from_millis(backoff_ms),
            };
            info!(provider = provider.name(), %style, retries, "requesting rewrite");

            let enrichment = enrich_with_retry(provider.as_ref(), result, style, policy).await;
            match &enrichment.rewrite {
                Some(Err(error)) => warn!(%error, "rewrite unavailable"),
                None => warn!("resume has no section text to rewrite"),
                Some(Ok(_)) => {}
            }
            if let Err(error) = &enrichment.career_advice {
                warn!(%error, "career advice unavailable");
            }

            println!("{}", serde_json::to_string_pretty(&enrichment_json(&enrichment))?);
        }
    }

    Ok(())
}

async fn score_file(
    pipeline: Arc<Pipeline>,
    path: &Path,
    job_description: Option<String>,
) -> anyhow::Result<PipelineResult> {
    let owned_path = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let document = pipeline.load(&owned_path)?;
        pipeline.run(&document, job_description.as_deref())
    })
    .await
    .context("scoring task failed")?
    .with_context(|| format!("scoring {}", path.display()))?;
    Ok(result)
}

fn build_provider(
    kind: ProviderKind,
    api_key: String,
    model: Option<String>,
    endpoint: Option<String>,
) -> anyhow::Result<Box<dyn CompletionProvider>> {
    let provider: Box<dyn CompletionProvider> = match kind {
        ProviderKind::Gemini => Box::new(GeminiProvider::with_endpoint(
            endpoint.as_deref().unwrap_or(GEMINI_ENDPOINT),
            api_key,
            model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
            DEFAULT_REQUEST_TIMEOUT,
        )?),
        ProviderKind::Openai => Box::new(OpenAiCompatibleProvider::with_endpoint(
            endpoint.as_deref().unwrap_or(OPENAI_ENDPOINT),
            api_key,
            model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            DEFAULT_REQUEST_TIMEOUT,
        )?),
    };
    Ok(provider)
}

fn enrichment_json(enrichment: &Enrichment) -> serde_json::Value {
    let rewrite = match &enrichment.rewrite {
        Some(Ok(rewrite)) => json!({
            "section": enrichment.rewritten_section,
            "rewritten": rewrite.rewritten,
            "improvements": rewrite.improvements,
        }),
        Some(Err(error)) => json!({ "error": error.to_string() }),
        None => json!({ "skipped": "resume has no section text to rewrite" }),
    };
    let career = match &enrichment.career_advice {
        Ok(advice) => json!({ "advice": advice }),
        Err(error) => json!({ "error": error.to_string() }),
    };

    json!({
        "provider": enrichment.provider,
        "style": enrichment.style,
        "result": enrichment.result,
        "rewrite": rewrite,
        "career": career,
    })
}

fn print_report(path: &Path, result: &PipelineResult) {
    println!("file: {} ({})", path.display(), result.format);
    if let Some(pages) = result.page_count {
        println!("pages: {pages}");
    }
    if result.truncated {
        println!("note: text was truncated to the configured limit");
    }
    for warning in &result.extraction_warnings {
        println!("warning: {warning}");
    }

    let labels: Vec<&str> = result
        .sections
        .iter()
        .map(|section| section.label.as_str())
        .collect();
    println!("sections: {}", labels.join(", "));

    let contact = &result.profile.contact;
    let fields = [
        ("name", &contact.name),
        ("email", &contact.email),
        ("phone", &contact.phone),
        ("linkedin", &contact.linkedin),
        ("github", &contact.github),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            println!("{field}: {value}");
        }
    }
    println!("experience level: {}", result.profile.experience_level);
    println!("keywords: {}", result.keywords.len());

    print_score("ats", &result.ats_score);
    if let Some(matched) = &result.match_score {
        print_score("match", matched);
        if !matched.matched_keywords.is_empty() {
            println!("  matched: {}", matched.matched_keywords.join(", "));
        }
        if !matched.missing_keywords.is_empty() {
            println!("  missing: {}", matched.missing_keywords.join(", "));
        }
    }
}

fn print_score(name: &str, score: &ScoreResult) {
    println!("{name} score: {:.2}/100", score.total);
    if score.kind == ScoreKind::Ats {
        for (factor, points) in &score.breakdown {
            println!("  {factor}: {points:.2}");
        }
    }
    for hint in &score.hints {
        println!("  hint: {hint}");
    }
}
