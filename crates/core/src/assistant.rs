//! Prompt construction and response parsing for the optional AI rewrite
//! and career-advice features. Provider failures are carried as data next
//! to the scoring output and never replace it.

use crate::error::{PipelineError, ProviderError};
use crate::models::{PipelineResult, Section, SectionLabel};
use crate::traits::{CompletionContext, CompletionProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str =
    "You are an expert resume writer who helps job seekers present their experience clearly.";
const CAREER_KEYWORD_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStyle {
    #[default]
    Professional,
    AtsOptimized,
    Executive,
    Technical,
}

impl RewriteStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::AtsOptimized => "ats_optimized",
            Self::Executive => "executive",
            Self::Technical => "technical",
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            Self::Professional => "Maintain a professional tone suitable for most industries.",
            Self::AtsOptimized => {
                "Optimize for applicant tracking systems with relevant keywords."
            }
            Self::Executive => {
                "Use sophisticated language suitable for executive-level positions."
            }
            Self::Technical => "Emphasize technical skills and the specific technologies used.",
        }
    }
}

impl fmt::Display for RewriteStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewriteStyle {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "professional" => Ok(Self::Professional),
            "ats_optimized" | "ats" => Ok(Self::AtsOptimized),
            "executive" => Ok(Self::Executive),
            "technical" => Ok(Self::Technical),
            other => Err(PipelineError::InvalidArgument(format!(
                "unknown rewrite style {other:?}"
            ))),
        }
    }
}

pub fn rewrite_prompt(section_text: &str, style: RewriteStyle) -> String {
    format!(
        "Rewrite the following resume text to be more impactful, specific and \
         achievement-oriented. Use strong action verbs and quantifiable results where \
         possible. Do not invent facts.\n\n\
         Style: {}\n\n\
         Original:\n{}\n\n\
         Reply in exactly this format:\n\
         Rewritten: <the rewritten text>\n\
         Improvements: <comma-separated list of the improvements made>",
        style.instructions(),
        section_text.trim()
    )
}

/// Summarizes a scored profile into a prompt asking for career directions.
pub fn career_prompt(result: &PipelineResult) -> String {
    let mut prompt = String::from(
        "Based on the resume profile below, suggest three suitable career paths. For each \
         path give a title, the matching skills and the most important missing skills.\n\n",
    );

    let labels: Vec<&str> = result
        .sections
        .iter()
        .map(|section| section.label.as_str())
        .collect();
    prompt.push_str(&format!("Sections: {}\n", labels.join(", ")));

    let mut keywords: Vec<(&str, f64)> = result.keywords.iter().collect();
    keywords.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.0.cmp(right.0)));
    let top: Vec<&str> = keywords
        .iter()
        .take(CAREER_KEYWORD_LIMIT)
        .map(|(token, _)| *token)
        .collect();
    prompt.push_str(&format!("Keywords: {}\n", top.join(", ")));
    prompt.push_str(&format!("ATS score: {:.2}/100\n", result.ats_score.total));

    if let Some(matched) = &result.match_score {
        prompt.push_str(&format!("Job match score: {:.2}/100\n", matched.total));
        if !matched.missing_keywords.is_empty() {
            prompt.push_str(&format!(
                "Missing job keywords: {}\n",
                matched.missing_keywords.join(", ")
            ));
        }
    }

    if let Some(skills) = result.section(SectionLabel::Skills) {
        prompt.push_str(&format!("\nSkills section:\n{}\n", skills.text()));
    }
    prompt
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    pub rewritten: String,
    pub improvements: Vec<String>,
}

/// Reads the `Rewritten:` and `Improvements:` lines of a completion.
/// Improvements may be comma-separated or continue as bullet lines.
pub fn parse_rewrite(response: &str) -> Result<Rewrite, ProviderError> {
    let content = response.trim().trim_matches(|ch| ch == '"' || ch == '\'');

    let mut rewritten = None;
    let mut improvements = Vec::new();
    let mut in_improvements = false;

    for raw in content.lines() {
        let line = raw.trim().trim_start_matches('*').trim();
        if let Some(rest) = strip_label(line, "rewritten:") {
            rewritten = Some(rest.trim_matches('*').trim().to_string());
            in_improvements = false;
        } else if let Some(rest) = strip_label(line, "improvements:") {
            in_improvements = true;
            improvements.extend(split_improvements(rest.trim_matches('*')));
        } else if in_improvements {
            match line.strip_prefix(['-', '•']) {
                Some(item) => improvements.extend(split_improvements(item)),
                None if line.is_empty() => {}
                None => in_improvements = false,
            }
        }
    }

    match rewritten {
        Some(rewritten) if !rewritten.is_empty() => Ok(Rewrite {
            rewritten,
            improvements,
        }),
        _ => Err(ProviderError::MalformedResponse(
            "completion has no \"Rewritten:\" line".to_string(),
        )),
    }
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label).then(|| &line[label.len()..])
}

fn split_improvements(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

/// How often a transient provider failure is retried. The wait grows
/// linearly: `backoff`, then `2 * backoff`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_secs(1),
        }
    }
}

pub async fn complete_with_retry(
    provider: &dyn CompletionProvider,
    prompt: &str,
    context: &CompletionContext,
    policy: RetryPolicy,
) -> Result<String, ProviderError> {
    let mut attempt = 0;
    loop {
        match provider.complete(prompt, context).await {
            Err(error) if error.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    provider = provider.name(),
                    attempt,
                    max_retries = policy.max_retries,
                    %error,
                    "transient provider failure, retrying"
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            outcome => return outcome,
        }
    }
}

/// Scoring output plus whatever the provider produced for it.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub result: PipelineResult,
    pub provider: String,
    pub style: RewriteStyle,
    pub rewritten_section: Option<SectionLabel>,
    /// `None` when the resume had no section text to rewrite.
    pub rewrite: Option<Result<Rewrite, ProviderError>>,
    pub career_advice: Result<String, ProviderError>,
}

impl Enrichment {
    pub fn is_complete(&self) -> bool {
        !matches!(self.rewrite, Some(Err(_))) && self.career_advice.is_ok()
    }
}

/// The section whose text gets rewritten: experience first, then summary,
/// then skills, then anything with content.
pub fn rewrite_target(result: &PipelineResult) -> Option<&Section> {
    [SectionLabel::Experience, SectionLabel::Summary, SectionLabel::Skills]
        .into_iter()
        .find_map(|label| {
            result
                .sections
                .iter()
                .find(|section| section.label == label && !section.is_empty())
        })
        .or_else(|| result.sections.iter().find(|section| !section.is_empty()))
}

pub async fn enrich(
    provider: &dyn CompletionProvider,
    result: PipelineResult,
    style: RewriteStyle,
) -> Enrichment {
    enrich_with_retry(provider, result, style, RetryPolicy::default()).await
}

pub async fn enrich_with_retry(
    provider: &dyn CompletionProvider,
    result: PipelineResult,
    style: RewriteStyle,
    policy: RetryPolicy,
) -> Enrichment {
    let context = CompletionContext::default().with_system(SYSTEM_PROMPT);

    let target = rewrite_target(&result);
    let rewritten_section = target.map(|section| section.label);
    let rewrite = match target {
        Some(section) => {
            let prompt = rewrite_prompt(&section.text(), style);
            Some(
                complete_with_retry(provider, &prompt, &context, policy)
                    .await
                    .and_then(|response| parse_rewrite(&response)),
            )
        }
        None => None,
    };

    let career_advice =
        complete_with_retry(provider, &career_prompt(&result), &context, policy).await;

    debug!(
        provider = provider.name(),
        rewrite_ok = matches!(rewrite, Some(Ok(_))),
        career_ok = career_advice.is_ok(),
        "enrichment finished"
    );

    Enrichment {
        result,
        provider: provider.name().to_string(),
        style,
        rewritten_section,
        rewrite,
        career_advice,
    }
}
