//! Deterministic ATS-format and job-match scoring.
//!
//! Both scores are pure functions of their inputs: ordered maps back every
//! keyword set and breakdown, so the same inputs always produce the same
//! `ScoreResult`, bit for bit.

use crate::error::PipelineError;
use crate::models::{
    AtsWeights, ExtractionWarning, KeywordSet, ScoreKind, ScoreResult, Section, SectionLabel,
};
use crate::profile::has_contact_pattern;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

pub const FACTOR_CONTACT: &str = "contact";
pub const FACTOR_EXPERIENCE: &str = "experience";
pub const FACTOR_EDUCATION_OR_SKILLS: &str = "education_or_skills";
pub const FACTOR_CLEAN_EXTRACTION: &str = "clean_extraction";
pub const FACTOR_CONVENTIONAL_ORDER: &str = "conventional_order";
pub const FACTOR_ACTION_VERBS: &str = "action_verbs";

const FULL_ACTION_VERB_COUNT: usize = 3;
const MIN_LISTED_SKILLS: usize = 5;

pub const ACTION_VERBS: &[&str] = &[
    "achieved", "administered", "analyzed", "architected", "automated", "built", "collaborated",
    "created", "delivered", "designed", "developed", "engineered", "enhanced", "established",
    "expanded", "implemented", "improved", "increased", "initiated", "integrated", "introduced",
    "launched", "led", "managed", "mentored", "migrated", "optimized", "orchestrated",
    "pioneered", "produced", "reduced", "refactored", "resolved", "scaled", "shipped",
    "spearheaded", "streamlined", "transformed",
];

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\p{L}+").expect("word pattern is valid"))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn has_section(sections: &[Section], label: SectionLabel) -> bool {
    sections.iter().any(|section| section.label == label)
}

fn has_contact_details(sections: &[Section]) -> bool {
    sections
        .iter()
        .flat_map(|section| section.lines.iter())
        .any(|line| has_contact_pattern(line))
}

fn distinct_action_verbs(sections: &[Section]) -> BTreeSet<&'static str> {
    let mut found = BTreeSet::new();
    for line in sections.iter().flat_map(|section| section.lines.iter()) {
        let lowered = line.to_lowercase();
        for word in word_regex().find_iter(&lowered) {
            if let Some(verb) = ACTION_VERBS.iter().find(|verb| **verb == word.as_str()) {
                found.insert(*verb);
            }
        }
    }
    found
}

/// Contact and summary belong before the body sections.
fn is_conventionally_ordered(sections: &[Section]) -> bool {
    let mut seen_body = false;
    for section in sections {
        match section.label {
            SectionLabel::Experience | SectionLabel::Education | SectionLabel::Skills => {
                seen_body = true
            }
            SectionLabel::Contact | SectionLabel::Summary if seen_body => return false,
            _ => {}
        }
    }
    true
}

fn listed_skill_count(sections: &[Section]) -> Option<usize> {
    let skills: Vec<&Section> = sections
        .iter()
        .filter(|section| section.label == SectionLabel::Skills)
        .collect();
    if skills.is_empty() {
        return None;
    }

    Some(
        skills
            .iter()
            .flat_map(|section| section.lines.iter())
            .flat_map(|line| line.split([',', '|', ';', '•']))
            .map(|item| item.split_once(':').map_or(item, |(_, rest)| rest))
            .filter(|item| !item.trim().is_empty())
            .count(),
    )
}

/// Scores resume structure with a fixed weighted checklist. Never fails:
/// a document without any headings simply collects the deductions.
pub fn score_ats(
    sections: &[Section],
    warnings: &[ExtractionWarning],
    weights: &AtsWeights,
) -> ScoreResult {
    let mut breakdown = BTreeMap::new();
    let mut hints = Vec::new();

    let contact = has_section(sections, SectionLabel::Contact) || has_contact_details(sections);
    breakdown.insert(FACTOR_CONTACT.to_string(), if contact { weights.contact } else { 0.0 });
    if !contact {
        hints.push(
            "Add contact details (e-mail, phone or a LinkedIn profile) at the top.".to_string(),
        );
    }

    let experience = has_section(sections, SectionLabel::Experience);
    breakdown.insert(
        FACTOR_EXPERIENCE.to_string(),
        if experience { weights.experience } else { 0.0 },
    );
    if !experience {
        hints.push(
            "Add a clearly headed EXPERIENCE section (e.g. \"Work Experience\").".to_string(),
        );
    }

    let education_or_skills = has_section(sections, SectionLabel::Education)
        || has_section(sections, SectionLabel::Skills);
    breakdown.insert(
        FACTOR_EDUCATION_OR_SKILLS.to_string(),
        if education_or_skills {
            weights.education_or_skills
        } else {
            0.0
        },
    );
    if !education_or_skills {
        hints.push("Add an EDUCATION or SKILLS section with a standard heading.".to_string());
    }

    let clean = warnings.is_empty();
    breakdown.insert(
        FACTOR_CLEAN_EXTRACTION.to_string(),
        if clean { weights.clean_extraction } else { 0.0 },
    );
    if !clean {
        hints.push(format!(
            "Parts of the document could not be read ({}); avoid tables, images and scanned pages.",
            warnings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ));
    }

    let ordered = is_conventionally_ordered(sections);
    breakdown.insert(
        FACTOR_CONVENTIONAL_ORDER.to_string(),
        if ordered { weights.conventional_order } else { 0.0 },
    );
    if !ordered {
        hints.push(
            "Place contact details and the summary before experience, education and skills."
                .to_string(),
        );
    }

    let verbs = distinct_action_verbs(sections).len();
    let verb_points = match verbs {
        0 => 0.0,
        count if count < FULL_ACTION_VERB_COUNT => weights.action_verbs / 2.0,
        _ => weights.action_verbs,
    };
    breakdown.insert(FACTOR_ACTION_VERBS.to_string(), verb_points);
    if verbs < FULL_ACTION_VERB_COUNT {
        hints.push(
            "Start bullet points with strong action verbs (e.g. \"Built\", \"Led\", \"Improved\")."
                .to_string(),
        );
    }

    if let Some(count) = listed_skill_count(sections) {
        if count < MIN_LISTED_SKILLS {
            hints.push(format!(
                "Only {count} skill(s) listed; aim for 10-15 relevant skills."
            ));
        }
    }

    finish(ScoreKind::Ats, breakdown, hints, Vec::new(), Vec::new())
}

/// Weighted overlap of resume keywords with job keywords.
///
/// Every job keyword the resume contains earns its full job weight, wherever
/// in the resume it appears. The total is the earned share of the job's
/// weight, scaled to [0, 100]. Matched keywords are listed with the best
/// resume evidence first.
pub fn score_match(
    resume: &KeywordSet,
    job: &KeywordSet,
    max_hints: usize,
) -> Result<ScoreResult, PipelineError> {
    let job_total = job.total_weight();
    if job.is_empty() || job_total <= 0.0 {
        return Err(PipelineError::InsufficientInput(
            "job description has no usable keywords".to_string(),
        ));
    }

    let mut breakdown = BTreeMap::new();
    let mut matched: Vec<(&str, f64)> = Vec::new();
    let mut missing: Vec<(&str, f64)> = Vec::new();

    for (token, job_weight) in job.iter() {
        match resume.weight(token) {
            Some(resume_weight) => {
                breakdown.insert(format!("keyword:{token}"), 100.0 * job_weight / job_total);
                matched.push((token, resume_weight));
            }
            None => missing.push((token, job_weight)),
        }
    }

    matched.sort_by(by_weight_then_token);
    missing.sort_by(by_weight_then_token);

    let hints = missing
        .iter()
        .take(max_hints)
        .map(|(token, _)| format!("Mention \"{token}\" if it reflects your experience."))
        .collect();
    let matched = matched.into_iter().map(|(token, _)| token.to_string()).collect();
    let missing = missing.into_iter().map(|(token, _)| token.to_string()).collect();

    Ok(finish(ScoreKind::Match, breakdown, hints, matched, missing))
}

fn by_weight_then_token(left: &(&str, f64), right: &(&str, f64)) -> Ordering {
    right.1.total_cmp(&left.1).then_with(|| left.0.cmp(right.0))
}

fn finish(
    kind: ScoreKind,
    breakdown: BTreeMap<String, f64>,
    hints: Vec<String>,
    matched_keywords: Vec<String>,
    missing_keywords: Vec<String>,
) -> ScoreResult {
    let raw_total: f64 = breakdown.values().sum();
    ScoreResult {
        kind,
        total: round2(raw_total.clamp(0.0, 100.0)),
        breakdown: breakdown
            .into_iter()
            .map(|(factor, value)| (factor, round2(value)))
            .collect(),
        hints,
        matched_keywords,
        missing_keywords,
    }
}
