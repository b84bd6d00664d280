//! Contact fields and a coarse seniority estimate read straight from the
//! segmented text. Everything here is pattern based and deterministic.

use crate::models::{Section, SectionLabel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;
const MAX_NAME_WORDS: usize = 4;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email pattern is valid")
    })
}

/// Digit runs with phone punctuation. Candidates are checked by
/// `is_phone_number` before they count.
fn phone_candidate_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").expect("phone pattern is valid")
    })
}

fn linkedin_regex() -> &'static Regex {
    static LINKEDIN: OnceLock<Regex> = OnceLock::new();
    LINKEDIN.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/(?:in/|pub/)?[\w-]+")
            .expect("linkedin pattern is valid")
    })
}

fn github_regex() -> &'static Regex {
    static GITHUB: OnceLock<Regex> = OnceLock::new();
    GITHUB.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/[\w-]+")
            .expect("github pattern is valid")
    })
}

fn stated_years_regex() -> &'static Regex {
    static YEARS: OnceLock<Regex> = OnceLock::new();
    YEARS.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\+?\s*(?:years?|yrs?)\s+(?:of\s+)?(?:\w+\s+)?experience")
            .expect("years pattern is valid")
    })
}

fn leadership_regex() -> &'static Regex {
    static LEADERSHIP: OnceLock<Regex> = OnceLock::new();
    LEADERSHIP.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:senior|lead|manager|director|vp|cto|cio|architect|principal|head of)\b",
        )
        .expect("leadership pattern is valid")
    })
}

/// A year such as 1998 or 2021.
fn is_calendar_year(group: &str) -> bool {
    group.len() == 4 && (group.starts_with("19") || group.starts_with("20"))
}

/// Rejects date ranges ("2019 - 2021") and digit runs too short or too
/// long for a dialable number.
fn is_phone_number(candidate: &str) -> bool {
    let digits = candidate.chars().filter(char::is_ascii_digit).count();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return false;
    }

    !candidate
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|group| !group.is_empty())
        .all(is_calendar_year)
}

pub fn find_phone(line: &str) -> Option<&str> {
    phone_candidate_regex()
        .find_iter(line)
        .map(|found| found.as_str().trim())
        .find(|candidate| is_phone_number(candidate))
}

/// True when `line` carries an e-mail address, a phone number or a
/// LinkedIn / GitHub profile link.
pub fn has_contact_pattern(line: &str) -> bool {
    email_regex().is_match(line)
        || linkedin_regex().is_match(line)
        || github_regex().is_match(line)
        || find_phone(line).is_some()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.linkedin.is_none()
            && self.github.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        };
        f.write_str(name)
    }
}

/// Structured fields read from a segmented resume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub contact: ContactInfo,
    pub stated_years: Option<u32>,
    pub has_leadership_title: bool,
    pub experience_level: ExperienceLevel,
}

fn all_lines(sections: &[Section]) -> impl Iterator<Item = &str> {
    sections.iter().flat_map(|section| {
        section
            .heading
            .iter()
            .chain(section.lines.iter())
            .map(String::as_str)
    })
}

fn first_match(sections: &[Section], regex: &Regex) -> Option<String> {
    sections
        .iter()
        .flat_map(|section| section.lines.iter())
        .find_map(|line| regex.find(line))
        .map(|found| found.as_str().to_string())
}

/// First line of the leading unheaded or CONTACT section that reads like a
/// person's name.
fn guess_name(sections: &[Section]) -> Option<String> {
    let leading = sections.first()?;
    if leading.heading.is_some() && leading.label != SectionLabel::Contact {
        return None;
    }

    let line = leading.lines.iter().map(|line| line.trim()).find(|line| !line.is_empty())?;
    let words: Vec<&str> = line.split_whitespace().collect();
    let looks_like_name = (2..=MAX_NAME_WORDS).contains(&words.len())
        && words.iter().all(|word| {
            word.chars().next().is_some_and(char::is_uppercase)
                && word
                    .chars()
                    .all(|ch| ch.is_alphabetic() || matches!(ch, '.' | '-' | '\''))
        });
    looks_like_name.then(|| words.join(" "))
}

pub fn extract_contact(sections: &[Section]) -> ContactInfo {
    ContactInfo {
        name: guess_name(sections),
        email: first_match(sections, email_regex()),
        phone: sections
            .iter()
            .flat_map(|section| section.lines.iter())
            .find_map(|line| find_phone(line))
            .map(str::to_string),
        linkedin: first_match(sections, linkedin_regex()),
        github: first_match(sections, github_regex()),
    }
}

/// Largest "N years of experience" claim in the text.
pub fn stated_years(sections: &[Section]) -> Option<u32> {
    all_lines(sections)
        .flat_map(|line| stated_years_regex().captures_iter(line))
        .filter_map(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

pub fn has_leadership_title(sections: &[Section]) -> bool {
    all_lines(sections).any(|line| leadership_regex().is_match(line))
}

/// Ten stated years, or five with a leadership title, is senior. Two
/// stated years or any leadership title is mid. Everything else is entry.
pub fn experience_level(stated_years: Option<u32>, leadership: bool) -> ExperienceLevel {
    let years = stated_years.unwrap_or(0);
    if years >= 10 || (leadership && years >= 5) {
        ExperienceLevel::Senior
    } else if years >= 2 || leadership {
        ExperienceLevel::Mid
    } else {
        ExperienceLevel::Entry
    }
}

pub fn build_profile(sections: &[Section]) -> Profile {
    let stated_years = stated_years(sections);
    let has_leadership_title = has_leadership_title(sections);
    Profile {
        contact: extract_contact(sections),
        stated_years,
        has_leadership_title,
        experience_level: experience_level(stated_years, has_leadership_title),
    }
}
