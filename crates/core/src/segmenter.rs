use crate::models::{ExtractionResult, LineSpan, Section, SectionLabel};

const MAX_HEADING_WORDS: usize = 6;
const MAX_HEADING_CHARS: usize = 48;

/// Recognized heading phrases per section label. Phrases are matched as
/// whole words against the lower-cased heading with punctuation removed.
/// OTHER phrases exist so that e.g. a "Projects" heading closes the
/// preceding SKILLS section instead of being absorbed by it.
pub const SECTION_VOCABULARY: &[(SectionLabel, &[&str])] = &[
    (
        SectionLabel::Contact,
        &[
            "contact",
            "contact information",
            "contact info",
            "contact details",
            "personal information",
            "personal details",
        ],
    ),
    (
        SectionLabel::Summary,
        &[
            "summary",
            "professional summary",
            "career summary",
            "profile",
            "professional profile",
            "objective",
            "career objective",
            "about me",
        ],
    ),
    (
        SectionLabel::Experience,
        &[
            "experience",
            "work experience",
            "professional experience",
            "relevant experience",
            "work history",
            "employment",
            "employment history",
            "career history",
            "internships",
        ],
    ),
    (
        SectionLabel::Education,
        &[
            "education",
            "academic background",
            "academic history",
            "qualifications",
            "academic qualifications",
        ],
    ),
    (
        SectionLabel::Skills,
        &[
            "skills",
            "technical skills",
            "core competencies",
            "competencies",
            "technologies",
            "technical expertise",
            "tech stack",
        ],
    ),
    (
        SectionLabel::Other,
        &[
            "projects",
            "certifications",
            "certificates",
            "awards",
            "honors",
            "publications",
            "languages",
            "interests",
            "hobbies",
            "volunteering",
            "volunteer experience",
            "references",
            "activities",
        ],
    ),
];

/// The vocabulary entry a heading line resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingMatch {
    pub label: SectionLabel,
    pub phrase: &'static str,
}

/// Resolves `line` to a section label if it looks like a heading and
/// contains a known phrase. A specific label beats an OTHER phrase, then
/// the longest phrase wins.
pub fn classify_heading(line: &str) -> Option<HeadingMatch> {
    let trimmed = line.trim();
    if !looks_like_heading(trimmed) {
        return None;
    }

    let normalized = normalize_heading(trimmed);
    let padded = format!(" {normalized} ");

    SECTION_VOCABULARY
        .iter()
        .flat_map(|(label, phrases)| {
            phrases.iter().map(move |phrase| HeadingMatch {
                label: *label,
                phrase: *phrase,
            })
        })
        .filter(|candidate| padded.contains(&format!(" {} ", candidate.phrase)))
        .max_by_key(|candidate| {
            (
                candidate.label != SectionLabel::Other,
                candidate.phrase.len(),
            )
        })
}

fn looks_like_heading(line: &str) -> bool {
    if line.is_empty() || line.chars().count() > MAX_HEADING_CHARS {
        return false;
    }
    if line.starts_with(['-', '*', '•', '·', '▪', '–']) {
        return false;
    }

    // "Languages: Rust, Go" is content, not a heading.
    let body = line.trim_end_matches(':').trim();
    if body.contains([':', ',']) {
        return false;
    }
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_HEADING_WORDS {
        return false;
    }

    line.ends_with(':') || is_all_caps(body) || is_title_case(&words)
}

fn is_all_caps(text: &str) -> bool {
    let mut letters = text.chars().filter(|ch| ch.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|ch| !ch.is_lowercase())
}

fn is_title_case(words: &[&str]) -> bool {
    const CONNECTORS: [&str; 6] = ["and", "of", "the", "in", "for", "&"];
    words
        .iter()
        .filter(|word| !CONNECTORS.contains(&word.to_lowercase().as_str()))
        .filter_map(|word| word.chars().find(|ch| ch.is_alphabetic()))
        .all(char::is_uppercase)
}

fn normalize_heading(line: &str) -> String {
    line.chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits extracted text into labeled sections in document order.
pub fn segment(extraction: &ExtractionResult) -> Vec<Section> {
    segment_text(&extraction.text)
}

pub fn segment_text(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = SectionBuilder::new(SectionLabel::Other, None, None);

    for (index, line) in text.split('\n').enumerate() {
        if let Some(heading) = classify_heading(line) {
            current.finish_into(&mut sections);
            current = SectionBuilder::new(
                heading.label,
                Some(line.trim().to_string()),
                Some(index),
            );
            continue;
        }
        current.push_line(index, line);
    }
    current.finish_into(&mut sections);

    sections
}

#[derive(Debug)]
struct SectionBuilder {
    section: Section,
    open_span: Option<LineSpan>,
}

impl SectionBuilder {
    fn new(label: SectionLabel, heading: Option<String>, heading_line: Option<usize>) -> Self {
        Self {
            section: Section {
                label,
                heading,
                heading_line,
                spans: Vec::new(),
                lines: Vec::new(),
            },
            open_span: None,
        }
    }

    fn push_line(&mut self, index: usize, line: &str) {
        if line.trim().is_empty() {
            self.close_span();
            return;
        }

        match self.open_span.as_mut() {
            Some(span) => span.end = index + 1,
            None => {
                self.open_span = Some(LineSpan {
                    start: index,
                    end: index + 1,
                })
            }
        }
        self.section.lines.push(line.trim().to_string());
    }

    fn close_span(&mut self) {
        if let Some(span) = self.open_span.take() {
            self.section.spans.push(span);
        }
    }

    /// Headed sections are kept even when empty; leading unheaded text is
    /// kept only when it has content.
    fn finish_into(mut self, sections: &mut Vec<Section>) {
        self.close_span();
        if self.section.heading.is_some() || !self.section.lines.is_empty() {
            sections.push(self.section);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(sections: &[Section]) -> Vec<SectionLabel> {
        sections.iter().map(|section| section.label).collect()
    }

    #[test]
    fn vocabulary_longest_match_wins() {
        let matched = classify_heading("WORK EXPERIENCE").expect("heading");
        assert_eq!(matched.label, SectionLabel::Experience);
        assert_eq!(matched.phrase, "work experience");
    }

    #[test]
    fn specific_label_beats_other_phrase() {
        let matched = classify_heading("Education & Certifications").expect("heading");
        assert_eq!(matched.label, SectionLabel::Education);
    }

    #[test]
    fn other_headings_are_recognized() {
        let matched = classify_heading("Projects").expect("heading");
        assert_eq!(matched.label, SectionLabel::Other);
    }

    #[test]
    fn prose_lines_are_not_headings() {
        assert_eq!(classify_heading("Experience in building Python services"), None);
        assert_eq!(classify_heading("- Skills: Rust"), None);
        assert_eq!(classify_heading("Built scalable systems"), None);
        assert_eq!(classify_heading("Languages: Python, Go"), None);
        assert_eq!(
            classify_heading("Professional Experience Across Many Different Industries Worldwide"),
            None
        );
    }

    #[test]
    fn colon_terminated_heading_is_accepted() {
        let matched = classify_heading("technical skills:").expect("heading");
        assert_eq!(matched.label, SectionLabel::Skills);
    }

    #[test]
    fn heading_splits_sections() {
        let sections = segment_text("EXPERIENCE\nBuilt scalable systems\nSKILLS\nPython, Go");

        assert_eq!(labels(&sections), vec![SectionLabel::Experience, SectionLabel::Skills]);
        assert_eq!(sections[0].lines, vec!["Built scalable systems"]);
        assert_eq!(sections[1].lines, vec!["Python, Go"]);
        assert_eq!(sections[1].heading_line, Some(2));
        assert_eq!(sections[1].spans, vec![LineSpan { start: 3, end: 4 }]);
    }

    #[test]
    fn preamble_is_other() {
        let sections = segment_text("Jane Doe\njane@example.com\n\nSummary\nBackend engineer");
        assert_eq!(labels(&sections), vec![SectionLabel::Other, SectionLabel::Summary]);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].lines.len(), 2);
    }

    #[test]
    fn no_headings_yields_single_other_section() {
        let sections = segment_text("just some text\nabout a person\n\nwith two paragraphs");
        assert_eq!(labels(&sections), vec![SectionLabel::Other]);
        assert_eq!(sections[0].spans.len(), 2);
    }

    #[test]
    fn spans_are_ordered_and_disjoint() {
        let text = "Jane Doe\n\nSUMMARY\nEngineer\n\nmore summary\nEXPERIENCE\n\
                    Acme Corp\n\nGlobex\nEducation\nBSc\nSKILLS\nRust\nGo\nProjects\nA thing";
        let sections = segment_text(text);
        let spans: Vec<LineSpan> = sections
            .iter()
            .flat_map(|section| section.spans.iter().copied())
            .collect();

        assert!(!spans.is_empty());
        for span in &spans {
            assert!(span.start < span.end);
        }
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
        for section in &sections {
            if let (Some(heading_line), Some(first)) = (section.heading_line, section.spans.first()) {
                assert!(heading_line < first.start);
            }
        }
    }

    #[test]
    fn empty_headed_section_is_kept() {
        let sections = segment_text("SKILLS\nEXPERIENCE\nAcme");
        assert_eq!(labels(&sections), vec![SectionLabel::Skills, SectionLabel::Experience]);
        assert!(sections[0].is_empty());
    }
}
