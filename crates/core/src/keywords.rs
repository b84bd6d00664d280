use crate::models::{KeywordOptions, KeywordSet, Section, SectionLabel};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// English function words plus recruiting boilerplate that carries no
/// matching signal. Applied identically to resumes and job descriptions.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "been", "before", "being", "below", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "etc", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "if", "in",
    "into", "is", "it", "its", "just", "me", "more", "most", "must", "my", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own",
    "per", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "us", "very", "via", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "within", "would", "you", "your",
    "yours",
    // recruiting boilerplate
    "ability", "candidate", "candidates", "company", "developer", "engineer", "engineers",
    "experience", "experienced", "hiring", "ideal", "including", "join", "job", "knowledge",
    "looking", "plus", "position", "preferred", "required", "requirements", "responsibilities",
    "role", "seeking", "skills", "strong", "team", "work", "working", "year", "years",
];

/// Technology and methodology terms that count double in a job
/// description when `job_skill_boost` is left at its default.
pub const SKILL_VOCABULARY: &[&str] = &[
    // languages
    "python", "java", "javascript", "typescript", "c++", "c#", "go", "golang", "rust", "kotlin",
    "swift", "ruby", "php", "scala", "sql", "bash",
    // frameworks
    "django", "flask", "fastapi", "react", "angular", "vue", "node.js", "spring", ".net",
    "tensorflow", "pytorch", "pandas", "numpy",
    // databases
    "mysql", "postgresql", "postgres", "mongodb", "redis", "oracle", "dynamodb", "cassandra",
    "elasticsearch", "kafka",
    // cloud and infrastructure
    "aws", "azure", "gcp", "docker", "kubernetes", "terraform", "ansible", "jenkins", "linux",
    "git",
    // methodologies
    "agile", "scrum", "devops", "ci/cd", "tdd", "microservices", "rest", "graphql",
];

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"\.?[\p{L}\p{N}][\p{L}\p{N}+#]*(?:[./][\p{L}\p{N}+#]+)*")
            .expect("token pattern is valid")
    })
}

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn noise_regex() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    NOISE.get_or_init(|| {
        Regex::new(r"(?i)https?://\S+|www\.\S+|\S+@\S+").expect("noise pattern is valid")
    })
}

/// Lower-cased tokens of `text` after URL / e-mail removal, stop-word
/// filtering and the minimum-length rule. Tokens are not stemmed.
pub fn tokenize(text: &str, min_token_len: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = noise_regex().replace_all(&lowered, " ");

    token_regex()
        .find_iter(&cleaned)
        .map(|found| normalize_token(found.as_str()))
        .filter(|token| token.chars().count() >= min_token_len)
        .filter(|token| token.chars().any(char::is_alphabetic))
        .filter(|token| !stop_words().contains(token.as_str()))
        .collect()
}

/// A leading dot survives only for known dotted names such as `.net`.
fn normalize_token(raw: &str) -> String {
    match raw.strip_prefix('.') {
        Some(rest) if !SKILL_VOCABULARY.contains(&raw) => rest.to_string(),
        _ => raw.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIndexBuilder {
    options: KeywordOptions,
}

impl KeywordIndexBuilder {
    pub fn new(options: KeywordOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &KeywordOptions {
        &self.options
    }

    pub fn section_weight(&self, label: SectionLabel) -> f64 {
        match label {
            SectionLabel::Skills | SectionLabel::Experience => self.options.section_boost,
            _ => 1.0,
        }
    }

    /// Resume keywords; SKILLS and EXPERIENCE tokens carry the section boost.
    pub fn build_resume(&self, sections: &[Section]) -> KeywordSet {
        let mut set = KeywordSet::new();
        for section in sections {
            let weight = self.section_weight(section.label);
            for line in &section.lines {
                for token in tokenize(line, self.options.min_token_len) {
                    set.insert_max(token, weight);
                }
            }
        }
        set
    }

    /// Job-description keywords; skill-vocabulary terms carry the job boost.
    pub fn build_job(&self, job_description: &str) -> KeywordSet {
        tokenize(job_description, self.options.min_token_len)
            .into_iter()
            .map(|token| {
                let weight = if SKILL_VOCABULARY.contains(&token.as_str()) {
                    self.options.job_skill_boost
                } else {
                    1.0
                };
                (token, weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::segment_text;

    #[test]
    fn tokenizer_keeps_technical_tokens() {
        let tokens = tokenize("Expert in C++, C#, Node.js and CI/CD. Shipped .NET apps.", 2);
        assert_eq!(
            tokens,
            vec!["expert", "c++", "c#", "node.js", "ci/cd", "shipped", ".net", "apps"]
        );
    }

    #[test]
    fn tokenizer_drops_urls_emails_numbers_and_short_tokens() {
        let tokens = tokenize(
            "jane@example.com https://github.com/jane 2019 x Rust",
            2,
        );
        assert_eq!(tokens, vec!["rust"]);
    }

    #[test]
    fn accented_words_stay_whole() {
        let tokens = tokenize("Développeur Français Müller, Zürich", 2);
        assert_eq!(tokens, vec!["développeur", "français", "müller", "zürich"]);
    }

    #[test]
    fn job_keywords_drop_boilerplate() {
        let builder = KeywordIndexBuilder::default();
        let job = builder.build_job("Looking for Python and Go engineer");
        let tokens: Vec<&str> = job.iter().map(|(token, _)| token).collect();
        assert_eq!(tokens, vec!["go", "python"]);
        assert_eq!(job.weight("python"), Some(2.0));
    }

    #[test]
    fn job_terms_outside_vocabulary_weigh_one() {
        let builder = KeywordIndexBuilder::default();
        let job = builder.build_job("Rust observability tooling");
        assert_eq!(job.weight("rust"), Some(2.0));
        assert_eq!(job.weight("observability"), Some(1.0));
    }

    #[test]
    fn resume_weight_is_max_not_sum() {
        let sections = segment_text("SUMMARY\nRust Rust Rust\nSKILLS\nRust\nEducation\nRust");
        let builder = KeywordIndexBuilder::default();
        let set = builder.build_resume(&sections);
        assert_eq!(set.weight("rust"), Some(2.0));
    }

    #[test]
    fn summary_tokens_are_not_boosted() {
        let sections = segment_text("SUMMARY\nKubernetes operator");
        let set = KeywordIndexBuilder::default().build_resume(&sections);
        assert_eq!(set.weight("kubernetes"), Some(1.0));
    }

    #[test]
    fn section_boost_is_configurable() {
        let builder = KeywordIndexBuilder::new(KeywordOptions {
            section_boost: 3.0,
            ..KeywordOptions::default()
        });
        let set = builder.build_resume(&segment_text("SKILLS\nPython"));
        assert_eq!(set.weight("python"), Some(3.0));
    }
}
