use crate::types::{Color, Entry};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Color for entries that match nothing.
pub const UNCLASSIFIED: Color = Color::Gray;

// Built-in status keywords, tested in this order. Incident feeds put the
// latest status first, so a resolved notice usually quotes earlier updates.
static RESOLVED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(resolved|completed|operating normally|fixed)\b").unwrap()
});
static IN_PROGRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(identified|monitoring|mitigated|update|in progress|scheduled)\b").unwrap()
});
static PROBLEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(investigating|outage|degraded|disruption|service interruption|elevated error)",
    )
    .unwrap()
});

fn builtin_groups() -> [(&'static Regex, Color); 3] {
    [
        (&*RESOLVED_PATTERN, Color::Green),
        (&*IN_PROGRESS_PATTERN, Color::Yellow),
        (&*PROBLEM_PATTERN, Color::Red),
    ]
}

/// Keyword classifier compiled once per feed.
#[derive(Debug, Clone)]
pub struct Classifier {
    custom: Option<CustomMatcher>,
    match_body: bool,
}

#[derive(Debug, Clone)]
struct CustomMatcher {
    pattern: Regex,
    // color of capture group i + 1
    colors: Vec<Color>,
}

impl Classifier {
    pub fn new(colors: &BTreeMap<String, Color>, match_body: bool) -> Self {
        Self {
            custom: CustomMatcher::compile(colors),
            match_body,
        }
    }

    pub fn classify(&self, entry: &Entry) -> Color {
        let subject = if self.match_body {
            format!("{}\n{}", entry.title, entry.body)
        } else {
            entry.title.clone()
        };
        self.classify_text(&subject)
    }

    pub fn classify_text(&self, subject: &str) -> Color {
        if let Some(custom) = &self.custom {
            if let Some(color) = custom.earliest(subject) {
                return color;
            }
        }

        builtin_groups()
            .into_iter()
            .find(|(pattern, _)| pattern.is_match(subject))
            .map(|(_, color)| color)
            .unwrap_or(UNCLASSIFIED)
    }
}

impl CustomMatcher {
    fn compile(colors: &BTreeMap<String, Color>) -> Option<Self> {
        let mut keywords: Vec<(&String, Color)> = colors
            .iter()
            .filter(|(keyword, _)| !keyword.trim().is_empty())
            .map(|(keyword, color)| (keyword, *color))
            .collect();
        if keywords.is_empty() {
            return None;
        }

        // Leftmost match wins; among keywords starting at the same offset the
        // alternation order decides, so put longer ones first.
        keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        let alternation = keywords
            .iter()
            .map(|(keyword, _)| keyword_pattern(keyword))
            .collect::<Vec<_>>()
            .join("|");

        match RegexBuilder::new(&alternation).case_insensitive(true).build() {
            Ok(pattern) => {
                debug!("Compiled {} color keywords", keywords.len());
                Some(Self {
                    pattern,
                    colors: keywords.into_iter().map(|(_, color)| color).collect(),
                })
            }
            Err(e) => {
                // Only reachable when the keyword list exceeds the regex size limit.
                warn!("Color keywords could not be compiled, using built-ins: {}", e);
                None
            }
        }
    }

    fn earliest(&self, subject: &str) -> Option<Color> {
        let captures = self.pattern.captures(subject)?;
        captures
            .iter()
            .skip(1)
            .position(|group| group.is_some())
            .and_then(|index| self.colors.get(index).copied())
    }
}

/// One capture group for a keyword. Ends that are word characters must sit
/// on a word boundary, so "Resolved" does not match inside "Unresolved".
fn keyword_pattern(keyword: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let leading = if keyword.starts_with(is_word) { r"\b" } else { "" };
    let trailing = if keyword.ends_with(is_word) { r"\b" } else { "" };
    format!("({}{}{})", leading, regex::escape(keyword), trailing)
}
