//! Section classifier
//!
//! Splits free-form plan text into named sections by keyword. Patterns are
//! checked in a fixed priority order and each one scans every line, so a line
//! can land in more than one section.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Closed set of section names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionName {
    Header,
    Rating,
    PhotoUpload,
    TextInput,
    Button,
    /// Catch-all used when no pattern matched
    Whole,
}

impl SectionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Header => "Header",
            SectionName::Rating => "Rating",
            SectionName::PhotoUpload => "PhotoUpload",
            SectionName::TextInput => "TextInput",
            SectionName::Button => "Button",
            SectionName::Whole => "Whole",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named bucket of plan lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSection {
    pub name: SectionName,
    pub content: String,
}

impl PlanSection {
    pub fn new(name: SectionName, content: impl Into<String>) -> Self {
        Self {
            name,
            content: content.into(),
        }
    }
}

/// Keyword patterns in priority order
const SECTION_PATTERNS: &[(SectionName, &[&str])] = &[
    (SectionName::Header, &["제목", "부제", "타이틀", "title", "subtitle"]),
    (SectionName::Rating, &["평점", "별점", "rating", "점수", "star", "별"]),
    (
        SectionName::PhotoUpload,
        &["사진", "업로드", "이미지", "photo", "upload", "image"],
    ),
    (
        SectionName::TextInput,
        &["입력", "후기", "내용", "text", "input", "textarea", "리뷰"],
    ),
    (SectionName::Button, &["버튼", "제출", "등록", "button", "submit", "확인"]),
];

/// Keywords for a section, empty for `Whole`
pub fn keywords(name: SectionName) -> &'static [&'static str] {
    SECTION_PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, k)| *k)
        .unwrap_or(&[])
}

/// Classify plan text into sections
///
/// Output order follows pattern priority, not input order. When nothing
/// matches, the result is a single `Whole` section holding the input verbatim.
pub fn classify(plan_text: &str) -> Vec<PlanSection> {
    debug!(len = plan_text.len(), "classify: called");
    let lines: Vec<(&str, String)> = plan_text.split('\n').map(|l| (l, l.to_lowercase())).collect();

    let mut sections = Vec::new();
    for (name, words) in SECTION_PATTERNS {
        let matching: Vec<&str> = lines
            .iter()
            .filter(|(_, lower)| words.iter().any(|w| lower.contains(&w.to_lowercase())))
            .map(|(line, _)| *line)
            .collect();

        if !matching.is_empty() {
            debug!(section = %name, lines = matching.len(), "classify: section matched");
            sections.push(PlanSection::new(*name, matching.join("\n")));
        }
    }

    if sections.is_empty() {
        debug!("classify: no pattern matched, using Whole");
        sections.push(PlanSection::new(SectionName::Whole, plan_text));
    }

    sections
}
