// Ordered text transforms applied to the raw OCR text of one side

use log::trace;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::tables::CorrectionTable;
use crate::{
    consts::{AGE, GENDER, VOTER_ID},
    error::Result,
};

fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
}

/// Any run of colons with surrounding horizontal whitespace.
static COLON_RUN: Lazy<Regex> =
    Lazy::new(|| static_regex(r"[^\S\n]*:(?:[^\S\n]*:)*[^\S\n]*"));

/// `Age:<n> [noise] :Gender:<v>` on one line.
static AGE_THEN_GENDER: Lazy<Regex> = Lazy::new(|| {
    static_regex(
        r"(?:उम्र|Age)[^\S\n]*:[^\S\n]*([^\s:]+)[^\S\n]*(?:[^\s:]+[^\S\n]*)?:?[^\S\n]*(?:लिंग|Gender)[^\S\n]*:[^\S\n]*([^\s:]+)",
    )
});

/// Same fields in the swapped order.
static GENDER_THEN_AGE: Lazy<Regex> = Lazy::new(|| {
    static_regex(
        r"(?:लिंग|Gender)[^\S\n]*:[^\S\n]*([^\s:]+)[^\S\n]*(?:[^\s:]+[^\S\n]*)?:?[^\S\n]*(?:उम्र|Age)[^\S\n]*:[^\S\n]*([^\s:]+)",
    )
});

static VOTER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| static_regex(r"[A-Z]{2}/\d{2}/\d{3}/\d{6}|[A-Z]{3}\d{7}"));

/// One named step of the pipeline.
pub trait TextTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str) -> Result<String>;
}

pub struct CleanEmptyLines;

impl TextTransform for CleanEmptyLines {
    fn name(&self) -> &'static str {
        "clean-empty-lines"
    }

    fn apply(&self, text: &str) -> Result<String> {
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Collapses `" : "`, `": "`, `"::"` and similar into a bare `:`.
pub struct NormalizeColons;

impl TextTransform for NormalizeColons {
    fn name(&self) -> &'static str {
        "normalize-colons"
    }

    fn apply(&self, text: &str) -> Result<String> {
        Ok(COLON_RUN.replace_all(text, ":").into_owned())
    }
}

/// Rewrites a fused age/gender line into `उम्र:<n>\nलिंग:<v>`.
pub struct FormatGenderAge;

impl TextTransform for FormatGenderAge {
    fn name(&self) -> &'static str {
        "format-gender-age"
    }

    fn apply(&self, text: &str) -> Result<String> {
        let text = AGE_THEN_GENDER.replace_all(text, |caps: &Captures| {
            format!("{AGE}:{}\n{GENDER}:{}", &caps[1], &caps[2])
        });
        let text = GENDER_THEN_AGE.replace_all(&text, |caps: &Captures| {
            format!("{AGE}:{}\n{GENDER}:{}", &caps[2], &caps[1])
        });
        Ok(text.into_owned())
    }
}

pub struct CorrectMisspellings {
    table: CorrectionTable,
}

impl CorrectMisspellings {
    pub fn new(table: CorrectionTable) -> Self {
        Self { table }
    }
}

impl TextTransform for CorrectMisspellings {
    fn name(&self) -> &'static str {
        "correct-misspellings"
    }

    fn apply(&self, text: &str) -> Result<String> {
        Ok(self.table.apply(text))
    }
}

pub struct TextPipeline {
    stages: Vec<Box<dyn TextTransform>>,
}

impl TextPipeline {
    /// The standard four-stage chain.
    pub fn standard(corrections: CorrectionTable) -> Self {
        let mut pipeline = Self::empty();
        pipeline.push(CleanEmptyLines);
        pipeline.push(NormalizeColons);
        pipeline.push(FormatGenderAge);
        pipeline.push(CorrectMisspellings::new(corrections));
        pipeline
    }

    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: impl TextTransform + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, text: &str) -> Result<String> {
        let mut current = text.to_string();
        for stage in &self.stages {
            current = stage.apply(&current)?;
            trace!("after {}: {:?}", stage.name(), current);
        }
        Ok(current)
    }
}

/// Match a colon-less line against the two voter-ID layouts.
///
/// All whitespace is removed first; the returned value is the compacted line.
pub fn match_voter_id(line: &str) -> Option<String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    VOTER_ID_PATTERN.is_match(&compact).then_some(compact)
}

/// Split text into `(key, value)` pairs on the first colon of each line.
///
/// Colon-less lines contribute only when they look like a voter ID.
pub fn extract_pairs(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| match line.split_once(':') {
            Some((key, value)) => Some((key.trim().to_string(), value.trim().to_string())),
            None => match_voter_id(line).map(|id| (VOTER_ID.to_string(), id)),
        })
        .collect()
}
