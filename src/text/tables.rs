// Lookup tables consumed by the text pipeline, loaded once at start-up

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use log::debug;

use crate::{
    consts::DEVANAGARI_DIGITS,
    error::{ExtractError, Result},
};

/// Canonical term → misspellings observed in OCR output.
///
/// Kept in a `BTreeMap` so replacements always run in the same order.
#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl CorrectionTable {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: BTreeMap<String, Vec<String>> = serde_json::from_str(&content)
            .map_err(|e| ExtractError::config(format!("{}: {e}", path.display())))?;
        debug!(
            "Loaded {} correction entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::new(entries))
    }

    /// Replace every occurrence of every listed misspelling with its canonical term.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (canonical, variants) in &self.entries {
            for variant in variants.iter().filter(|v| !v.is_empty()) {
                if out.contains(variant.as_str()) {
                    out = out.replace(variant.as_str(), canonical);
                }
            }
        }
        out
    }
}

/// Numeral character → ASCII digit.
#[derive(Debug, Clone)]
pub struct DigitTable {
    map: HashMap<char, char>,
}

impl Default for DigitTable {
    fn default() -> Self {
        Self {
            map: DEVANAGARI_DIGITS.into_iter().collect(),
        }
    }
}

impl DigitTable {
    /// Load a JSON object whose keys and values are single characters.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| ExtractError::config(format!("{}: {e}", path.display())))?;

        let mut map = HashMap::with_capacity(raw.len());
        for (from, to) in &raw {
            let (Some(f), Some(t)) = (single_char(from), single_char(to)) else {
                return Err(ExtractError::config(format!(
                    "{}: digit entry '{from}' -> '{to}' must map one character to one character",
                    path.display()
                )));
            };
            map.insert(f, t);
        }
        debug!("Loaded {} digit mappings from {}", map.len(), path.display());
        Ok(Self { map })
    }

    pub fn convert(&self, text: &str) -> String {
        text.chars()
            .map(|c| self.map.get(&c).copied().unwrap_or(c))
            .collect()
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn corrections_replace_every_variant() {
        let table = CorrectionTable::new(BTreeMap::from([
            ("पिता".to_string(), vec!["पिताा".to_string(), "पीता".to_string()]),
            ("नाम".to_string(), vec!["नम".to_string(), String::new()]),
        ]));
        assert_eq!(table.apply("पीता का नम पिताा"), "पिता का नाम पिता");
    }

    #[test]
    fn builtin_digits() {
        assert_eq!(DigitTable::default().convert("उम्र:४५"), "उम्र:45");
    }

    #[test]
    fn digit_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"४": "4", "O": "0"}}"#).unwrap();
        let table = DigitTable::load(file.path()).unwrap();
        assert_eq!(table.convert("४O५"), "40५");
    }

    #[test]
    fn multi_char_digit_entry_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"४५": "45"}}"#).unwrap();
        assert!(matches!(
            DigitTable::load(file.path()),
            Err(ExtractError::Config(_))
        ));
    }
}
