// Positional field-name standardization

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::record::FieldRecord;
use crate::consts::{
    AGE, FATHER_NAME, GENDER, HOUSE_NUMBER, HUSBAND_NAME, IMAGE, MOTHER_NAME, RELATIONS,
    RELATIVE_NAME, VOTER_ID, VOTER_NAME, WIFE_NAME,
};

static HOUSE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)मकान|संख्या|house")
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// Keys that already name a specific field and are never renamed by position.
const FIXED_KEYS: [&str; 11] = [
    VOTER_NAME,
    FATHER_NAME,
    HUSBAND_NAME,
    MOTHER_NAME,
    WIFE_NAME,
    RELATIVE_NAME,
    HOUSE_NUMBER,
    AGE,
    GENDER,
    VOTER_ID,
    IMAGE,
];

/// Fields printed outside the name/relation/house block; they never take a slot.
const SLOTLESS_KEYS: [&str; 4] = [VOTER_ID, AGE, GENDER, IMAGE];

/// Number of leading template lines resolved by position.
const POSITIONAL_SLOTS: usize = 3;

/// Renames the name, relation and house-number entries of a record to
/// canonical keys.
///
/// The box template prints name, relation and house number as its first
/// three lines, so position is trusted over the OCR'd label text. Entries
/// such as the voter ID or age do not count towards those positions. Literal
/// aliases (e.g. `Age` → `उम्र`) are applied before the positional pass.
/// Running it on an already standardized record changes nothing.
#[derive(Debug, Clone, Default)]
pub struct FieldStandardizer {
    aliases: BTreeMap<String, String>,
}

impl FieldStandardizer {
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn standardize(&self, mut record: FieldRecord) -> FieldRecord {
        self.apply_aliases(&mut record);

        let mut slot = 0;
        let mut renamed = FieldRecord::new();
        for (key, value) in record.iter() {
            let slotless = key.is_some_and(|k| SLOTLESS_KEYS.contains(&k));
            let key = if slot < POSITIONAL_SLOTS && !slotless {
                let canonical: Option<&str> = positional_key(slot, key);
                slot += 1;
                canonical.or(key)
            } else {
                key
            };
            // Re-inserting folds a rename onto an existing key, later value winning
            renamed.insert(key.map(str::to_string), value.map(str::to_string));
        }

        renamed
    }

    fn apply_aliases(&self, record: &mut FieldRecord) {
        let mut index = 0;
        while index < record.len() {
            let alias = record
                .key_at(index)
                .flatten()
                .and_then(|key| self.aliases.get(key))
                .cloned();
            let before = record.len();
            if let Some(canonical) = alias {
                record.rename_at(index, &canonical);
            }
            // A folding rename removes one entry; the next one slid into `index`
            if record.len() == before {
                index += 1;
            }
        }
    }
}

fn positional_key(slot: usize, key: Option<&str>) -> Option<&'static str> {
    let fixed = key.is_some_and(|k| FIXED_KEYS.contains(&k));
    match slot {
        0 if fixed => None,
        0 => Some(VOTER_NAME),
        _ if key.is_some_and(|k| HOUSE_LABEL.is_match(k)) => Some(HOUSE_NUMBER),
        1 if fixed => None,
        1 => Some(relation_key(key.unwrap_or_default())),
        _ => None,
    }
}

/// Canonical relation key named by the first word of a label such as
/// `पिता का` or `Husband's Name`.
pub fn relation_key(label: &str) -> &'static str {
    let first = label.split_whitespace().next().unwrap_or_default();
    let token = first
        .trim_end_matches("'s")
        .trim_end_matches("’s")
        .to_lowercase();

    RELATIONS
        .iter()
        .find(|(word, _)| token == *word || (word.is_ascii() && token.starts_with(word)))
        .map(|(_, canonical)| *canonical)
        .unwrap_or(RELATIVE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextConfig;

    fn standardizer() -> FieldStandardizer {
        FieldStandardizer::new(TextConfig::default().field_aliases)
    }

    fn keys(record: &FieldRecord) -> Vec<Option<&str>> {
        record.keys().collect()
    }

    #[test]
    fn relation_words() {
        assert_eq!(relation_key("पिता का"), FATHER_NAME);
        assert_eq!(relation_key("पति का नाम"), HUSBAND_NAME);
        assert_eq!(relation_key("माता का नाम"), MOTHER_NAME);
        assert_eq!(relation_key("पत्नी का नाम"), WIFE_NAME);
        assert_eq!(relation_key("Husband's Name"), HUSBAND_NAME);
        assert_eq!(relation_key("Fathers Name"), FATHER_NAME);
        assert_eq!(relation_key("???"), RELATIVE_NAME);
        assert_eq!(relation_key(RELATIVE_NAME), RELATIVE_NAME);
    }

    #[test]
    fn first_three_positions() {
        let record = FieldRecord::from_pairs([
            ("नम", "राम"),
            ("पति का", "श्याम"),
            ("मकान सं", "12"),
            ("उम्र", "30"),
        ]);
        let out = standardizer().standardize(record);
        assert_eq!(
            keys(&out),
            vec![Some(VOTER_NAME), Some(HUSBAND_NAME), Some(HOUSE_NUMBER), Some(AGE)]
        );
        assert_eq!(out.get(VOTER_NAME), Some("राम"));
    }

    #[test]
    fn third_field_without_house_label_is_kept() {
        let record = FieldRecord::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]);
        let out = standardizer().standardize(record);
        assert_eq!(keys(&out), vec![Some(VOTER_NAME), Some(RELATIVE_NAME), Some("c")]);
    }

    #[test]
    fn english_column() {
        let record = FieldRecord::from_pairs([
            ("Name", "Ram"),
            ("Father's Name", "Shyam"),
            ("House Number", "12"),
            ("Age", "30"),
            ("Gender", "M"),
        ]);
        let out = standardizer().standardize(record);
        assert_eq!(
            keys(&out),
            vec![
                Some(VOTER_NAME),
                Some(FATHER_NAME),
                Some(HOUSE_NUMBER),
                Some(AGE),
                Some(GENDER)
            ]
        );
    }

    #[test]
    fn fixed_keys_keep_their_place() {
        let record = FieldRecord::from_pairs([("voter_id", "ABC1234567"), ("उम्र", "30")]);
        let out = standardizer().standardize(record.clone());
        assert_eq!(out, record);
    }

    #[test]
    fn leading_voter_id_takes_no_position() {
        let record = FieldRecord::from_pairs([
            ("voter_id", "ABC1234567"),
            ("नाम", "राम"),
            ("पिता का", "श्याम"),
            ("मकान", "12"),
        ]);
        let out = standardizer().standardize(record);
        assert_eq!(
            keys(&out),
            vec![
                Some(VOTER_ID),
                Some(VOTER_NAME),
                Some(FATHER_NAME),
                Some(HOUSE_NUMBER)
            ]
        );
        assert_eq!(out.get(VOTER_NAME), Some("राम"));
    }

    #[test]
    fn age_between_name_and_relation_is_skipped() {
        let record = FieldRecord::from_pairs([
            ("नम", "राम"),
            ("उम्र", "30"),
            ("पति का", "श्याम"),
        ]);
        let out = standardizer().standardize(record);
        assert_eq!(
            keys(&out),
            vec![Some(VOTER_NAME), Some(AGE), Some(HUSBAND_NAME)]
        );
    }

    #[test]
    fn idempotent() {
        let record = FieldRecord::from_pairs([
            ("नाम", "राम"),
            ("xyz", "श्याम"),
            ("Age", "30"),
            ("age", "31"),
        ]);
        let once = standardizer().standardize(record);
        let twice = standardizer().standardize(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.get(AGE), Some("31"));
    }

    #[test]
    fn short_and_empty_records() {
        assert!(standardizer().standardize(FieldRecord::new()).is_empty());
        let single = standardizer().standardize(FieldRecord::from_pairs([("", "राम")]));
        assert_eq!(keys(&single), vec![Some(VOTER_NAME)]);
    }
}
