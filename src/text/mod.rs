// Text parsing: raw OCR text of one side into a standardized field record

use log::{debug, warn};

use crate::{config::TextConfig, error::Result};

pub mod pipeline;
pub mod record;
pub mod standardize;
pub mod tables;

pub use pipeline::{TextPipeline, TextTransform, extract_pairs, match_voter_id};
pub use record::FieldRecord;
pub use standardize::FieldStandardizer;
pub use tables::{CorrectionTable, DigitTable};

pub struct TextParser {
    pipeline: TextPipeline,
    digits: DigitTable,
    standardizer: FieldStandardizer,
}

impl TextParser {
    pub fn new(pipeline: TextPipeline, digits: DigitTable, standardizer: FieldStandardizer) -> Self {
        Self {
            pipeline,
            digits,
            standardizer,
        }
    }

    /// Build the standard parser, loading the external tables named in `config`.
    pub fn from_config(config: &TextConfig) -> Result<Self> {
        let corrections = match &config.corrections_path {
            Some(path) => CorrectionTable::load(path)?,
            None => {
                debug!("No corrections table configured");
                CorrectionTable::default()
            }
        };
        let digits = match &config.digits_path {
            Some(path) => DigitTable::load(path)?,
            None => DigitTable::default(),
        };

        Ok(Self::new(
            TextPipeline::standard(corrections),
            digits,
            FieldStandardizer::new(config.field_aliases.clone()),
        ))
    }

    pub fn pipeline_mut(&mut self) -> &mut TextPipeline {
        &mut self.pipeline
    }

    /// Parse the text of one side into a standardized record.
    pub fn parse(&self, raw: &str) -> Result<FieldRecord> {
        let text = self.pipeline.run(raw)?;
        let pairs = extract_pairs(&text)
            .into_iter()
            .map(|(key, value)| (key, self.digits.convert(&value)));
        Ok(self.standardizer.standardize(FieldRecord::from_pairs(pairs)))
    }

    /// [`Self::parse`], degrading any failure to an empty record.
    pub fn parse_or_empty(&self, raw: &str, unit: &str) -> FieldRecord {
        self.parse(raw).unwrap_or_else(|e| {
            warn!("{unit} [parse]: {e}; using empty record");
            FieldRecord::new()
        })
    }

    /// Overlay `right` onto `left` and standardize the result.
    pub fn merge(&self, mut left: FieldRecord, right: FieldRecord) -> FieldRecord {
        left.merge(right);
        self.standardizer.standardize(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExtractError, consts::*};

    fn parser() -> TextParser {
        TextParser::from_config(&TextConfig::default()).unwrap()
    }

    #[test]
    fn parses_box_text() {
        let record = parser()
            .parse("नाम: राम\nपिता का: श्याम\nउम्र:३०\nलिंग:M\nXYZ/01/234/567890")
            .unwrap();

        assert_eq!(record.get(VOTER_NAME), Some("राम"));
        assert_eq!(record.get(FATHER_NAME), Some("श्याम"));
        assert_eq!(record.get(AGE), Some("30"));
        assert_eq!(record.get(GENDER), Some("M"));
        assert_eq!(record.get(VOTER_ID), Some("XYZ/01/234/567890"));
        assert!(!record.contains_key("नाम"));
        assert!(!record.contains_key("पिता का"));
    }

    #[test]
    fn digits_only_touch_values() {
        let record = parser()
            .parse("नाम:राम\nपति:श्याम\nमकान ४:४२\nक्रम ५:१२")
            .unwrap();
        assert_eq!(record.get(HOUSE_NUMBER), Some("42"));
        assert_eq!(record.key_at(3), Some(Some("क्रम ५")));
        assert_eq!(record.get("क्रम ५"), Some("12"));
        assert!(!record.contains_key("क्रम 5"));
    }

    #[test]
    fn voter_id_first_keeps_fields_aligned() {
        let p = parser();
        let left = p
            .parse("ABC1234567\nनाम: राम\nपिता का नाम: श्याम\nमकान संख्या: 12")
            .unwrap();
        let right = p
            .parse("ABC1234567\nName: Ram\nFather's Name: Shyam\nHouse Number: 12")
            .unwrap();

        let merged = p.merge(left, right);
        let keys: Vec<_> = merged.keys().collect();
        assert_eq!(
            keys,
            vec![
                Some(VOTER_ID),
                Some(VOTER_NAME),
                Some(FATHER_NAME),
                Some(HOUSE_NUMBER)
            ]
        );
        assert_eq!(merged.get(VOTER_NAME), Some("Ram"));
        assert_eq!(merged.get(FATHER_NAME), Some("Shyam"));
    }

    #[test]
    fn sides_merge_onto_one_key_per_field() {
        let p = parser();
        let left = p
            .parse("नाम: राम\nपिता का नाम: श्याम\nमकान संख्या: 12\nउम्र : 30 पुरुष : लिंग : पुरुष")
            .unwrap();
        let right = p
            .parse("Name: Ram\nFather's Name: Shyam\nHouse Number: 12\nAge: 30 Gender: Male")
            .unwrap();

        let merged = p.merge(left, right);
        let keys: Vec<_> = merged.keys().collect();
        assert_eq!(
            keys,
            vec![
                Some(VOTER_NAME),
                Some(FATHER_NAME),
                Some(HOUSE_NUMBER),
                Some(AGE),
                Some(GENDER)
            ]
        );
        assert_eq!(merged.get(VOTER_NAME), Some("Ram"));
        assert_eq!(merged.get(GENDER), Some("Male"));
    }

    struct Failing;

    impl TextTransform for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, _text: &str) -> Result<String> {
            Err(ExtractError::parse("failing", "boom"))
        }
    }

    #[test]
    fn failing_stage_gives_empty_record() {
        let mut p = parser();
        p.pipeline_mut().push(Failing);
        assert!(p.parse("नाम:राम").is_err());
        assert!(p.parse_or_empty("नाम:राम", "doc p0 r0").is_empty());
    }
}
