pub mod consts {
    //! Canonical output keys of a voter record.

    pub const VOTER_NAME: &str = "निर्वाचक का नाम";
    pub const FATHER_NAME: &str = "पिता का नाम";
    pub const HUSBAND_NAME: &str = "पति का नाम";
    pub const MOTHER_NAME: &str = "माता का नाम";
    pub const WIFE_NAME: &str = "पत्नी का नाम";
    /// Relation field whose relation token could not be read
    pub const RELATIVE_NAME: &str = "पिता/पति का नाम";
    pub const HOUSE_NUMBER: &str = "मकान संख्या";
    pub const AGE: &str = "उम्र";
    pub const GENDER: &str = "लिंग";
    pub const VOTER_ID: &str = "voter_id";
    pub const IMAGE: &str = "image";

    /// Relation token (Hindi or English, lower-case) -> canonical relation key.
    pub const RELATIONS: [(&str, &str); 8] = [
        ("पिता", FATHER_NAME),
        ("father", FATHER_NAME),
        ("पति", HUSBAND_NAME),
        ("husband", HUSBAND_NAME),
        ("माता", MOTHER_NAME),
        ("mother", MOTHER_NAME),
        ("पत्नी", WIFE_NAME),
        ("wife", WIFE_NAME),
    ];

    /// Built-in numeral table used when no external digit table is configured.
    pub const DEVANAGARI_DIGITS: [(char, char); 10] = [
        ('०', '0'),
        ('१', '1'),
        ('२', '2'),
        ('३', '3'),
        ('४', '4'),
        ('५', '5'),
        ('६', '6'),
        ('७', '7'),
        ('८', '8'),
        ('९', '9'),
    ];
}

pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod geometry;
pub mod imaging;
pub mod normalizer;
pub mod ocr;
pub mod raster;
pub mod splitter;
pub mod text;
pub mod worker_pool;

pub use error::{ExtractError, Result};
