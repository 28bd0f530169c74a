use std::{io::Write, path::Path};

use anyhow::Result;
use voter_roll_extract::{
    config::{ConfigLoader, ContourMode, OcrEngineKind},
    consts::*,
    text::TextParser,
};

fn manifest_path(relative: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn shipped_config_loads() -> Result<()> {
    let config = ConfigLoader::load_from_file(&manifest_path("config/extract.toml"))?;

    assert_eq!(config.input.dpi, 900);
    assert_eq!(config.geometry.voter_box.contours.mode, ContourMode::External);
    assert_eq!(config.geometry.voter_box.position_tolerance, 500);
    assert_eq!(config.ocr.engine, OcrEngineKind::Tesseract);
    assert_eq!(config.ocr.neural.recognizers.len(), 2);
    assert_eq!(config.text.field_aliases.get("Age").map(String::as_str), Some(AGE));
    Ok(())
}

#[test]
fn shipped_tables_drive_the_parser() -> Result<()> {
    let mut config = ConfigLoader::load_from_file(&manifest_path("config/extract.toml"))?;
    config.text.corrections_path = Some(manifest_path("config/ocr_corrections.json"));
    config.text.digits_path = Some(manifest_path("config/hindi_digits.json"));

    let parser = TextParser::from_config(&config.text)?;
    let record = parser.parse("निर्वाचक का नाम: राम\nपति का नाम: श्याम\nमकान सख्या: ४२\nउप्र: ३१\nलिग: पुरूष")?;

    assert_eq!(record.get(VOTER_NAME), Some("राम"));
    assert_eq!(record.get(HUSBAND_NAME), Some("श्याम"));
    assert_eq!(record.get(HOUSE_NUMBER), Some("42"));
    assert_eq!(record.get(AGE), Some("31"));
    assert_eq!(record.get(GENDER), Some("पुरुष"));
    Ok(())
}

#[test]
fn json_file_with_inverted_range_is_rejected() -> Result<()> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{ "geometry": {{ "voter_box": {{ "aspect_ratio": {{ "min": 2.6, "max": 2.4 }} }} }} }}"#
    )?;

    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("voter_box.aspect_ratio"));
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() -> Result<()> {
    let file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    assert!(ConfigLoader::load_from_file(file.path()).is_err());
    Ok(())
}
