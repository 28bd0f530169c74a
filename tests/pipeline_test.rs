mod common;

use std::cell::Cell;

use anyhow::Result;
use common::*;
use image::RgbImage;
use opencv::core::Mat;
use voter_roll_extract::{
    ExtractError,
    config::ImageEncoding,
    consts::*,
    export::decode_passport_base64,
    extractor::Extractor,
    imaging,
    ocr::OcrEngine,
    raster::PageSource,
    text::{FieldRecord, TextParser, TextTransform},
};

const BOX_TEXT: &str = "नाम: राम\nपिता का: श्याम\nउम्र:30\nलिंग:M\nXYZ/01/234/567890";

/// Returns the same text for every call.
struct FixedText(&'static str);

impl OcrEngine for FixedText {
    fn recognize(&mut self, _image: &Mat, _languages: &[String]) -> voter_roll_extract::Result<String> {
        Ok(self.0.to_string())
    }
}

/// Hindi text for the two-language left column, English for the right one.
struct Bilingual;

impl OcrEngine for Bilingual {
    fn recognize(&mut self, _image: &Mat, languages: &[String]) -> voter_roll_extract::Result<String> {
        Ok(if languages.len() > 1 {
            "नाम: राम\nपिता का नाम: श्याम\nमकान संख्या: 12\nउम्र : 30 पुरुष : लिंग : पुरुष"
        } else {
            "Name : Ram\nFather's Name: Shyam\nHouse Number : 12\nAge : 30 Gender : Male"
        }
        .to_string())
    }
}

/// Plays back one text per call, in order.
struct Scripted {
    texts: Vec<&'static str>,
    next: usize,
}

impl OcrEngine for Scripted {
    fn recognize(&mut self, _image: &Mat, _languages: &[String]) -> voter_roll_extract::Result<String> {
        let text = self.texts.get(self.next).copied().unwrap_or_default();
        self.next += 1;
        Ok(text.to_string())
    }
}

/// Parse stage that rejects any text containing `FAIL`.
struct RejectMarked;

impl TextTransform for RejectMarked {
    fn name(&self) -> &'static str {
        "reject-marked"
    }

    fn apply(&self, text: &str) -> voter_roll_extract::Result<String> {
        if text.contains("FAIL") {
            return Err(ExtractError::parse("reject-marked", "marked text"));
        }
        Ok(text.to_string())
    }
}

fn parser() -> Result<TextParser> {
    Ok(TextParser::from_config(&test_config().text)?)
}

fn single_box_page(with_photo: bool) -> Result<Mat> {
    let mut page = blank_page(600, 300)?;
    draw_box(&mut page, 150, 100)?;
    if with_photo {
        draw_photo(&mut page, 150, 100)?;
    }
    Ok(page)
}

#[test]
fn single_box_end_to_end() -> Result<()> {
    let config = test_config();
    let parser = parser()?;
    let mut extractor = Extractor::new(&config, &parser, FixedText(BOX_TEXT));

    let page = extractor.extract_page(&single_box_page(true)?, 4, "synthetic")?;

    assert_eq!(page.page_index, 4);
    assert_eq!(page.records.len(), 1);
    let record = &page.records[0];
    assert_eq!(record.get(VOTER_NAME), Some("राम"));
    assert_eq!(record.get(FATHER_NAME), Some("श्याम"));
    assert_eq!(record.get(AGE), Some("30"));
    assert_eq!(record.get(GENDER), Some("M"));
    assert_eq!(record.get(VOTER_ID), Some("XYZ/01/234/567890"));
    assert!(!record.contains_key("नाम"));
    assert!(!record.contains_key("पिता का"));

    let photo = decode_passport_base64(record.get(IMAGE).expect("photo attached"))?;
    assert_eq!(&photo[..4], &[0x89, b'P', b'N', b'G']);
    Ok(())
}

#[test]
fn photo_is_omitted_when_configured() -> Result<()> {
    let mut config = test_config();
    config.output.image_encoding = ImageEncoding::Omit;
    let parser = parser()?;
    let mut extractor = Extractor::new(&config, &parser, FixedText(BOX_TEXT));

    let page = extractor.extract_page(&single_box_page(true)?, 0, "synthetic")?;

    assert!(!page.records[0].contains_key(IMAGE));
    Ok(())
}

#[test]
fn both_columns_merge_onto_canonical_keys() -> Result<()> {
    let config = test_config();
    let parser = parser()?;
    let mut extractor = Extractor::new(&config, &parser, Bilingual);

    let page = extractor.extract_page(&single_box_page(false)?, 0, "synthetic")?;
    let record = &page.records[0];

    let keys: Vec<_> = record.keys().collect();
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
    // Right column wins on collisions
    assert_eq!(record.get(VOTER_NAME), Some("Ram"));
    assert_eq!(record.get(GENDER), Some("Male"));
    Ok(())
}

#[test]
fn box_text_opening_with_voter_id() -> Result<()> {
    let config = test_config();
    let parser = parser()?;
    let mut extractor = Extractor::new(
        &config,
        &parser,
        FixedText("ABC1234567\nनाम: राम\nपिता का नाम: श्याम\nमकान संख्या: 12"),
    );

    let page = extractor.extract_page(&single_box_page(false)?, 0, "synthetic")?;
    let record = &page.records[0];

    let keys: Vec<_> = record.keys().collect();
    assert_eq!(
        keys,
        vec![
            Some(VOTER_ID),
            Some(VOTER_NAME),
            Some(FATHER_NAME),
            Some(HOUSE_NUMBER)
        ]
    );
    assert_eq!(record.get(VOTER_ID), Some("ABC1234567"));
    assert_eq!(record.get(VOTER_NAME), Some("राम"));
    Ok(())
}

#[test]
fn failing_box_does_not_affect_its_neighbours() -> Result<()> {
    let config = test_config();
    let mut parser = parser()?;
    parser.pipeline_mut().push(RejectMarked);

    let engine = Scripted {
        texts: vec!["नाम:A", "", "FAIL", "FAIL", "नाम:C", ""],
        next: 0,
    };
    let mut extractor = Extractor::new(&config, &parser, engine);

    let mut page = blank_page(1000, 300)?;
    for (x, y) in &GRID[..3] {
        draw_box(&mut page, *x, *y)?;
    }
    let result = extractor.extract_page(&page, 0, "synthetic")?;

    assert_eq!(result.records.len(), 3);
    assert_eq!(result.records[0].get(VOTER_NAME), Some("A"));
    assert_eq!(result.records[1], FieldRecord::new());
    assert_eq!(result.records[2].get(VOTER_NAME), Some("C"));
    Ok(())
}

/// In-memory document whose second page cannot be rendered.
struct FakeDocument {
    pages: Vec<Option<RgbImage>>,
    rendered: Cell<usize>,
}

impl PageSource for FakeDocument {
    fn page_count(&self) -> voter_roll_extract::Result<usize> {
        Ok(self.pages.len())
    }

    fn render_page(&self, index: usize) -> voter_roll_extract::Result<RgbImage> {
        self.rendered.set(self.rendered.get() + 1);
        self.pages
            .get(index)
            .cloned()
            .flatten()
            .ok_or_else(|| ExtractError::UnreadableImage(format!("page {index}")))
    }
}

#[test]
fn document_skips_broken_pages_and_keeps_order() -> Result<()> {
    let mut config = test_config();
    config.input.start_page = 1;
    config.input.pages_to_exclude = 1;
    let parser = parser()?;
    let mut extractor = Extractor::new(&config, &parser, FixedText(BOX_TEXT));

    let good = imaging::mat_to_rgb_image(&grid_page()?)?;
    let doc = FakeDocument {
        // cover page, content, unreadable, content, summary page
        pages: vec![
            Some(good.clone()),
            Some(good.clone()),
            None,
            Some(good.clone()),
            Some(good),
        ],
        rendered: Cell::new(0),
    };

    let extraction = extractor.extract_document(&doc, "fake")?;

    let indices: Vec<usize> = extraction.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(indices, vec![1, 3]);
    assert!(extraction.pages.iter().all(|p| p.records.len() == GRID.len()));
    assert_eq!(doc.rendered.get(), 3);
    assert_eq!(extraction.stats.pages, 3);
    assert_eq!(extraction.stats.pages_failed, 1);
    assert_eq!(extraction.stats.records, 2 * GRID.len());
    Ok(())
}
