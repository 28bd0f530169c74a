// OCR engine trait and implementations

use std::time::Instant;

use log::{debug, warn};
use opencv::core::Mat;

use crate::{
    config::{OcrConfig, OcrEngineKind},
    error::Result,
    splitter::Sides,
};

#[cfg(feature = "neural")]
pub mod neural_ocr;
pub mod tesseract_ocr;

/// Trait for OCR engines that turn one image into raw multi-line text
pub trait OcrEngine {
    /// Recognize all text in `image`
    ///
    /// # Arguments
    ///
    /// * `image` - Normalized single-channel (or BGR) image
    /// * `languages` - Language codes, e.g. `["hin", "eng"]`
    ///
    /// # Returns
    ///
    /// Recognized lines joined with `\n`
    fn recognize(&mut self, image: &Mat, languages: &[String]) -> Result<String>;
}

/// Wrapper enum for the configured OCR backend
/// This allows choosing the engine at runtime without dyn trait objects
pub enum OcrEngineWrapper {
    Tesseract(tesseract_ocr::TesseractOcrEngine),
    #[cfg(feature = "neural")]
    Neural(neural_ocr::NeuralOcrEngine),
}

impl OcrEngineWrapper {
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        match config.engine {
            OcrEngineKind::Tesseract => Ok(OcrEngineWrapper::Tesseract(
                tesseract_ocr::TesseractOcrEngine::new(&config.tesseract),
            )),
            #[cfg(feature = "neural")]
            OcrEngineKind::Neural => Ok(OcrEngineWrapper::Neural(
                neural_ocr::NeuralOcrEngine::new(&config.neural)?,
            )),
            #[cfg(not(feature = "neural"))]
            OcrEngineKind::Neural => Err(crate::ExtractError::config(
                "ocr.engine = \"neural\" requires building with the `neural` feature",
            )),
        }
    }
}

impl OcrEngine for OcrEngineWrapper {
    fn recognize(&mut self, image: &Mat, languages: &[String]) -> Result<String> {
        match self {
            OcrEngineWrapper::Tesseract(engine) => engine.recognize(image, languages),
            #[cfg(feature = "neural")]
            OcrEngineWrapper::Neural(engine) => engine.recognize(image, languages),
        }
    }
}

/// Raw text of both columns of one voter box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideTexts {
    pub left: String,
    pub right: String,
}

/// OCR the left column with `left_languages` and the right column with
/// `right_languages`.
///
/// Hindi labels are printed in the left column and English labels in the
/// right one; this is a property of the voter-roll layout, not something
/// detected per box. A failing side yields an empty string.
pub fn perform_ocr_on_sides<E: OcrEngine>(
    engine: &mut E,
    sides: &Sides,
    config: &OcrConfig,
    unit: &str,
) -> SideTexts {
    SideTexts {
        left: recognize_side(engine, &sides.left, &config.left_languages, config, unit, "ocr-left"),
        right: recognize_side(
            engine,
            &sides.right,
            &config.right_languages,
            config,
            unit,
            "ocr-right",
        ),
    }
}

fn recognize_side<E: OcrEngine>(
    engine: &mut E,
    image: &Mat,
    languages: &[String],
    config: &OcrConfig,
    unit: &str,
    stage: &str,
) -> String {
    let start = Instant::now();
    let result = engine.recognize(image, languages);
    let elapsed = start.elapsed();

    if elapsed.as_millis() > config.slow_call_warning_ms as u128 {
        warn!("{unit} [{stage}]: OCR took {:.2}s", elapsed.as_secs_f64());
    }

    match result {
        Ok(text) => {
            debug!("{unit} [{stage}]: {} chars in {:?}", text.chars().count(), elapsed);
            text
        }
        Err(e) => {
            warn!("{unit} [{stage}]: {e}; continuing with empty text");
            String::new()
        }
    }
}
