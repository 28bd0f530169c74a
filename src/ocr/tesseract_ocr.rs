// Tesseract-based OCR implementation

use std::collections::HashMap;

use log::{debug, warn};
use opencv::{core::Mat, prelude::*};
use tesseract::Tesseract;

use super::OcrEngine;
use crate::{
    config::TesseractConfig,
    error::{ExtractError, Result},
    imaging,
};

/// Tesseract engine with one initialized API handle per language set.
///
/// Handles are created lazily on first use and kept for the lifetime of the
/// worker; initialization loads the traineddata files and is the slow part.
pub struct TesseractOcrEngine {
    datapath: Option<String>,
    variables: Vec<(String, String)>,
    instances: HashMap<String, Tesseract>,
}

impl TesseractOcrEngine {
    pub fn new(config: &TesseractConfig) -> Self {
        Self {
            datapath: config.datapath.clone(),
            variables: parse_config_string(&config.config),
            instances: HashMap::new(),
        }
    }

    fn init(&self, language: &str) -> Result<Tesseract> {
        debug!("Initializing Tesseract for '{language}'");
        let mut tess = Tesseract::new(self.datapath.as_deref(), Some(language))
            .map_err(|e| ExtractError::OcrBackend(format!("init '{language}': {e}")))?;

        for (name, value) in &self.variables {
            tess = tess
                .set_variable(name, value)
                .map_err(|e| ExtractError::OcrBackend(format!("set {name}={value}: {e}")))?;
        }
        Ok(tess)
    }
}

impl OcrEngine for TesseractOcrEngine {
    fn recognize(&mut self, image: &Mat, languages: &[String]) -> Result<String> {
        let language = languages.join("+");
        let gray = imaging::to_gray(image)?;
        let (width, height) = (gray.cols(), gray.rows());
        let bytes = gray.data_bytes()?;

        // The tesseract API consumes its handle on every call; a failed
        // call drops it and the next one re-initializes.
        let tess = match self.instances.remove(&language) {
            Some(tess) => tess,
            None => self.init(&language)?,
        };

        let mut tess = tess
            .set_frame(bytes, width, height, 1, width)
            .map_err(|e| ExtractError::OcrBackend(format!("set_frame: {e}")))?
            .recognize()
            .map_err(|e| ExtractError::OcrBackend(format!("recognize: {e}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractError::OcrBackend(format!("get_text: {e}")))?;

        self.instances.insert(language, tess);
        Ok(text)
    }
}

/// Translate a tesseract command-line style option string into API variables.
///
/// `--psm N` becomes `tessedit_pageseg_mode`, `-c name=value` is passed
/// through. `--oem` cannot be changed after initialization and is ignored.
fn parse_config_string(config: &str) -> Vec<(String, String)> {
    let mut variables = Vec::new();
    let mut tokens = config.split_whitespace();

    while let Some(token) = tokens.next() {
        match token {
            "--psm" => {
                if let Some(mode) = tokens.next() {
                    variables.push(("tessedit_pageseg_mode".to_string(), mode.to_string()));
                }
            }
            "--oem" => {
                if let Some(mode) = tokens.next() {
                    debug!("Ignoring --oem {mode}; the engine mode is fixed at build time");
                }
            }
            "-c" => {
                if let Some((name, value)) = tokens.next().and_then(|kv| kv.split_once('=')) {
                    variables.push((name.to_string(), value.to_string()));
                }
            }
            other => warn!("Unknown tesseract option '{other}'"),
        }
    }

    variables
}
