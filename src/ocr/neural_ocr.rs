// ONNX-based OCR implementation (text-line detector + recognizer)

use std::collections::HashMap;

use log::debug;
use oar_ocr::oarocr::{OAROCR, OAROCRBuilder};
use opencv::core::Mat;

use super::OcrEngine;
use crate::{
    config::NeuralConfig,
    error::{ExtractError, Result},
    imaging,
};

/// One detection + recognition pipeline per configured language set.
pub struct NeuralOcrEngine {
    pipelines: HashMap<String, OAROCR>,
    min_confidence: f32,
}

impl NeuralOcrEngine {
    pub fn new(config: &NeuralConfig) -> Result<Self> {
        if config.recognizers.is_empty() {
            return Err(ExtractError::config(
                "ocr.neural.recognizers must name at least one language set",
            ));
        }

        let mut pipelines = HashMap::new();
        for (language, model) in &config.recognizers {
            debug!(
                "Loading recognizer {} for '{language}'",
                model.model.display()
            );
            let ocr = OAROCRBuilder::new(&config.detection_model, &model.model, &model.dict)
                .build()
                .map_err(|e| ExtractError::OcrBackend(format!("load '{language}': {e}")))?;
            pipelines.insert(language.clone(), ocr);
        }

        Ok(Self {
            pipelines,
            min_confidence: config.min_confidence,
        })
    }
}

impl OcrEngine for NeuralOcrEngine {
    fn recognize(&mut self, image: &Mat, languages: &[String]) -> Result<String> {
        let language = languages.join("+");
        let ocr = self.pipelines.get(&language).ok_or_else(|| {
            ExtractError::OcrBackend(format!("no recognizer configured for '{language}'"))
        })?;

        let rgb = imaging::mat_to_rgb_image(image)?;
        let results = ocr
            .predict(vec![rgb])
            .map_err(|e| ExtractError::OcrBackend(e.to_string()))?;

        // Reading order: top edge first, then left edge
        let mut lines: Vec<(f32, f32, String)> = Vec::new();
        for result in &results {
            for region in &result.text_regions {
                let confidence = region.confidence.unwrap_or(0.0);
                let Some(text) = region.text.as_ref() else {
                    continue;
                };
                if confidence < self.min_confidence || text.trim().is_empty() {
                    continue;
                }
                let bbox = &region.bounding_box;
                lines.push((bbox.y_min(), bbox.x_min(), text.to_string()));
            }
        }
        lines.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        Ok(lines
            .into_iter()
            .map(|(_, _, text)| text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
