// Page orchestration: page image to voter records

use std::time::Instant;

use log::{debug, error, info, warn};
use opencv::{core::Vector, imgcodecs, prelude::*};
use rayon::prelude::*;

use crate::{
    config::{ExtractConfig, ImageEncoding},
    consts::IMAGE,
    error::{ExtractError, Result},
    export::encode_passport_base64,
    geometry::{self, BoundingBox, GeometryDetector, RegionClass, Roi},
    imaging,
    normalizer::RegionNormalizer,
    ocr::{OcrEngine, perform_ocr_on_sides},
    raster::{PageSource, content_pages},
    splitter::{self, Sides},
    text::{FieldRecord, TextParser},
};

/// Records of one page, in reading order.
#[derive(Debug, Clone, Default)]
pub struct PageRecordSet {
    pub page_index: usize,
    pub records: Vec<FieldRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub pages: usize,
    pub pages_failed: usize,
    pub rois: usize,
    pub rois_skipped: usize,
    pub records: usize,
}

pub struct DocumentExtraction {
    pub pages: Vec<PageRecordSet>,
    pub stats: ExtractStats,
}

/// Output of the engine-free preparation of one box.
struct PreparedRoi {
    bbox: BoundingBox,
    sides: Sides,
    passport: Option<Vec<u8>>,
}

pub struct Extractor<'a, E: OcrEngine> {
    config: &'a ExtractConfig,
    detector: GeometryDetector<'a>,
    normalizer: RegionNormalizer<'a>,
    parser: &'a TextParser,
    engine: E,
    stats: ExtractStats,
}

impl<'a, E: OcrEngine> Extractor<'a, E> {
    pub fn new(config: &'a ExtractConfig, parser: &'a TextParser, engine: E) -> Self {
        Self {
            config,
            detector: GeometryDetector::new(&config.geometry, &config.normalize),
            normalizer: RegionNormalizer::new(&config.geometry, &config.normalize),
            parser,
            engine,
            stats: ExtractStats::default(),
        }
    }

    /// Counters accumulated since the last [`Self::extract_document`] started.
    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    /// Extract every voter box of one page image.
    ///
    /// Errors only when the page itself cannot be processed; individual
    /// boxes that fail are skipped.
    pub fn extract_page(
        &mut self,
        page: &Mat,
        page_index: usize,
        document: &str,
    ) -> Result<PageRecordSet> {
        let rois = self.detector.detect_regions(page)?;
        self.stats.rois += rois.len();

        if let Some(dir) = &self.config.output.debug_dir {
            self.write_annotation(page, &rois, dir, page_index, document);
        }

        if rois.is_empty() {
            let err = ExtractError::NoRegion(format!("page {page_index}"));
            warn!("{document} p{page_index} [detect]: {err}");
            return Ok(PageRecordSet {
                page_index,
                records: Vec::new(),
            });
        }
        debug!("{document} p{page_index}: {} voter boxes", rois.len());

        let prepared = self.prepare(rois, page_index, document);

        let mut records = Vec::with_capacity(prepared.len());
        for (roi_index, roi) in prepared {
            let Some(roi) = roi else {
                self.stats.rois_skipped += 1;
                continue;
            };
            let unit = format!("{document} p{page_index} r{roi_index}");
            records.push(self.assemble(roi, &unit));
        }

        self.stats.records += records.len();
        Ok(PageRecordSet {
            page_index,
            records,
        })
    }

    /// Run every content page of `source` through [`Self::extract_page`].
    ///
    /// Fails only when the page count cannot be read.
    pub fn extract_document<S: PageSource>(
        &mut self,
        source: &S,
        document: &str,
    ) -> Result<DocumentExtraction> {
        let start = Instant::now();
        self.stats = ExtractStats::default();

        let page_count = source.page_count()?;
        let range = content_pages(
            page_count,
            self.config.input.start_page,
            self.config.input.pages_to_exclude,
        );
        info!(
            "{document}: {page_count} pages, extracting {}..{}",
            range.start, range.end
        );

        let mut pages = Vec::with_capacity(range.len());
        for page_index in range {
            self.stats.pages += 1;
            let result = source
                .render_page(page_index)
                .and_then(|raster| imaging::rgb_image_to_mat(&raster))
                .and_then(|mat| self.extract_page(&mat, page_index, document));

            match result {
                Ok(page) => pages.push(page),
                Err(e) => {
                    self.stats.pages_failed += 1;
                    error!("{document} p{page_index} [detect]: {e}; page skipped");
                }
            }
        }

        let stats = self.stats;
        info!(
            "{document}: {} pages ({} failed), {} boxes, {} records, {} boxes skipped in {:.1}s",
            stats.pages,
            stats.pages_failed,
            stats.rois,
            stats.records,
            stats.rois_skipped,
            start.elapsed().as_secs_f64()
        );

        Ok(DocumentExtraction { pages, stats })
    }

    /// Normalize, split and look for the photo of every box in parallel.
    ///
    /// Result order matches `rois`; `None` marks a skipped box.
    fn prepare(
        &self,
        rois: Vec<Roi>,
        page_index: usize,
        document: &str,
    ) -> Vec<(usize, Option<PreparedRoi>)> {
        let detector = &self.detector;
        let normalizer = &self.normalizer;
        let sections = self.config.ocr.sections;

        rois.into_par_iter()
            .enumerate()
            .map(|(roi_index, roi)| {
                let unit = format!("{document} p{page_index} r{roi_index}");

                let normalized = match normalizer.normalize(&roi.image, RegionClass::Processed) {
                    Ok(mat) => mat,
                    Err(e) => {
                        warn!("{unit} [normalize]: {e}; box skipped");
                        return (roi_index, None);
                    }
                };
                let sides = match splitter::split(&normalized, sections) {
                    Ok(sides) => sides,
                    Err(e) => {
                        warn!("{unit} [split]: {e}; box skipped");
                        return (roi_index, None);
                    }
                };
                let passport = detector.detect_passport(&roi).unwrap_or_else(|e| {
                    warn!("{unit} [passport]: {e}; continuing without photo");
                    None
                });

                (
                    roi_index,
                    Some(PreparedRoi {
                        bbox: roi.bbox,
                        sides,
                        passport,
                    }),
                )
            })
            .collect()
    }

    fn assemble(&mut self, roi: PreparedRoi, unit: &str) -> FieldRecord {
        let texts = perform_ocr_on_sides(&mut self.engine, &roi.sides, &self.config.ocr, unit);

        let left = self.parser.parse_or_empty(&texts.left, unit);
        let right = self.parser.parse_or_empty(&texts.right, unit);
        let mut record = self.parser.merge(left, right);

        if let (Some(png), ImageEncoding::Base64) = (&roi.passport, self.config.output.image_encoding)
        {
            record.set(IMAGE, encode_passport_base64(png));
        }

        debug!("{unit}: {} fields from box at {:?}", record.len(), roi.bbox);
        record
    }

    fn write_annotation(
        &self,
        page: &Mat,
        rois: &[Roi],
        dir: &std::path::Path,
        page_index: usize,
        document: &str,
    ) {
        let boxes: Vec<BoundingBox> = rois.iter().map(|r| r.bbox).collect();
        let path = dir.join(format!("{document}_p{page_index:03}.png"));

        let result = std::fs::create_dir_all(dir)
            .map_err(ExtractError::from)
            .and_then(|_| geometry::annotate(page, &boxes))
            .and_then(|annotated| {
                imgcodecs::imwrite(&path.to_string_lossy(), &annotated, &Vector::new())
                    .map_err(ExtractError::from)
            });

        match result {
            Ok(true) => debug!("Wrote {}", path.display()),
            Ok(false) => warn!("Could not encode {}", path.display()),
            Err(e) => warn!("{document} p{page_index}: debug annotation failed: {e}"),
        }
    }
}
