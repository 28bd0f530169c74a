// Voter-box and passport-photo detection by contour geometry

use log::debug;
use opencv::{
    core::{Mat, Point, Rect, Scalar, Vector},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

use crate::{
    config::{CannyConfig, ContourConfig, GeometryConfig, NormalizeConfig, VoterBoxConfig},
    error::Result,
    imaging,
    normalizer::RegionNormalizer,
};

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return f64::INFINITY;
        }
        self.width as f64 / self.height as f64
    }

    /// Same printed box: position and size both within tolerance.
    pub fn is_near(&self, other: &BoundingBox, position_tolerance: i32, size_tolerance: i32) -> bool {
        (self.x - other.x).abs() < position_tolerance
            && (self.y - other.y).abs() < position_tolerance
            && (self.width - other.width).abs() < size_tolerance
            && (self.height - other.height).abs() < size_tolerance
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// Which threshold set / normalization branch an image goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionClass {
    /// Voter-box detection: grayscale + blur.
    RoiImage,
    /// Full OCR enhancement chain.
    Processed,
    /// Passport-photo detection inside a voter box: grayscale + blur.
    Passport,
    /// Grayscale only.
    Original,
}

/// One voter box cut out of a page.
pub struct Roi {
    pub image: Mat,
    pub bbox: BoundingBox,
}

/// Keep the rectangles inside the area / aspect-ratio window, dropping any
/// that repeat an already accepted box.
pub fn select_voter_boxes(
    candidates: impl IntoIterator<Item = BoundingBox>,
    config: &VoterBoxConfig,
) -> Vec<BoundingBox> {
    let mut accepted: Vec<BoundingBox> = Vec::new();

    for candidate in candidates {
        if !config.area.contains(candidate.area() as f64)
            || !config.aspect_ratio.contains(candidate.aspect_ratio())
        {
            continue;
        }

        let duplicate = accepted.iter().any(|existing| {
            existing.is_near(&candidate, config.position_tolerance, config.size_tolerance)
        });
        if !duplicate {
            accepted.push(candidate);
        }
    }

    accepted
}

/// Sort boxes top-to-bottom, then left-to-right within a row.
///
/// Boxes whose top edges lie within `row_tolerance` of the first box of a
/// row belong to that row.
pub fn reading_order(mut boxes: Vec<BoundingBox>, row_tolerance: i32) -> Vec<BoundingBox> {
    boxes.sort_by_key(|b| (b.y, b.x));

    let mut ordered = Vec::with_capacity(boxes.len());
    let mut row: Vec<BoundingBox> = Vec::new();
    for bbox in boxes {
        if let Some(first) = row.first() {
            if bbox.y - first.y > row_tolerance {
                row.sort_by_key(|b| (b.x, b.y));
                ordered.append(&mut row);
            }
        }
        row.push(bbox);
    }
    row.sort_by_key(|b| (b.x, b.y));
    ordered.append(&mut row);

    ordered
}

pub struct GeometryDetector<'a> {
    config: &'a GeometryConfig,
    normalizer: RegionNormalizer<'a>,
}

impl<'a> GeometryDetector<'a> {
    pub fn new(config: &'a GeometryConfig, normalize: &'a NormalizeConfig) -> Self {
        Self {
            config,
            normalizer: RegionNormalizer::new(config, normalize),
        }
    }

    /// Bounding rectangles of every contour found with the `class` thresholds.
    pub fn candidate_boxes(&self, image: &Mat, class: RegionClass) -> Result<Vec<BoundingBox>> {
        let (canny, contours_cfg) = match class {
            RegionClass::Passport => (
                &self.config.passport_box.canny,
                &self.config.passport_box.contours,
            ),
            _ => (&self.config.voter_box.canny, &self.config.voter_box.contours),
        };
        let blur_class = match class {
            RegionClass::Passport => RegionClass::Passport,
            _ => RegionClass::RoiImage,
        };

        let blurred = self.normalizer.normalize(image, blur_class)?;
        let contours = find_contours(&blurred, canny, contours_cfg)?;

        let mut boxes = Vec::with_capacity(contours.len());
        for contour in contours.iter() {
            boxes.push(BoundingBox::from(imgproc::bounding_rect(&contour)?));
        }
        Ok(boxes)
    }

    /// Locate all voter boxes on a page, in reading order.
    ///
    /// An empty vector means no contour qualified.
    pub fn detect_regions(&self, page: &Mat) -> Result<Vec<Roi>> {
        imaging::ensure_readable(page, "page image")?;

        let voter = &self.config.voter_box;
        let candidates = self.candidate_boxes(page, RegionClass::RoiImage)?;
        let candidate_count = candidates.len();
        let boxes = reading_order(select_voter_boxes(candidates, voter), voter.row_tolerance);
        debug!(
            "Accepted {} voter boxes out of {} contours",
            boxes.len(),
            candidate_count
        );

        boxes
            .into_iter()
            .map(|bbox| {
                let image = Mat::roi(page, bbox.to_rect())?.try_clone()?;
                Ok(Roi { image, bbox })
            })
            .collect()
    }

    /// Find the embedded photo of a voter box and return it encoded.
    ///
    /// The first contour inside the area-ratio and aspect-ratio windows wins.
    pub fn detect_passport(&self, roi: &Roi) -> Result<Option<Vec<u8>>> {
        imaging::ensure_readable(&roi.image, "voter box")?;

        let passport = &self.config.passport_box;
        let roi_area = roi.image.rows() as f64 * roi.image.cols() as f64;

        for bbox in self.candidate_boxes(&roi.image, RegionClass::Passport)? {
            let area_ratio = bbox.area() as f64 / roi_area;
            if passport.area_ratio.contains(area_ratio)
                && passport.aspect_ratio.contains(bbox.aspect_ratio())
            {
                let crop = Mat::roi(&roi.image, bbox.to_rect())?.try_clone()?;
                return Ok(Some(imaging::encode(&crop, &passport.extension)?));
            }
        }

        debug!("No passport-sized photo detected in box at {:?}", roi.bbox);
        Ok(None)
    }
}

fn find_contours(
    blurred: &Mat,
    canny: &CannyConfig,
    contours_cfg: &ContourConfig,
) -> Result<Vector<Vector<Point>>> {
    let mut edges = Mat::default();
    imgproc::canny(blurred, &mut edges, canny.threshold1, canny.threshold2, 3, false)?;

    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours(
        &edges,
        &mut contours,
        contours_cfg.mode.to_cv(),
        contours_cfg.method.to_cv(),
        Point::new(0, 0),
    )?;
    Ok(contours)
}

/// Copy of `page` with every box outlined and numbered in reading order.
pub fn annotate(page: &Mat, boxes: &[BoundingBox]) -> Result<Mat> {
    let mut output = page.try_clone()?;
    let thickness = (page.cols() / 500).max(2);
    let font_scale = (page.cols() as f64 / 1000.0).max(0.5);

    for (i, bbox) in boxes.iter().enumerate() {
        imgproc::rectangle(
            &mut output,
            bbox.to_rect(),
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            thickness,
            LINE_8,
            0,
        )?;
        imgproc::put_text(
            &mut output,
            &(i + 1).to_string(),
            Point::new(bbox.x + thickness * 2, bbox.y + thickness * 10),
            FONT_HERSHEY_SIMPLEX,
            font_scale,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            thickness,
            LINE_8,
            false,
        )?;
    }

    Ok(output)
}
