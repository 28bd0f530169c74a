// Region normalization of voter-box crops for contour search and OCR

use log::debug;
use opencv::{
    core::{self, AlgorithmHint, Mat, Point, Size},
    imgproc,
    photo,
    prelude::*,
};

use crate::{
    config::{BlurConfig, GeometryConfig, NormalizeConfig},
    error::Result,
    geometry::RegionClass,
    imaging,
};

/// Gaussian blur with a configured kernel; `sigma` applies to both axes.
pub fn gaussian(gray: &Mat, blur: &BlurConfig) -> Result<Mat> {
    let mut blurred = Mat::default();
    imgproc::gaussian_blur(
        gray,
        &mut blurred,
        Size::new(blur.ksize[0], blur.ksize[1]),
        blur.sigma,
        0.0,
        core::BORDER_DEFAULT,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(blurred)
}

pub struct RegionNormalizer<'a> {
    geometry: &'a GeometryConfig,
    config: &'a NormalizeConfig,
}

impl<'a> RegionNormalizer<'a> {
    pub fn new(geometry: &'a GeometryConfig, config: &'a NormalizeConfig) -> Self {
        Self { geometry, config }
    }

    /// Produce the single-channel image for `class`.
    ///
    /// Deterministic: identical input and configuration give byte-identical output.
    pub fn normalize(&self, image: &Mat, class: RegionClass) -> Result<Mat> {
        imaging::ensure_readable(image, "region")?;
        let gray = imaging::to_gray(image)?;

        match class {
            RegionClass::Original => Ok(gray),
            RegionClass::RoiImage => gaussian(&gray, &self.geometry.voter_box.blur),
            RegionClass::Passport => gaussian(&gray, &self.geometry.passport_box.blur),
            RegionClass::Processed => {
                let blurred = gaussian(&gray, &self.geometry.voter_box.blur)?;
                self.enhance(&blurred)
            }
        }
    }

    fn enhance(&self, blurred: &Mat) -> Result<Mat> {
        let cfg = self.config;

        let mut denoised = Mat::default();
        photo::fast_nl_means_denoising(
            blurred,
            &mut denoised,
            cfg.denoise.h,
            cfg.denoise.template_window,
            cfg.denoise.search_window,
        )?;

        // Counteracts the stroke thinning introduced by blur + denoise
        let kernel = Mat::from_slice_2d(&cfg.sharpen_kernel)?;
        let mut sharpened = Mat::default();
        imgproc::filter_2d(
            &denoised,
            &mut sharpened,
            -1,
            &kernel,
            Point::new(-1, -1),
            0.0,
            core::BORDER_DEFAULT,
        )?;

        let mut thresh_type = imgproc::THRESH_BINARY;
        if cfg.threshold.otsu {
            thresh_type |= imgproc::THRESH_OTSU;
        }
        let mut binary = Mat::default();
        let chosen = imgproc::threshold(
            &sharpened,
            &mut binary,
            cfg.threshold.thresh,
            cfg.threshold.max_value,
            thresh_type,
        )?;
        debug!("Binarized region with threshold {chosen}");

        let morph_kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(cfg.morphology.kernel[0], cfg.morphology.kernel[1]),
            Point::new(-1, -1),
        )?;
        let mut morphed = Mat::default();
        imgproc::morphology_ex(
            &binary,
            &mut morphed,
            cfg.morphology.operation.to_cv(),
            &morph_kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;

        let erode_kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(cfg.erode.kernel[0], cfg.erode.kernel[1]),
            Point::new(-1, -1),
        )?;
        let mut eroded = Mat::default();
        imgproc::erode(
            &morphed,
            &mut eroded,
            &erode_kernel,
            Point::new(-1, -1),
            cfg.erode.iterations,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;

        Ok(eroded)
    }
}
