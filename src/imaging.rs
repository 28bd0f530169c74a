// Conversions between `image` rasters and OpenCV matrices

use image::RgbImage;
use opencv::{
    core::{AlgorithmHint, Mat, Vector},
    imgcodecs,
    imgproc,
    prelude::*,
};

use crate::error::{ExtractError, Result};

/// Fail with `UnreadableImage` when `mat` holds no pixels.
pub fn ensure_readable(mat: &Mat, what: &str) -> Result<()> {
    if mat.empty() || mat.rows() == 0 || mat.cols() == 0 {
        return Err(ExtractError::UnreadableImage(format!("{what} is empty")));
    }
    Ok(())
}

/// Copy an RGB raster into a BGR `Mat`, the channel order OpenCV expects.
pub fn rgb_image_to_mat(img: &RgbImage) -> Result<Mat> {
    let height = img.height() as i32;
    if img.width() == 0 || height == 0 {
        return Err(ExtractError::UnreadableImage("page raster is empty".into()));
    }

    let mat = Mat::from_slice(img.as_raw())?;
    let mat = mat.reshape(3, height)?;
    let rgb = mat.try_clone()?;

    let mut bgr = Mat::default();
    imgproc::cvt_color(
        &rgb,
        &mut bgr,
        imgproc::COLOR_RGB2BGR,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(bgr)
}

/// Single-channel view of `mat`, accepting gray, BGR and BGRA input.
pub fn to_gray(mat: &Mat) -> Result<Mat> {
    ensure_readable(mat, "input image")?;

    let code = match mat.channels() {
        1 => return Ok(mat.try_clone()?),
        3 => imgproc::COLOR_BGR2GRAY,
        4 => imgproc::COLOR_BGRA2GRAY,
        n => {
            return Err(ExtractError::UnreadableImage(format!(
                "unsupported channel count {n}"
            )));
        }
    };

    let mut gray = Mat::default();
    imgproc::cvt_color(mat, &mut gray, code, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;
    Ok(gray)
}

/// Expand a gray or BGR `Mat` into an owned RGB raster.
pub fn mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
    ensure_readable(mat, "image")?;

    let code = match mat.channels() {
        1 => imgproc::COLOR_GRAY2RGB,
        3 => imgproc::COLOR_BGR2RGB,
        4 => imgproc::COLOR_BGRA2RGB,
        n => {
            return Err(ExtractError::UnreadableImage(format!(
                "unsupported channel count {n}"
            )));
        }
    };

    let mut rgb = Mat::default();
    imgproc::cvt_color(mat, &mut rgb, code, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let bytes = rgb.data_bytes()?.to_vec();
    RgbImage::from_raw(width, height, bytes)
        .ok_or_else(|| ExtractError::UnreadableImage("raster size mismatch".into()))
}

/// Encode `mat` with the codec matching `extension` (e.g. `png`).
pub fn encode(mat: &Mat, extension: &str) -> Result<Vec<u8>> {
    ensure_readable(mat, "image to encode")?;

    let ext = if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    };

    let mut buf = Vector::<u8>::new();
    if !imgcodecs::imencode(&ext, mat, &mut buf, &Vector::new())? {
        return Err(ExtractError::UnreadableImage(format!(
            "could not encode image as {ext}"
        )));
    }
    Ok(buf.to_vec())
}
