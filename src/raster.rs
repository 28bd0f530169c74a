// PDF page rasterization

use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use image::RgbImage;
use log::debug;
use mupdf::{Colorspace, Document, Matrix};

use crate::error::{ExtractError, Result};

/// Anything that can hand out page rasters by index.
pub trait PageSource {
    fn page_count(&self) -> Result<usize>;

    fn render_page(&self, index: usize) -> Result<RgbImage>;
}

/// MuPDF-backed renderer for one PDF file.
///
/// A `Document` is not `Send`; each worker opens its own.
pub struct PdfRasterizer {
    path: PathBuf,
    doc: Document,
    scale: f32,
}

impl PdfRasterizer {
    pub fn open(path: &Path, dpi: u32) -> Result<Self> {
        let path_str = path.to_string_lossy();
        let doc = Document::open(&*path_str).map_err(|e| pdf_error(path, e))?;
        debug!("Opened {} for rendering at {dpi} dpi", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            scale: dpi as f32 / 72.0,
        })
    }
}

impl PageSource for PdfRasterizer {
    fn page_count(&self) -> Result<usize> {
        let count = self
            .doc
            .page_count()
            .map_err(|e| pdf_error(&self.path, e))?;
        Ok(count.max(0) as usize)
    }

    fn render_page(&self, index: usize) -> Result<RgbImage> {
        let page = self
            .doc
            .load_page(index as i32)
            .map_err(|e| pdf_error(&self.path, e))?;

        let matrix = Matrix::new_scale(self.scale, self.scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)
            .map_err(|e| pdf_error(&self.path, e))?;

        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let n = pixmap.n() as usize;
        let samples = pixmap.samples();

        let expected = width as usize * height as usize * n;
        if n < 3 || samples.len() < expected {
            return Err(ExtractError::Pdf {
                path: self.path.clone(),
                message: format!(
                    "page {index}: pixmap has {} bytes for {width}x{height}x{n}",
                    samples.len()
                ),
            });
        }

        let rgb = if n == 3 {
            samples[..expected].to_vec()
        } else {
            samples[..expected]
                .chunks_exact(n)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect()
        };

        RgbImage::from_raw(width, height, rgb).ok_or_else(|| ExtractError::Pdf {
            path: self.path.clone(),
            message: format!("page {index}: raster size mismatch"),
        })
    }
}

fn pdf_error(path: &Path, e: mupdf::Error) -> ExtractError {
    ExtractError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Pages carrying voter boxes: skip the cover pages at the front and the
/// summary pages at the back.
pub fn content_pages(page_count: usize, start_page: usize, pages_to_exclude: usize) -> Range<usize> {
    let end = page_count.saturating_sub(pages_to_exclude);
    start_page.min(end)..end
}
