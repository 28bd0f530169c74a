#![allow(dead_code)]

use anyhow::Result;
use opencv::{
    core::{CV_8UC3, Mat, Rect, Scalar},
    imgproc::{self, FILLED, LINE_8},
    prelude::*,
};
use voter_roll_extract::config::{BlurConfig, Bounds, ExtractConfig};

pub const BOX_W: i32 = 250;
pub const BOX_H: i32 = 100;

/// Thresholds scaled down to the synthetic page used in these tests.
pub fn test_config() -> ExtractConfig {
    let mut config = ExtractConfig::default();
    config.workers = 1;
    config.input.start_page = 0;
    config.input.pages_to_exclude = 0;

    let voter = &mut config.geometry.voter_box;
    voter.blur = BlurConfig {
        ksize: [5, 5],
        sigma: 0.0,
    };
    voter.area = Bounds::new(20_000.0, 30_000.0);
    voter.aspect_ratio = Bounds::new(2.2, 2.8);
    voter.position_tolerance = 50;
    voter.size_tolerance = 20;
    voter.row_tolerance = 20;

    config
}

pub fn blank_page(width: i32, height: i32) -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(
        height,
        width,
        CV_8UC3,
        Scalar::all(255.0),
    )?)
}

/// Draw a voter box outline with its top-left corner at (`x`, `y`).
pub fn draw_box(page: &mut Mat, x: i32, y: i32) -> Result<()> {
    imgproc::rectangle(
        page,
        Rect::new(x, y, BOX_W, BOX_H),
        Scalar::all(0.0),
        2,
        LINE_8,
        0,
    )?;
    Ok(())
}

/// Draw a filled square photo placeholder inside the box at (`x`, `y`).
pub fn draw_photo(page: &mut Mat, x: i32, y: i32) -> Result<()> {
    imgproc::rectangle(
        page,
        Rect::new(x + 190, y + 30, 40, 40),
        Scalar::all(60.0),
        FILLED,
        LINE_8,
        0,
    )?;
    Ok(())
}

/// Box origins of a 2 × 3 grid on a 1000 × 500 page.
pub const GRID: [(i32, i32); 6] = [
    (40, 60),
    (360, 60),
    (680, 60),
    (40, 260),
    (360, 260),
    (680, 260),
];

pub fn grid_page() -> Result<Mat> {
    let mut page = blank_page(1000, 500)?;
    for (x, y) in GRID {
        draw_box(&mut page, x, y)?;
    }
    Ok(page)
}
