// Column split of a normalized voter box into its two language sides

use opencv::{
    core::{Mat, Rect},
    prelude::*,
};

use crate::error::{ExtractError, Result};

/// Left and right column crops of one voter box.
pub struct Sides {
    pub left: Mat,
    pub right: Mat,
}

/// Cut `image` at `width / sections`; the right side keeps everything after it.
///
/// With two sections an odd width leaves the extra column on the right.
pub fn split(image: &Mat, sections: i32) -> Result<Sides> {
    if sections < 1 {
        return Err(ExtractError::UnreadableImage(format!(
            "cannot split into {sections} sections"
        )));
    }

    let (width, height) = (image.cols(), image.rows());
    if image.empty() || width == 0 || height == 0 {
        return Err(ExtractError::UnreadableImage(
            "cannot split an empty image".into(),
        ));
    }

    let boundary = split_point(width, sections);
    if boundary == 0 {
        return Err(ExtractError::UnreadableImage(format!(
            "image of width {width} is too narrow for {sections} sections"
        )));
    }

    let left = Mat::roi(image, Rect::new(0, 0, boundary, height))?.try_clone()?;
    let right = Mat::roi(image, Rect::new(boundary, 0, width - boundary, height))?.try_clone()?;
    Ok(Sides { left, right })
}

/// Column index where the right side starts.
pub fn split_point(width: i32, sections: i32) -> i32 {
    width / sections
}
