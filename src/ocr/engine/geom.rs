use image::{ImageBuffer, Pixel};
use tracing::debug;

use crate::error::ReadError;
use crate::ocr::CropRegion;

pub(super) type Buffer<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// Cuts `region` out of `image`.
///
/// Empty regions return the image untouched. Regions that stick out of the image are
/// clipped to its extents; a region with no overlap at all is `OutOfBounds`.
pub fn crop_region<P>(image: Buffer<P>, region: &CropRegion) -> Result<Buffer<P>, ReadError>
where
    P: Pixel + 'static,
{
    if region.is_empty() {
        return Ok(image);
    }
    let (width, height) = image.dimensions();
    let Some((x, y, w, h)) = clip(region, width, height) else {
        return Err(ReadError::OutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            image_width: width,
            image_height: height,
        });
    };
    if (w as i64, h as i64) != (region.width as i64, region.height as i64) {
        debug!(
            "crop region clipped from ({}, {}, {}x{}) to ({}, {}, {}x{})",
            region.x, region.y, region.width, region.height, x, y, w, h
        );
    }
    Ok(image::imageops::crop_imm(&image, x, y, w, h).to_image())
}

fn clip(region: &CropRegion, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x1 = (region.x as i64).max(0);
    let y1 = (region.y as i64).max(0);
    let x2 = (region.x as i64 + region.width as i64).min(width as i64);
    let y2 = (region.y as i64 + region.height as i64).min(height as i64);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]))
    }

    #[test]
    fn empty_region_keeps_full_image() {
        let image = gradient(40, 30);
        for region in [
            CropRegion::full(),
            CropRegion::new(5, 5, 0, 10),
            CropRegion::new(5, 5, 10, 0),
            CropRegion::new(5, 5, -3, 10),
        ] {
            let cropped = crop_region(image.clone(), &region).expect("crop");
            assert_eq!(cropped, image);
        }
    }

    #[test]
    fn inner_region_is_cut_exactly() {
        let image = gradient(40, 30);
        let cropped = crop_region(image, &CropRegion::new(10, 5, 20, 8)).expect("crop");
        assert_eq!(cropped.dimensions(), (20, 8));
        assert_eq!(cropped.get_pixel(0, 0)[0], 15);
        assert_eq!(cropped.get_pixel(19, 7)[0], 41);
    }

    #[test]
    fn overhanging_region_is_clipped() {
        let image = gradient(40, 30);
        let cropped = crop_region(image, &CropRegion::new(30, -5, 50, 20)).expect("crop");
        assert_eq!(cropped.dimensions(), (10, 15));
        assert_eq!(cropped.get_pixel(0, 0)[0], 30);
    }

    #[test]
    fn disjoint_region_is_out_of_bounds() {
        let image = gradient(40, 30);
        let err = crop_region(image, &CropRegion::new(40, 0, 10, 10)).unwrap_err();
        assert!(matches!(
            err,
            ReadError::OutOfBounds {
                image_width: 40,
                image_height: 30,
                ..
            }
        ));
    }

    #[test]
    fn huge_coordinates_do_not_overflow() {
        let image = gradient(8, 8);
        let cropped =
            crop_region(image, &CropRegion::new(i32::MAX - 1, 0, i32::MAX, 4)).unwrap_err();
        assert!(matches!(cropped, ReadError::OutOfBounds { .. }));
    }
}
