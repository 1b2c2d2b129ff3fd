use image::imageops::FilterType;
use image::{GrayImage, Luma, Pixel, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use super::filters::{bilateral_filter, clahe};
use super::geom::Buffer;
use crate::error::ReadError;

/// Generic minimum short side for upscaling.
pub const DEFAULT_MIN_SIDE: u32 = 900;
/// Minimum short side used when preparing a crop for recognition.
pub const RECOGNITION_MIN_SIDE: u32 = 1100;
/// Largest buffer the scale stage may produce.
pub const DEFAULT_MAX_PIXELS: u64 = 40_000_000;

/// Tunables of the manga preprocessing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessParams {
    pub min_side: u32,
    /// Upper bound on `width * height` after upscaling.
    pub max_pixels: u64,
    pub clahe_clip_limit: f32,
    pub clahe_tiles: u32,
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Odd window size of the adaptive threshold.
    pub threshold_block: u32,
    pub threshold_offset: f32,
    pub unsharp_sigma: f32,
    pub unsharp_amount: f32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            min_side: RECOGNITION_MIN_SIDE,
            max_pixels: DEFAULT_MAX_PIXELS,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            bilateral_diameter: 7,
            bilateral_sigma_color: 50.0,
            bilateral_sigma_space: 50.0,
            threshold_block: 35,
            threshold_offset: 8.0,
            unsharp_sigma: 1.0,
            unsharp_amount: 0.5,
        }
    }
}

/// Runs every stage after cropping: orientation, scale, equalize/denoise, binarize/sharpen.
pub(super) fn preprocess_for_ocr(
    image: RgbaImage,
    vertical: bool,
    params: &PreprocessParams,
) -> Result<GrayImage, ReadError> {
    let image = correct_orientation(image, vertical);
    let (width, height) = image.dimensions();
    let (target_width, target_height) = upscaled_dimensions(width, height, params.min_side);
    let pixels = target_width as u64 * target_height as u64;
    if pixels > params.max_pixels {
        return Err(ReadError::InvalidInput(format!(
            "crop of {}x{} would scale to {}x{}, over the {} pixel limit",
            width, height, target_width, target_height, params.max_pixels
        )));
    }
    let image = upscale_if_small(image, params.min_side);
    let gray = flatten_to_luma(&image);
    let cleaned = equalize_and_denoise(&gray, params);
    Ok(binarize_and_sharpen(&cleaned, params))
}

/// Rotates landscape crops 90° counter-clockwise when vertical text is expected.
///
/// Square crops are left alone.
pub fn correct_orientation<P>(image: Buffer<P>, vertical: bool) -> Buffer<P>
where
    P: Pixel + 'static,
{
    let (width, height) = image.dimensions();
    if vertical && width > height {
        debug!("rotating {}x{} crop for vertical text", width, height);
        return image::imageops::rotate270(&image);
    }
    image
}

/// Upscales so the short side reaches `min_side`, keeping the aspect ratio.
pub fn upscale_if_small<P>(image: Buffer<P>, min_side: u32) -> Buffer<P>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let (width, height) = image.dimensions();
    let (new_width, new_height) = upscaled_dimensions(width, height, min_side);
    if (new_width, new_height) == (width, height) {
        return image;
    }
    debug!(
        "upscaling {}x{} -> {}x{}",
        width, height, new_width, new_height
    );
    image::imageops::resize(&image, new_width, new_height, FilterType::CatmullRom)
}

/// Output size of [`upscale_if_small`]; saturates at `u32::MAX` per side.
pub fn upscaled_dimensions(width: u32, height: u32, min_side: u32) -> (u32, u32) {
    let short = width.min(height);
    if short == 0 || short >= min_side {
        return (width, height);
    }
    let scale = min_side as f64 / short as f64;
    let side = |value: u32| ((value as f64 * scale).round().min(u32::MAX as f64) as u32).max(1);
    (side(width), side(height))
}

/// Local contrast equalization followed by edge-preserving smoothing.
pub fn equalize_and_denoise(gray: &GrayImage, params: &PreprocessParams) -> GrayImage {
    let equalized = clahe(gray, params.clahe_clip_limit, params.clahe_tiles);
    bilateral_filter(
        &equalized,
        params.bilateral_diameter,
        params.bilateral_sigma_color,
        params.bilateral_sigma_space,
    )
}

/// Gaussian adaptive threshold followed by an unsharp mask.
pub fn binarize_and_sharpen(gray: &GrayImage, params: &PreprocessParams) -> GrayImage {
    let binary = adaptive_threshold(gray, params.threshold_block, params.threshold_offset);
    unsharp_mask(&binary, params.unsharp_sigma, params.unsharp_amount)
}

fn adaptive_threshold(gray: &GrayImage, block: u32, offset: f32) -> GrayImage {
    let mean = gaussian_blur_f32(gray, block_sigma(block));
    let mut output = gray.clone();
    for (pixel, local) in output.pixels_mut().zip(mean.pixels()) {
        let cutoff = local[0] as f32 - offset;
        pixel[0] = if pixel[0] as f32 > cutoff { 255 } else { 0 };
    }
    output
}

/// Gaussian sigma matching a `block`-wide kernel.
fn block_sigma(block: u32) -> f32 {
    let block = block.max(3) as f32;
    0.3 * ((block - 1.0) * 0.5 - 1.0) + 0.8
}

fn unsharp_mask(image: &GrayImage, sigma: f32, amount: f32) -> GrayImage {
    let blurred = gaussian_blur_f32(image, sigma);
    let mut output = image.clone();
    for (pixel, soft) in output.pixels_mut().zip(blurred.pixels()) {
        let value = (1.0 + amount) * pixel[0] as f32 - amount * soft[0] as f32;
        pixel[0] = value.round().clamp(0.0, 255.0) as u8;
    }
    output
}

fn flatten_to_luma(rgba: &RgbaImage) -> GrayImage {
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
        luma.put_pixel(x, y, Luma([value]));
    }
    luma
}
