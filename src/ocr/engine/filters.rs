use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles`×`tiles` grid; each tile gets its own clipped
/// histogram mapping and pixels are bilinearly blended between the four nearest
/// tile mappings so no seams appear at tile borders.
pub(super) fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);
    let raw = image.as_raw();

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = tile_span(ty, tiles_y, height);
        for tx in 0..tiles_x {
            let (x0, x1) = tile_span(tx, tiles_x, width);
            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                let row = (y * width) as usize;
                for x in x0..x1 {
                    hist[raw[row + x as usize] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts.push(tile_lut(&mut hist, area, clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    GrayImage::from_fn(width, height, |x, y| {
        let value = raw[(y * width + x) as usize] as usize;
        let (tx0, tx1, ax) = neighbours(x as f32 / tile_w - 0.5, tiles_x);
        let (ty0, ty1, ay) = neighbours(y as f32 / tile_h - 0.5, tiles_y);
        let lut = |tx: usize, ty: usize| luts[ty * tiles_x as usize + tx][value] as f32;
        let top = lut(tx0, ty0) * (1.0 - ax) + lut(tx1, ty0) * ax;
        let bottom = lut(tx0, ty1) * (1.0 - ax) + lut(tx1, ty1) * ax;
        let mixed = top * (1.0 - ay) + bottom * ay;
        Luma([mixed.round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_span(index: u32, count: u32, extent: u32) -> (u32, u32) {
    let start = (index as u64 * extent as u64 / count as u64) as u32;
    let end = ((index as u64 + 1) * extent as u64 / count as u64) as u32;
    (start, end.max(start + 1).min(extent))
}

fn neighbours(position: f32, count: u32) -> (usize, usize, f32) {
    let base = position.floor();
    let weight = position - base;
    let last = count as i64 - 1;
    let first = (base as i64).clamp(0, last) as usize;
    let second = (base as i64 + 1).clamp(0, last) as usize;
    (first, second, weight)
}

fn tile_lut(hist: &mut [u32; BINS], area: u32, clip_limit: f32) -> [u8; BINS] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let spread = excess / BINS as u32;
        let mut residual = excess % BINS as u32;
        for bin in hist.iter_mut() {
            *bin += spread;
        }
        if residual > 0 {
            let step = (BINS / residual as usize).max(1);
            let mut idx = 0;
            while idx < BINS && residual > 0 {
                hist[idx] += 1;
                residual -= 1;
                idx += step;
            }
        }
    }

    let scale = (BINS - 1) as f32 / area.max(1) as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (value, bin) in hist.iter().enumerate() {
        sum += bin;
        lut[value] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Edge-preserving smoothing over a circular window of `diameter` pixels.
///
/// Each neighbour is weighted by its spatial distance and by its intensity distance to
/// the centre pixel, so flat paper gets averaged while ink edges keep their contrast.
pub(super) fn bilateral_filter(
    image: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let radius = (diameter / 2).max(1) as i64;
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_weights: [f32; BINS] =
        std::array::from_fn(|delta| ((delta * delta) as f32 * color_coeff).exp());

    let mut window = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist_sq = (dx * dx + dy * dy) as f32;
            if dist_sq.sqrt() > radius as f32 {
                continue;
            }
            window.push((dx, dy, (dist_sq * space_coeff).exp()));
        }
    }

    let raw = image.as_raw();
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;
    GrayImage::from_fn(width, height, |x, y| {
        let center = raw[(y * width + x) as usize];
        let mut sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for &(dx, dy, space_weight) in &window {
            let nx = (x as i64 + dx).clamp(0, max_x) as usize;
            let ny = (y as i64 + dy).clamp(0, max_y) as usize;
            let value = raw[ny * width as usize + nx];
            let weight = space_weight * color_weights[value.abs_diff(center) as usize];
            sum += value as f32 * weight;
            weight_sum += weight;
        }
        if weight_sum > 0.0 {
            Luma([(sum / weight_sum).round().clamp(0.0, 255.0) as u8])
        } else {
            Luma([center])
        }
    })
}
