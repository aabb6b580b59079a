#![allow(dead_code)]

pub const GREEN: [u8; 3] = [0x6A, 0xBE, 0x30];
pub const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];
pub const BLACK: [u8; 3] = [0x00, 0x00, 0x00];
pub const BLUE: [u8; 3] = [0x5B, 0x6E, 0xE1];

/// 8x8 RGB stream with an embedded four color palette. Runs cross row ends.
pub const REFERENCE_8X8: [u8; 16 + 23 * 2 + 12] = [
    0x50, 0x49, 0x45, 0x02, // "PIE", version 2
    0x01, 0x00, 0x00, 0x00, // palette embedded
    0x08, 0x00, 0x08, 0x00, // 8x8
    0x17, 0x00, 0x00, 0x00, // 23 pairs
    // [run, index]
    1, 1, 6, 0, 6, 1, 2, 2, 1, 1, 4, 2, 1, 1, 2, 2, 1, 1, 4, 2, 1, 1, 2, 2, //
    6, 1, 2, 2, 1, 1, 6, 2, 2, 1, 6, 2, 1, 1, 1, 2, 1, 1, 6, 3, 1, 1, //
    0x6A, 0xBE, 0x30, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x5B, 0x6E, 0xE1,
];

pub const REFERENCE_8X8_PALETTE: [u8; 12] = [
    0x6A, 0xBE, 0x30, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x5B, 0x6E, 0xE1,
];

pub fn reference_8x8_pixels() -> Vec<u8> {
    let (g, w, k, b) = (GREEN, WHITE, BLACK, BLUE);
    [
        [w, g, g, g, g, g, g, w],
        [w, w, w, w, w, k, k, w],
        [k, k, k, k, w, k, k, w],
        [k, k, k, k, w, k, k, w],
        [w, w, w, w, w, k, k, w],
        [k, k, k, k, k, k, w, w],
        [k, k, k, k, k, k, w, k],
        [w, b, b, b, b, b, b, w],
    ]
    .iter()
    .flatten()
    .flatten()
    .copied()
    .collect()
}

/// 5x4 RGB image: four horizontal runs, the last row ends in a lone white pixel.
pub const SMALL_5X4: [u8; 60] = [
    0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, //
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, //
    0xFF, 0x00, 0xCC, 0xFF, 0x00, 0xCC, 0xFF, 0x00, 0xCC, 0xFF, 0x00, 0xCC, 0xFF, 0x00, 0xCC, //
    0xBE, 0xEF, 0x00, 0xBE, 0xEF, 0x00, 0xBE, 0xEF, 0x00, 0xBE, 0xEF, 0x00, 0xFF, 0xFF, 0xFF, //
];

/// The palette `SMALL_5X4` produces on its own, in first-occurrence order.
pub const SMALL_5X4_PALETTE: [u8; 12] = [
    0xFF, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xCC, 0xBE, 0xEF, 0x00,
];

/// The same colors in a different order, as an application palette.
pub const SMALL_5X4_EXTERNAL_PALETTE: [u8; 12] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xBE, 0xEF, 0x00, 0xFF, 0x00, 0xCC,
];

/// Horizontal bands of equal height, one per color.
pub fn bands(width: u16, height: u16, colors: &[&[u8]]) -> Vec<u8> {
    let band_height = (height as usize).div_ceil(colors.len());
    let mut pixels = Vec::new();
    for y in 0..height as usize {
        let color = colors[y / band_height];
        for _ in 0..width {
            pixels.extend_from_slice(color);
        }
    }
    pixels
}

/// `count` distinct colors, one pixel each.
pub fn distinct_colors(count: usize, stride: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(count * stride);
    for i in 0..count {
        let mut color = vec![(i >> 8) as u8, i as u8, 0x40];
        if stride == 4 {
            color.push(0xFF);
        }
        pixels.extend_from_slice(&color);
    }
    pixels
}

/// Deterministic pixel-art-like noise: short runs drawn from a small set of colors.
pub fn sprite(width: u16, height: u16, stride: usize, color_count: u8) -> Vec<u8> {
    let mut state = 0x2545_F491u32;
    let mut pixels = Vec::new();
    let total = width as usize * height as usize;

    while pixels.len() < total * stride {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;

        let shade = (state % color_count as u32) as u8;
        let run = 1 + (state >> 24) as usize % 7;
        let mut color = vec![shade.wrapping_mul(37), shade.wrapping_mul(11), 255 - shade];
        if stride == 4 {
            color.push(if shade % 3 == 0 { 0 } else { 255 });
        }

        for _ in 0..run {
            if pixels.len() == total * stride {
                break;
            }
            pixels.extend_from_slice(&color);
        }
    }
    pixels
}
