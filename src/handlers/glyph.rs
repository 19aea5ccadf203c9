use font8x8::UnicodeFonts;

/// Glyph cell width in pixels.
pub const GLYPH_WIDTH: usize = 16;
/// Glyph cell height in pixels.
pub const GLYPH_HEIGHT: usize = 32;
/// Packed 1-bit size of one glyph cell.
pub const GLYPH_BITMAP_LEN: usize = GLYPH_WIDTH * GLYPH_HEIGHT / 8;

/// Pixels at or below this intensity stay dark.
const INK_THRESHOLD: u8 = 128;

const FONT_SIDE: usize = 8;
const FONT_SCALE: usize = 2;
/// Vertical offset that centres the scaled 16-pixel font in the 32-pixel cell.
const FONT_TOP: usize = (GLYPH_HEIGHT - FONT_SIDE * FONT_SCALE) / 2;

/// Greyscale 16×32 cell a rasterizer draws one character into.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GlyphCanvas {
    pixels: Vec<u8>,
}

impl Default for GlyphCanvas {
    fn default() -> Self {
        Self {
            pixels: vec![0; GLYPH_WIDTH * GLYPH_HEIGHT],
        }
    }
}

impl GlyphCanvas {
    /// Sets one pixel; writes outside the cell are ignored.
    pub fn set(&mut self, x: usize, y: usize, intensity: u8) {
        if x < GLYPH_WIDTH && y < GLYPH_HEIGHT {
            self.pixels[y * GLYPH_WIDTH + x] = intensity;
        }
    }

    #[must_use]
    pub fn intensity(&self, x: usize, y: usize) -> u8 {
        self.pixels
            .get(y * GLYPH_WIDTH + x)
            .copied()
            .unwrap_or_default()
    }

    /// Thresholds the cell into the panel's 1-bit layout: two bytes per row,
    /// bit `x % 8` of byte `y * 2 + x / 8` lit when intensity exceeds 128.
    #[must_use]
    pub fn to_bitmap(&self) -> GlyphBitmap {
        let mut bytes = [0u8; GLYPH_BITMAP_LEN];
        for y in 0..GLYPH_HEIGHT {
            for x in 0..GLYPH_WIDTH {
                if self.intensity(x, y) > INK_THRESHOLD {
                    bytes[y * 2 + x / 8] |= 1 << (x % 8);
                }
            }
        }
        GlyphBitmap(bytes)
    }
}

/// One packed glyph as sent to the panel.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GlyphBitmap([u8; GLYPH_BITMAP_LEN]);

impl GlyphBitmap {
    #[must_use]
    pub fn bytes(&self) -> &[u8; GLYPH_BITMAP_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }
}

/// Draws characters for the text command.
pub trait GlyphRasterizer: Send + Sync {
    fn rasterize(&self, glyph: char) -> GlyphCanvas;
}

/// Built-in rasterizer over the public-domain 8×8 `font8x8` tables, scaled
/// to 16×16 and centred vertically. Unknown characters render as `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Font8x8Rasterizer;

impl Font8x8Rasterizer {
    fn rows_for(glyph: char) -> [u8; FONT_SIDE] {
        font8x8::BASIC_FONTS
            .get(glyph)
            .or_else(|| font8x8::LATIN_FONTS.get(glyph))
            .or_else(|| font8x8::GREEK_FONTS.get(glyph))
            .or_else(|| font8x8::BOX_FONTS.get(glyph))
            .or_else(|| font8x8::BLOCK_FONTS.get(glyph))
            .or_else(|| font8x8::BASIC_FONTS.get('?'))
            .unwrap_or([0; FONT_SIDE])
    }
}

impl GlyphRasterizer for Font8x8Rasterizer {
    fn rasterize(&self, glyph: char) -> GlyphCanvas {
        let mut canvas = GlyphCanvas::default();
        for (row_index, row) in Self::rows_for(glyph).into_iter().enumerate() {
            for column in 0..FONT_SIDE {
                if (row >> column) & 0x01 == 0 {
                    continue;
                }
                for dy in 0..FONT_SCALE {
                    for dx in 0..FONT_SCALE {
                        canvas.set(
                            column * FONT_SCALE + dx,
                            FONT_TOP + row_index * FONT_SCALE + dy,
                            u8::MAX,
                        );
                    }
                }
            }
        }
        canvas
    }
}
