use tracing::trace;

use crate::backend::PageBuffer;
use crate::geometry::Geometry;
use crate::scroll::{PageSource, ScrollPosition};

/// Drawing target supplied by the windowing side.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Copies `rows` rows of `source`, starting at source row `source_y`, to
    /// surface row `dest_y`. Rows and columns outside the surface are dropped.
    fn blit(&mut self, source: &PageBuffer, source_y: usize, rows: usize, dest_y: usize);
}

/// In-memory surface, one packed RGBA word per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, background: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width * height],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|word| word.to_ne_bytes()).collect()
    }
}

impl Surface for FrameBuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn blit(&mut self, source: &PageBuffer, source_y: usize, rows: usize, dest_y: usize) {
        let columns = source.width.min(self.width);
        let rows = rows
            .min(source.height.saturating_sub(source_y))
            .min(self.height.saturating_sub(dest_y));
        for row in 0..rows {
            let src = &source.row(source_y + row)[..columns];
            let start = (dest_y + row) * self.width;
            self.pixels[start..start + columns].copy_from_slice(src);
        }
    }
}

/// Stitches consecutive pages, separated by a flat gap band, into a surface.
pub struct Compositor {
    geometry: Geometry,
    gap: PageBuffer,
}

impl Compositor {
    pub fn new(geometry: Geometry, gap_color: u32) -> Self {
        Self {
            geometry,
            gap: PageBuffer::filled(geometry.width, geometry.gap_height, gap_color),
        }
    }

    /// Paints the page at `position`, then gap bands and following pages
    /// until the surface is full. A page without data takes no rows: its gap
    /// band and the next page move up to where it would have started. A
    /// missing page after the first one ends compositing.
    pub fn paint(
        &self,
        surface: &mut dyn Surface,
        position: ScrollPosition,
        pages: &mut dyn PageSource,
    ) {
        let view_height = surface.height() as i64;
        let gap_height = self.geometry.gap_height as i64;

        let mut page = position.page;
        let mut shift = -(position.top as i64);
        loop {
            let consumed = self.paint_page(surface, page, shift, pages);
            trace!(page, shift, consumed, "composited page");
            if consumed == 0 && page != position.page {
                break;
            }

            let gap_top = shift + consumed;
            if gap_top + gap_height >= view_height {
                break;
            }
            if gap_height > 0 {
                blit_at(surface, &self.gap, gap_top);
            }
            shift = gap_top + gap_height;
            page += 1;
        }
    }

    /// Paints page `index` with its top edge at surface row `shift`, which is
    /// negative while the page is partially scrolled off the top. Returns the
    /// page height, or 0 when the page has no data and nothing was painted.
    fn paint_page(
        &self,
        surface: &mut dyn Surface,
        index: usize,
        shift: i64,
        pages: &mut dyn PageSource,
    ) -> i64 {
        if shift >= surface.height() as i64 {
            return 0;
        }
        let Some(data) = pages.page(index) else {
            return 0;
        };
        blit_at(surface, &data, shift);
        data.height as i64
    }
}

/// Blits all of `buffer` with its top row at surface row `top`, dropping rows
/// above the surface.
fn blit_at(surface: &mut dyn Surface, buffer: &PageBuffer, top: i64) {
    let view_height = surface.height() as i64;
    let height = buffer.height as i64;
    if top >= 0 {
        let rows = height.min(view_height - top);
        if rows > 0 {
            surface.blit(buffer, 0, rows as usize, top as usize);
        }
    } else if height + top > 0 {
        let rows = (height + top).min(view_height);
        surface.blit(buffer, (-top) as usize, rows as usize, 0);
    }
}
