use image::RgbaImage;
use rayon::prelude::*;
use scrollpdf_core::PageBuffer;

/// Opaque pale green behind every page.
pub const PAGE_BACKGROUND: [u8; 4] = [228, 255, 235, 255];

/// Lays a rendered page into a `width` x `height` buffer, moved right by
/// `shift` pixels (a negative shift trims the left margin). Pixels the image
/// does not cover keep the page background.
pub fn place_page(image: &RgbaImage, width: usize, height: usize, shift: i64) -> PageBuffer {
    let background = PageBuffer::pack_rgba(PAGE_BACKGROUND);
    let mut buffer = PageBuffer::filled(width, height, background);
    if width == 0 {
        return buffer;
    }

    let source_width = i64::from(image.width());
    let rows = height.min(image.height() as usize);
    buffer
        .pixels
        .par_chunks_exact_mut(width)
        .take(rows)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, dest) in row.iter_mut().enumerate() {
                let source_x = x as i64 - shift;
                if (0..source_width).contains(&source_x) {
                    *dest = PageBuffer::pack_rgba(image.get_pixel(source_x as u32, y as u32).0);
                }
            }
        });
    buffer
}
