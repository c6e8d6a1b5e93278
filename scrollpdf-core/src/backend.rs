use crate::error::LoadError;

const FILE_SCHEME: &str = "file://";

/// Row-major page raster, one packed RGBA word per pixel.
///
/// Words are laid out so that their native-endian bytes read `R, G, B, A`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl PageBuffer {
    pub fn new(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self::new(width, height, vec![color; width * height])
    }

    pub fn pack_rgba(rgba: [u8; 4]) -> u32 {
        u32::from_ne_bytes(rgba)
    }

    pub fn is_complete(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == self.width * self.height
    }

    pub fn row(&self, y: usize) -> &[u32] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|word| word.to_ne_bytes()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub page_index: usize,
    pub width: usize,
    pub height: usize,
    pub x_offset: i32,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub buffer: PageBuffer,
    pub rendered_height: usize,
}

/// Bounds of a text match, in page points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// An open document. Dropping the value closes the underlying handle.
pub trait Document: Send + Sync {
    /// Raw outline text, one `label@page` entry per line.
    fn toc_text(&self) -> &str;
    fn page_count(&self) -> usize;
    fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, LoadError>;
    fn extract_text(&self, page_index: usize) -> Result<String, LoadError>;
    fn find_text(&self, page_index: usize, query: &str) -> Result<Vec<TextRect>, LoadError>;
}

pub trait DocumentProvider: Send + Sync {
    /// Opens a document addressed by a `file://` URI.
    fn open(&self, uri: &str) -> Result<Box<dyn Document>, LoadError>;
}

pub fn normalize_document_uri(path: &str) -> String {
    if path.starts_with(FILE_SCHEME) {
        path.to_string()
    } else {
        format!("{FILE_SCHEME}{path}")
    }
}

pub fn uri_to_path(uri: &str) -> &str {
    uri.strip_prefix(FILE_SCHEME).unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_paths_gain_file_scheme() {
        assert_eq!(normalize_document_uri("/tmp/a.pdf"), "file:///tmp/a.pdf");
        assert_eq!(normalize_document_uri("file:///tmp/a.pdf"), "file:///tmp/a.pdf");
        assert_eq!(uri_to_path("file:///tmp/a.pdf"), "/tmp/a.pdf");
        assert_eq!(uri_to_path("relative.pdf"), "relative.pdf");
    }

    #[test]
    fn packed_words_keep_rgba_byte_order() {
        let buffer = PageBuffer::filled(2, 1, PageBuffer::pack_rgba([1, 2, 3, 4]));
        assert!(buffer.is_complete());
        assert_eq!(buffer.to_rgba_bytes(), vec![1, 2, 3, 4, 1, 2, 3, 4]);
    }
}
