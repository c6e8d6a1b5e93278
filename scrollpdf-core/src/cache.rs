use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{Document, PageBuffer, RenderRequest};
use crate::geometry::Geometry;

/// Memoized page rasters for one open document.
///
/// Entries are never evicted; only successful renders are stored, so a page
/// that failed once is rendered again on the next lookup.
pub struct PageCache {
    pages: HashMap<usize, Arc<PageBuffer>>,
    width: usize,
    height: usize,
    x_offset: i32,
}

impl PageCache {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            pages: HashMap::new(),
            width: geometry.width,
            height: geometry.page_height,
            x_offset: -geometry.x_offset,
        }
    }

    pub fn get(&mut self, document: &dyn Document, page_index: usize) -> Option<Arc<PageBuffer>> {
        if let Some(buffer) = self.pages.get(&page_index) {
            return Some(Arc::clone(buffer));
        }

        let request = RenderRequest {
            page_index,
            width: self.width,
            height: self.height,
            x_offset: self.x_offset,
        };
        let rendered = match document.render_page(request) {
            Ok(rendered) => rendered,
            Err(err) => {
                debug!(page = page_index, %err, "page render failed");
                return None;
            }
        };
        if rendered.rendered_height == 0 {
            debug!(page = page_index, "page rendered with zero height");
            return None;
        }
        let buffer = rendered.buffer;
        if !buffer.is_complete() || buffer.width != self.width || buffer.height != self.height {
            warn!(
                page = page_index,
                width = buffer.width,
                height = buffer.height,
                "backend returned a buffer with unexpected geometry"
            );
            return None;
        }

        debug!(page = page_index, "cached page render");
        let buffer = Arc::new(buffer);
        self.pages.insert(page_index, Arc::clone(&buffer));
        Some(buffer)
    }

    pub fn contains(&self, page_index: usize) -> bool {
        self.pages.contains_key(&page_index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
