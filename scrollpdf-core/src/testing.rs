use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{Document, DocumentProvider, PageBuffer, RenderRequest, RenderedPage, TextRect};
use crate::error::LoadError;

/// Value stored in every pixel of row `y` of page `page`; never zero.
pub fn pixel_for(page: usize, y: usize) -> u32 {
    (page * 10_000 + y + 1) as u32
}

#[derive(Default)]
pub struct FakeState {
    pub render_calls: Mutex<HashMap<usize, usize>>,
    pub failing: Mutex<HashSet<usize>>,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_open: AtomicBool,
}

impl FakeState {
    pub fn calls(&self, page: usize) -> usize {
        self.render_calls.lock().unwrap().get(&page).copied().unwrap_or(0)
    }

    pub fn fail_page(&self, page: usize) {
        self.failing.lock().unwrap().insert(page);
    }

    pub fn heal_page(&self, page: usize) {
        self.failing.lock().unwrap().remove(&page);
    }
}

pub struct FakeDocument {
    pub page_count: usize,
    pub toc: String,
    pub state: Arc<FakeState>,
}

impl Document for FakeDocument {
    fn toc_text(&self) -> &str {
        &self.toc
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, LoadError> {
        *self
            .state
            .render_calls
            .lock()
            .unwrap()
            .entry(request.page_index)
            .or_default() += 1;
        if request.page_index >= self.page_count
            || self.state.failing.lock().unwrap().contains(&request.page_index)
        {
            return Err(LoadError::Render {
                page: request.page_index,
                reason: "unavailable".to_string(),
            });
        }
        let mut pixels = Vec::with_capacity(request.width * request.height);
        for y in 0..request.height {
            pixels.extend(std::iter::repeat(pixel_for(request.page_index, y)).take(request.width));
        }
        Ok(RenderedPage {
            buffer: PageBuffer::new(request.width, request.height, pixels),
            rendered_height: request.height,
        })
    }

    fn extract_text(&self, page_index: usize) -> Result<String, LoadError> {
        Ok(format!("text of page {page_index}"))
    }

    fn find_text(&self, _page_index: usize, query: &str) -> Result<Vec<TextRect>, LoadError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TextRect {
            left: 1.0,
            top: 2.0,
            right: 3.0,
            bottom: 4.0,
        }])
    }
}

impl Drop for FakeDocument {
    fn drop(&mut self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeProvider {
    pub page_count: usize,
    pub toc: String,
    pub state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            toc: String::new(),
            state: Arc::new(FakeState::default()),
        }
    }

    pub fn with_toc(mut self, toc: &str) -> Self {
        self.toc = toc.to_string();
        self
    }
}

impl DocumentProvider for FakeProvider {
    fn open(&self, uri: &str) -> Result<Box<dyn Document>, LoadError> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(LoadError::Open {
                uri: uri.to_string(),
                reason: "refused".to_string(),
            });
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDocument {
            page_count: self.page_count,
            toc: self.toc.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}
