use std::sync::Arc;

use tracing::{info, instrument};

use crate::backend::{Document, DocumentProvider, PageBuffer};
use crate::cache::PageCache;
use crate::error::LoadError;
use crate::geometry::Geometry;
use crate::scroll::PageSource;

/// One open document together with its page cache. Dropping the session
/// closes the document.
pub struct Session {
    uri: String,
    cache: PageCache,
    document: Box<dyn Document>,
}

impl Session {
    #[instrument(skip(provider, geometry))]
    pub fn open(
        provider: &dyn DocumentProvider,
        uri: &str,
        geometry: &Geometry,
    ) -> Result<Self, LoadError> {
        let document = provider.open(uri)?;
        info!(uri, pages = document.page_count(), "opened document");
        Ok(Self {
            uri: uri.to_string(),
            cache: PageCache::new(geometry),
            document,
        })
    }

    pub fn document(&self) -> &dyn Document {
        self.document.as_ref()
    }

    pub fn toc_text(&self) -> &str {
        self.document.toc_text()
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }
}

impl PageSource for Session {
    fn page(&mut self, index: usize) -> Option<Arc<PageBuffer>> {
        self.cache.get(self.document.as_ref(), index)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        info!(uri = %self.uri, cached = self.cache.len(), "closing document");
    }
}
