use std::env;
use std::fmt::Write as _;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use scrollpdf_core::{
    uri_to_path, Document, DocumentProvider, LoadError, RenderRequest, RenderedPage, TextRect,
};
use tracing::{info, instrument, warn};

use crate::raster::place_page;

const LIBRARY_PATH_ENV: &str = "SCROLLPDF_PDFIUM_LIBRARY_PATH";

pub struct PdfiumRenderFactory {
    pdfium: Arc<Pdfium>,
}

impl PdfiumRenderFactory {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_env() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

impl DocumentProvider for PdfiumRenderFactory {
    #[instrument(skip(self))]
    fn open(&self, uri: &str) -> Result<Box<dyn Document>, LoadError> {
        let open = || -> Result<PdfiumDocument> {
            let path = Path::new(uri_to_path(uri));
            let absolute = path
                .canonicalize()
                .with_context(|| format!("failed to resolve path for {:?}", path))?;
            PdfiumDocument::open(Arc::clone(&self.pdfium), absolute)
        };
        match open() {
            Ok(document) => Ok(Box::new(document)),
            Err(err) => Err(LoadError::Open {
                uri: uri.to_string(),
                reason: format!("{err:#}"),
            }),
        }
    }
}

struct PdfiumDocument {
    // Declared before `_bindings` so it is dropped first.
    document: Mutex<PdfDocument<'static>>,
    path: PathBuf,
    toc: String,
    page_count: usize,
    _bindings: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn open(pdfium: Arc<Pdfium>, path: PathBuf) -> Result<Self> {
        let document = pdfium
            .load_pdf_from_file(&path, None)
            .with_context(|| format!("failed to open {:?}", path))?;
        // SAFETY: the document borrows the bindings behind `pdfium`. The struct
        // keeps that `Arc` in `_bindings` and declares `document` first, so the
        // document is dropped while the bindings are still alive.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };

        let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
        let toc = build_toc_text(&document);
        info!(path = %path.display(), page_count, "loaded pdf");

        Ok(Self {
            document: Mutex::new(document),
            path,
            toc,
            page_count,
            _bindings: pdfium,
        })
    }

    fn render_internal(&self, request: &RenderRequest) -> Result<RenderedPage> {
        let document = self.document.lock();
        let page = page_at(&document, request.page_index)?;

        let page_width = page.width().value;
        if page_width < 1.0 {
            return Err(anyhow!("page {} has no width", request.page_index));
        }
        // Scale so that the page, widened by `x_offset` on both sides, spans
        // the requested width.
        let zoom = request.width as f32 / (page_width + 2.0 * request.x_offset as f32);
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(anyhow!(
                "offset {} leaves nothing of page {} to render",
                request.x_offset,
                request.page_index
            ));
        }

        let config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {}", request.page_index))?;
        let image = bitmap.as_image().to_rgba8();

        let shift = (request.x_offset as f32 * zoom).round() as i64;
        let buffer = place_page(&image, request.width, request.height, shift);
        Ok(RenderedPage {
            rendered_height: buffer.height,
            buffer,
        })
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        let document = self.document.lock();
        let page = page_at(&document, page_index)?;
        let text = page
            .text()
            .with_context(|| format!("failed to extract text for page {}", page_index))?;
        Ok(text.all())
    }

    fn search_page(&self, page_index: usize, query: &str) -> Result<Vec<TextRect>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document = self.document.lock();
        let page = page_at(&document, page_index)?;
        let text = page
            .text()
            .with_context(|| format!("failed to extract text for page {}", page_index))?;
        let search = text
            .search(query, &PdfSearchOptions::new())
            .with_context(|| format!("failed to perform search on page {}", page_index))?;

        let mut rects = Vec::new();
        while let Some(segments) = search.find_next() {
            for segment in segments.iter() {
                let bounds = segment.bounds();
                rects.push(TextRect {
                    left: bounds.left().value,
                    top: bounds.top().value,
                    right: bounds.right().value,
                    bottom: bounds.bottom().value,
                });
            }
        }
        Ok(rects)
    }
}

impl Document for PdfiumDocument {
    fn toc_text(&self) -> &str {
        &self.toc
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, LoadError> {
        self.render_internal(&request)
            .map_err(|err| LoadError::Render {
                page: request.page_index,
                reason: format!("{err:#}"),
            })
            .and_then(|rendered| {
                if rendered.rendered_height == 0 {
                    Err(LoadError::EmptyPage {
                        page: request.page_index,
                    })
                } else {
                    Ok(rendered)
                }
            })
    }

    fn extract_text(&self, page_index: usize) -> Result<String, LoadError> {
        self.page_text(page_index).map_err(|err| LoadError::Render {
            page: page_index,
            reason: format!("{err:#}"),
        })
    }

    fn find_text(&self, page_index: usize, query: &str) -> Result<Vec<TextRect>, LoadError> {
        self.search_page(page_index, query)
            .map_err(|err| LoadError::Render {
                page: page_index,
                reason: format!("{err:#}"),
            })
    }
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        info!(path = %self.path.display(), "closed pdf");
    }
}

fn page_at<'a>(document: &'a PdfDocument<'static>, page_index: usize) -> Result<PdfPage<'a>> {
    let index: PdfPageIndex = page_index
        .try_into()
        .map_err(|_| anyhow!("page {} is out of supported range", page_index))?;
    document
        .pages()
        .get(index)
        .with_context(|| format!("page {} out of range", page_index))
}

/// Flattens the outline into `"{indent}- {title}@{page}"` lines, two spaces of
/// indent per nesting level.
fn build_toc_text(document: &PdfDocument<'_>) -> String {
    let mut toc = String::new();
    if let Some(root) = document.bookmarks().root() {
        collect_outline(root, 0, &mut toc);
    }
    toc
}

fn collect_outline(mut bookmark: PdfBookmark<'_>, depth: usize, out: &mut String) {
    loop {
        if let Some(destination) = bookmark.destination() {
            if let Ok(page_index) = destination.page_index() {
                let title = bookmark.title().unwrap_or_else(|| "(Untitled)".to_string());
                let _ = writeln!(out, "{}- {}@{}", "  ".repeat(depth), title, page_index);
            }
        }

        if let Some(child) = bookmark.first_child() {
            collect_outline(child, depth + 1, out);
        }

        match bookmark.next_sibling() {
            Some(next) => bookmark = next,
            None => break,
        }
    }
}

pub type PdfRenderFactory = PdfiumRenderFactory;

fn bind_pdfium_from_env() -> Option<Pdfium> {
    let path = env::var_os(LIBRARY_PATH_ENV)?;
    if path.is_empty() {
        return None;
    }
    match Pdfium::bind_to_library(&path) {
        Ok(bindings) => Some(Pdfium::new(bindings)),
        Err(err) => {
            warn!(
                "failed to load Pdfium from {}={}: {}",
                LIBRARY_PATH_ENV,
                path.to_string_lossy(),
                err
            );
            None
        }
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {} or install it ({})",
                LIBRARY_PATH_ENV,
                errors.join(", ")
            ))
        }
    }
}
