//! Pdfium-backed document provider.

#[cfg(feature = "pdf")]
mod pdfium;
mod raster;

#[cfg(feature = "pdf")]
pub use pdfium::{PdfRenderFactory, PdfiumRenderFactory};
pub use raster::{place_page, PAGE_BACKGROUND};
