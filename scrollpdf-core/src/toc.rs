use once_cell::sync::Lazy;
use regex::Regex;

use crate::signal::TitleSender;

/// Trailing sectioning marker left in outline titles by LaTeX-produced PDFs,
/// e.g. `chapter.3`, `subsection*.12` or `appendix.A`.
static HEADING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:appendix|section|subsection|subsubsection|chapter)\*?\d*(?:\.\d*[A-Za-z]*)*$")
        .expect("valid heading marker pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    pub page: usize,
}

pub fn strip_heading_marker(label: &str) -> &str {
    match HEADING_MARKER.find(label) {
        Some(marker) => &label[..marker.start()],
        None => label,
    }
}

/// Parses outline text made of `label@page` lines. Lines without `@`, or
/// whose page is not a number, are dropped.
pub fn parse_toc(text: &str) -> Vec<TocEntry> {
    text.lines()
        .filter_map(|line| {
            let (label, page) = line.split_once('@')?;
            let page = page.trim().parse().ok()?;
            Some(TocEntry {
                label: strip_heading_marker(label).to_string(),
                page,
            })
        })
        .collect()
}

/// Everything the table-of-contents peer needs to run on its own.
pub struct TocRequest {
    pub title: String,
    pub entries: Vec<TocEntry>,
    pub signal: TitleSender,
}

/// Starts the table-of-contents peer. Implementations must not block: the
/// peer runs concurrently and only talks back through `TocRequest::signal`.
pub trait TocLauncher {
    fn launch(&self, request: TocRequest);
}
