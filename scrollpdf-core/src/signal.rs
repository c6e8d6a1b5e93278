//! The title-string channel between the table-of-contents peer (or any other
//! producer) and the viewer's refresh callback.
//!
//! A signal is a window title: `"<title>*"` asks for a full reload and
//! `"<title>@<page>*"` asks for a jump to `page`.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSignal {
    Reload,
    Jump(usize),
}

/// Returns `None` when the signal names a page that is not a number.
pub fn parse_refresh_signal(signal: &str) -> Option<RefreshSignal> {
    let body = signal.strip_suffix('*').unwrap_or(signal);
    match body.split_once('@') {
        None => Some(RefreshSignal::Reload),
        Some((_, page)) => page.trim().parse().ok().map(RefreshSignal::Jump),
    }
}

#[derive(Debug, Clone)]
pub struct TitleSender {
    title: String,
    tx: UnboundedSender<String>,
}

impl TitleSender {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns `false` once the receiving side is gone.
    pub fn jump(&self, page: usize) -> bool {
        self.send_raw(format!("{}@{}*", self.title, page))
    }

    pub fn reload(&self) -> bool {
        self.send_raw(format!("{}*", self.title))
    }

    pub fn send_raw(&self, signal: String) -> bool {
        self.tx.send(signal).is_ok()
    }
}

#[derive(Debug)]
pub struct TitleReceiver {
    rx: UnboundedReceiver<String>,
}

impl TitleReceiver {
    pub fn try_recv(&mut self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(signal) => Some(signal),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

pub fn title_channel(title: impl Into<String>) -> (TitleSender, TitleReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TitleSender {
            title: title.into(),
            tx,
        },
        TitleReceiver { rx },
    )
}
