use std::sync::Arc;

use tracing::trace;

use crate::backend::PageBuffer;

/// Most pages warmed by a single backward scroll.
const PREFETCH_CROSSINGS: i64 = 8;

/// Anything that can hand out rendered pages by index.
pub trait PageSource {
    fn page(&mut self, index: usize) -> Option<Arc<PageBuffer>>;
}

impl<S: PageSource> PageSource for Option<S> {
    fn page(&mut self, index: usize) -> Option<Arc<PageBuffer>> {
        self.as_mut().and_then(|source| source.page(index))
    }
}

/// Top edge of the viewport: `top` pixels into page `page`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollPosition {
    pub page: usize,
    pub top: usize,
}

/// Scroll position over a stack of equally tall pages.
///
/// `top` always stays in `[0, page_height)`; scrolling before the first page
/// pins the position to `(0, 0)`.
#[derive(Debug, Clone)]
pub struct ScrollState {
    position: ScrollPosition,
    page_height: usize,
}

impl ScrollState {
    pub fn new(page_height: usize) -> Self {
        Self {
            position: ScrollPosition::default(),
            page_height: page_height.max(1),
        }
    }

    pub fn position(&self) -> ScrollPosition {
        self.position
    }

    pub fn advance(&mut self, delta: i64, pages: &mut dyn PageSource) {
        let height = self.page_height as i64;
        let mut page = self.position.page as i64;
        let mut top = (self.position.top as i64).saturating_add(delta);

        if top >= height {
            page = page.saturating_add(top.div_euclid(height));
            top = top.rem_euclid(height);
        }
        if top < 0 {
            // Pages crossed to bring `top` back into range.
            let crossings = (-(top + 1)).div_euclid(height) + 1;
            if crossings > page {
                self.position = ScrollPosition::default();
                trace!("scroll clamped at document start");
                return;
            }
            // Only the last few crossed pages are warmed; the rest scroll
            // past without ever being shown.
            let warmed = crossings.min(PREFETCH_CROSSINGS);
            page -= crossings - warmed;
            top = top.rem_euclid(height) - warmed * height;
            while top < 0 {
                let _ = pages.page((page - 1) as usize);
                page -= 1;
                top += height;
            }
        }

        self.position = ScrollPosition {
            page: page as usize,
            top: top as usize,
        };
        trace!(page = self.position.page, top = self.position.top, "scrolled");
    }

    /// Moves to the top of `page` if it can be rendered; leaves the position
    /// untouched otherwise.
    pub fn jump_to(&mut self, page: usize, pages: &mut dyn PageSource) -> bool {
        if pages.page(page).is_none() {
            return false;
        }
        self.position = ScrollPosition { page, top: 0 };
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const PAGE_HEIGHT: usize = 1000;

    #[derive(Default)]
    struct RecordingPages {
        requested: Vec<usize>,
        missing: Vec<usize>,
        buffers: HashMap<usize, Arc<PageBuffer>>,
    }

    impl PageSource for RecordingPages {
        fn page(&mut self, index: usize) -> Option<Arc<PageBuffer>> {
            self.requested.push(index);
            if self.missing.contains(&index) {
                return None;
            }
            let buffer = self
                .buffers
                .entry(index)
                .or_insert_with(|| Arc::new(PageBuffer::filled(1, 1, index as u32)));
            Some(Arc::clone(buffer))
        }
    }

    fn at(page: usize, top: usize) -> ScrollPosition {
        ScrollPosition { page, top }
    }

    #[test]
    fn crossing_the_bottom_edge_moves_to_next_page() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);

        state.advance(900, &mut pages);
        assert_eq!(state.position(), at(0, 900));
        state.advance(200, &mut pages);
        assert_eq!(state.position(), at(1, 100));
        state.advance(-100, &mut pages);
        assert_eq!(state.position(), at(1, 0));
        assert!(pages.requested.is_empty());
    }

    #[test]
    fn landing_exactly_on_page_height_rolls_over() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(PAGE_HEIGHT as i64, &mut pages);
        assert_eq!(state.position(), at(1, 0));
    }

    #[test]
    fn scrolling_back_prefetches_the_previous_page() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(2100, &mut pages);
        assert_eq!(state.position(), at(2, 100));

        state.advance(-300, &mut pages);
        assert_eq!(state.position(), at(1, 800));
        assert_eq!(pages.requested, vec![1]);
    }

    #[test]
    fn large_deltas_cross_several_pages() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(5250, &mut pages);
        assert_eq!(state.position(), at(5, 250));
        state.advance(-3500, &mut pages);
        assert_eq!(state.position(), at(1, 750));
        assert_eq!(pages.requested, vec![4, 3, 2, 1]);
    }

    #[test]
    fn scrolling_before_the_start_clamps_to_origin() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(-1_000_000, &mut pages);
        assert_eq!(state.position(), at(0, 0));

        state.advance(1500, &mut pages);
        state.advance(-1_000_000, &mut pages);
        assert_eq!(state.position(), at(0, 0));
    }

    #[test]
    fn jump_requires_a_renderable_page() {
        let mut pages = RecordingPages {
            missing: vec![9],
            ..Default::default()
        };
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(1234, &mut pages);

        assert!(!state.jump_to(9, &mut pages));
        assert_eq!(state.position(), at(1, 234));

        assert!(state.jump_to(4, &mut pages));
        assert_eq!(state.position(), at(4, 0));
    }

    #[test]
    fn extreme_deltas_saturate() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(999, &mut pages);
        state.advance(i64::MAX, &mut pages);

        let position = state.position();
        assert_eq!(position.page, (i64::MAX / PAGE_HEIGHT as i64) as usize);
        assert_eq!(position.top, (i64::MAX % PAGE_HEIGHT as i64) as usize);
        assert!(pages.requested.is_empty());

        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(i64::MIN, &mut pages);
        assert_eq!(state.position(), at(0, 0));
    }

    #[test]
    fn long_backward_scroll_warms_only_the_last_pages() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(100_500, &mut pages);
        assert_eq!(state.position(), at(100, 500));

        state.advance(-80_000, &mut pages);
        assert_eq!(state.position(), at(20, 500));
        assert_eq!(pages.requested, (20..28).rev().collect::<Vec<_>>());
    }

    #[test]
    fn scrolling_past_the_start_warms_nothing() {
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);
        state.advance(3_200, &mut pages);
        state.advance(-3_201, &mut pages);
        assert_eq!(state.position(), at(0, 0));
        assert!(pages.requested.is_empty());

        state.advance(3_200, &mut pages);
        state.advance(-3_200, &mut pages);
        assert_eq!(state.position(), at(0, 0));
        assert_eq!(pages.requested, vec![2, 1, 0]);
    }

    #[test]
    fn random_walks_keep_position_normalized() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut pages = RecordingPages::default();
        let mut state = ScrollState::new(PAGE_HEIGHT);

        for _ in 0..5_000 {
            let delta = rng.gen_range(-2_500i64..2_500);
            state.advance(delta, &mut pages);
            let position = state.position();
            assert!(position.top < PAGE_HEIGHT, "top out of range: {:?}", position);
        }
    }

    #[test]
    fn split_deltas_match_a_single_delta_away_from_the_start() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let start = rng.gen_range(10_000i64..50_000);
            let first = rng.gen_range(-4_000i64..4_000);
            let second = rng.gen_range(-4_000i64..4_000);

            let mut pages = RecordingPages::default();
            let mut split = ScrollState::new(PAGE_HEIGHT);
            split.advance(start, &mut pages);
            let mut joined = split.clone();

            split.advance(first, &mut pages);
            split.advance(second, &mut pages);
            joined.advance(first + second, &mut pages);

            assert_eq!(split.position(), joined.position());
        }
    }
}
