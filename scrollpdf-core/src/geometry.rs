use tracing::warn;

pub const DEFAULT_PAGE_WIDTH: i64 = 1750;
pub const DEFAULT_WINDOW_HEIGHT: i64 = 1600;
pub const DEFAULT_ASPECT_PERCENT: i64 = 72;
pub const DEFAULT_X_OFFSET: i64 = 46;

const MIN_DIMENSION: i64 = 100;
const FALLBACK_ASPECT_PERCENT: i64 = 80;
const SCREEN_HEIGHT_MARGIN: i64 = 40;

/// Fixed layout of one viewer instance.
///
/// `x_offset` is the horizontal margin, in page points, trimmed from each side
/// of a page before it is scaled to `width`. The backend receives it negated,
/// as a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: usize,
    pub view_height: usize,
    pub page_height: usize,
    pub gap_height: usize,
    pub x_offset: i32,
}

/// Pixel size of the screen hosting the viewer, zero when unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Numeric launch arguments as given on the command line. `None` means the
/// argument was omitted; values out of range fall back to screen-derived sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchArgs {
    pub page_width: Option<i64>,
    pub window_height: Option<i64>,
    pub aspect_percent: Option<i64>,
    pub x_offset: Option<i64>,
}

impl Geometry {
    pub fn new(
        width: usize,
        view_height: usize,
        page_height: usize,
        gap_height: usize,
        x_offset: i32,
    ) -> Self {
        Self {
            width: width.max(1),
            view_height: view_height.max(1),
            page_height: page_height.max(1),
            gap_height,
            x_offset,
        }
    }

    pub fn from_launch(args: LaunchArgs, gap_height: usize, screen: ScreenSize) -> Self {
        let mut page_width = args.page_width.unwrap_or(DEFAULT_PAGE_WIDTH);
        let mut window_height = args.window_height.unwrap_or(DEFAULT_WINDOW_HEIGHT);
        let mut aspect = args.aspect_percent.unwrap_or(DEFAULT_ASPECT_PERCENT);
        let x_offset = args.x_offset.unwrap_or(DEFAULT_X_OFFSET);

        if page_width < MIN_DIMENSION {
            page_width = if screen.width > 0 {
                i64::from(screen.width) * 7 / 10
            } else {
                DEFAULT_PAGE_WIDTH
            };
        }
        if window_height < MIN_DIMENSION {
            window_height = if i64::from(screen.height) > MIN_DIMENSION + SCREEN_HEIGHT_MARGIN {
                i64::from(screen.height) - SCREEN_HEIGHT_MARGIN
            } else {
                DEFAULT_WINDOW_HEIGHT
            };
        }
        if aspect < 1 {
            aspect = FALLBACK_ASPECT_PERCENT;
        }
        let page_height = match page_width.checked_mul(100) {
            Some(scaled) => scaled / aspect,
            None => {
                warn!(page_width, "page width too large, using the default");
                page_width = DEFAULT_PAGE_WIDTH;
                DEFAULT_PAGE_WIDTH * 100 / aspect
            }
        };

        Self::new(
            page_width as usize,
            window_height as usize,
            page_height as usize,
            gap_height,
            x_offset.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_arguments_use_defaults() {
        let geometry = Geometry::from_launch(LaunchArgs::default(), 30, ScreenSize::default());
        assert_eq!(geometry.width, 1750);
        assert_eq!(geometry.view_height, 1600);
        assert_eq!(geometry.page_height, 1750 * 100 / 72);
        assert_eq!(geometry.gap_height, 30);
        assert_eq!(geometry.x_offset, 46);
    }

    #[test]
    fn out_of_range_arguments_fall_back_to_screen() {
        let args = LaunchArgs {
            page_width: Some(0),
            window_height: Some(12),
            aspect_percent: Some(0),
            x_offset: Some(0),
        };
        let screen = ScreenSize {
            width: 2000,
            height: 1200,
        };
        let geometry = Geometry::from_launch(args, 30, screen);
        assert_eq!(geometry.width, 1400);
        assert_eq!(geometry.view_height, 1160);
        assert_eq!(geometry.page_height, 1400 * 100 / 80);
        assert_eq!(geometry.x_offset, 0);
    }

    #[test]
    fn oversized_page_width_falls_back_to_default() {
        let args = LaunchArgs {
            page_width: Some(i64::MAX / 10),
            aspect_percent: Some(50),
            ..LaunchArgs::default()
        };
        let geometry = Geometry::from_launch(args, 30, ScreenSize::default());
        assert_eq!(geometry.width, 1750);
        assert_eq!(geometry.page_height, 3500);
    }
}
