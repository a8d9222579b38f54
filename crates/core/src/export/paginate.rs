/// Vertical slack below which a remainder is treated as rounding noise.
const EPSILON_MM: f64 = 1e-3;

/// One page's view onto a tall image, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageWindow {
    /// 1-based page number.
    pub page: usize,
    /// Top of the revealed band, measured from the top of the image.
    pub source_top: f64,
    /// Bottom of the revealed band (exclusive).
    pub source_bottom: f64,
    /// Where the band starts, measured from the top of the printable area.
    pub page_offset: f64,
}

impl PageWindow {
    pub fn height(&self) -> f64 {
        self.source_bottom - self.source_top
    }
}

/// Height of a `width_px x height_px` snapshot once scaled to `target_width`.
pub fn scaled_height(width_px: u32, height_px: u32, target_width: f64) -> f64 {
    if width_px == 0 {
        return 0.0;
    }
    f64::from(height_px) * target_width / f64::from(width_px)
}

/// Splits an image of `image_height` across pages of printable height
/// `page_height`. Page 1 starts `first_page_offset` below the top of the
/// printable area; later pages start at the top.
///
/// Windows are contiguous: each window's `source_top` equals the previous
/// window's `source_bottom`, the first starts at 0 and the last ends at
/// `image_height`.
pub fn paginate(image_height: f64, page_height: f64, first_page_offset: f64) -> Vec<PageWindow> {
    if image_height <= EPSILON_MM || page_height <= EPSILON_MM {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut consumed = 0.0_f64;
    let mut page = 1;
    let mut offset = first_page_offset.max(0.0);

    loop {
        let room = page_height - offset;
        if room > EPSILON_MM {
            let remaining = image_height - consumed;
            let (take, bottom) = if remaining <= room {
                (remaining, image_height)
            } else {
                (room, consumed + room)
            };
            windows.push(PageWindow {
                page,
                source_top: consumed,
                source_bottom: bottom,
                page_offset: offset,
            });
            consumed = bottom;
            if take == remaining || image_height - consumed <= EPSILON_MM {
                break;
            }
        }
        page += 1;
        offset = 0.0;
    }

    windows
}

/// Maps a window onto source pixel rows `[start, end)`. Boundaries are
/// rounded the same way for neighbouring windows, so bands tile the image.
pub fn pixel_rows(window: &PageWindow, px_per_mm: f64, height_px: u32) -> (u32, u32) {
    let to_px = |mm: f64| ((mm * px_per_mm).round().max(0.0) as u32).min(height_px);
    (to_px(window.source_top), to_px(window.source_bottom))
}
