//! Platform windowing.
//!
//! Desktop builds open a fixed-size native window centred on the primary
//! monitor. Browser builds create a canvas centred in the page. Both expose
//! the same three functions to [`crate::flow`]: `window_attributes`,
//! `is_paused` and the actual scale.

#[cfg(not(target_arch = "wasm32"))]
mod desktop;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use desktop::*;
#[cfg(target_arch = "wasm32")]
pub(crate) use web::*;

/// How long a paused game waits before checking focus/visibility again.
pub(crate) const PAUSE_POLL_INTERVAL: instant::Duration = instant::Duration::from_micros(16_667);

/// Top-left corner that centres a window horizontally and puts it a third of
/// the way down the monitor.
pub(crate) fn centered_position(monitor: (u32, u32), window: (u32, u32)) -> (i32, i32) {
    let x = (i64::from(monitor.0) - i64::from(window.0)) / 2;
    let y = (i64::from(monitor.1) - i64::from(window.1)) / 3;
    (x as i32, y as i32)
}

/// Ratio of physical target pixels to logical screen pixels.
///
/// Larger than the requested scale on high-DPI displays.
pub(crate) fn actual_scale(physical_width: u32, screen_width: u32) -> f64 {
    if screen_width == 0 || physical_width == 0 {
        return 1.0;
    }
    f64::from(physical_width) / f64::from(screen_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_sit_centred_and_a_third_down() {
        assert_eq!(centered_position((1920, 1080), (512, 480)), (704, 200));
    }

    #[test]
    fn oversized_windows_go_negative() {
        assert_eq!(centered_position((800, 600), (1000, 900)), (-100, -100));
    }

    #[test]
    fn retina_doubles_the_scale() {
        assert_eq!(actual_scale(1024, 256), 4.0);
        assert_eq!(actual_scale(512, 256), 2.0);
        assert_eq!(actual_scale(0, 256), 1.0);
    }
}
