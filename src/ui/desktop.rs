use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event_loop::ActiveEventLoop,
    window::{Window, WindowAttributes},
};

use super::centered_position;
use crate::flow::Settings;

/// A fixed-size window of `width*scale x height*scale`, centred on the primary monitor.
pub(crate) fn window_attributes(
    event_loop: &ActiveEventLoop,
    settings: &Settings,
) -> anyhow::Result<WindowAttributes> {
    let (width, height) = settings.window_size();
    let mut attributes = Window::default_attributes()
        .with_title(settings.title.clone())
        .with_inner_size(LogicalSize::new(width, height))
        .with_resizable(false);

    match event_loop.primary_monitor() {
        Some(monitor) => {
            let physical = LogicalSize::new(width, height).to_physical::<u32>(monitor.scale_factor());
            let size = monitor.size();
            let (x, y) = centered_position((size.width, size.height), (physical.width, physical.height));
            attributes = attributes.with_position(PhysicalPosition::new(x, y));
        }
        None => log::debug!("No primary monitor reported, leaving window placement to the OS"),
    }

    Ok(attributes)
}

/// Desktop games pause while their window is unfocused.
pub(crate) fn is_paused(focused: bool) -> bool {
    !focused
}
