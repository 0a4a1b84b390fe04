use anyhow::{Context as _, anyhow};
use wasm_bindgen::{JsCast, prelude::Closure};
use web_sys::{Event, HtmlCanvasElement, HtmlElement};
use winit::{
    dpi::LogicalSize,
    event_loop::ActiveEventLoop,
    platform::web::WindowAttributesExtWebSys,
    window::{Window, WindowAttributes},
};

use crate::flow::Settings;

fn js_error(value: wasm_bindgen::JsValue) -> anyhow::Error {
    anyhow!("{:?}", value)
}

/// `window.devicePixelRatio`, with 0 read as 1.
pub(crate) fn device_pixel_ratio() -> f64 {
    let ratio = web_sys::window().map_or(1.0, |window| window.device_pixel_ratio());
    if ratio == 0.0 { 1.0 } else { ratio }
}

fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> anyhow::Result<()> {
    let style = element.style();
    for (name, value) in styles {
        style.set_property(name, value).map_err(js_error)?;
    }
    Ok(())
}

/// Create a focusable canvas centred in the page and hand it to winit.
pub(crate) fn window_attributes(
    _event_loop: &ActiveEventLoop,
    settings: &Settings,
) -> anyhow::Result<WindowAttributes> {
    let window = web_sys::window().context("no global window")?;
    let document = window.document().context("no document")?;
    let body = document.body().context("document has no body")?;
    document.set_title(&settings.title);

    let html: HtmlElement = document
        .document_element()
        .context("document has no root element")?
        .dyn_into()
        .map_err(|_| anyhow!("root element is not an HTML element"))?;
    set_styles(&html, &[("height", "100%"), ("margin", "0"), ("padding", "0")])?;
    set_styles(
        &body,
        &[
            ("background-color", "#000"),
            ("position", "relative"),
            ("height", "100%"),
            ("margin", "0"),
            ("padding", "0"),
        ],
    )?;

    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| anyhow!("created element is not a canvas"))?;
    body.append_child(&canvas).map_err(js_error)?;

    let (css_width, css_height) = settings.window_size();
    let ratio = device_pixel_ratio();
    canvas.set_width((f64::from(css_width) * ratio) as u32);
    canvas.set_height((f64::from(css_height) * ratio) as u32);
    canvas.set_attribute("tabindex", "1").map_err(js_error)?;
    let width = format!("{}px", css_width);
    let height = format!("{}px", css_height);
    // CSS calc requires the spaces around the operator.
    let left = format!("calc(50% - {}px)", css_width / 2);
    let top = format!("calc(50% - {}px)", css_height / 2);
    set_styles(
        &canvas,
        &[
            ("position", "absolute"),
            ("outline", "none"),
            ("width", width.as_str()),
            ("height", height.as_str()),
            ("left", left.as_str()),
            ("top", top.as_str()),
        ],
    )?;

    let focus_target = canvas.clone();
    let on_click = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
        if let Err(e) = focus_target.focus() {
            log::warn!("Could not focus the canvas: {:?}", e);
        }
    });
    body.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
        .map_err(js_error)?;
    on_click.forget();

    let on_context_menu = Closure::<dyn FnMut(Event)>::new(|e: Event| e.prevent_default());
    canvas
        .add_event_listener_with_callback("contextmenu", on_context_menu.as_ref().unchecked_ref())
        .map_err(js_error)?;
    on_context_menu.forget();

    Ok(Window::default_attributes()
        .with_title(settings.title.clone())
        .with_inner_size(LogicalSize::new(css_width, css_height))
        .with_canvas(Some(canvas))
        .with_focusable(true)
        .with_prevent_default(true))
}

/// Browser games pause while the document is hidden (background tab).
pub(crate) fn is_paused(_focused: bool) -> bool {
    web_sys::window()
        .and_then(|window| window.document())
        .is_some_and(|document| document.hidden())
}
