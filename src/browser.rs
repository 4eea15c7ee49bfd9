use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosure, WasmClosureFnOnce};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    CanvasRenderingContext2d,
    Document,
    HtmlCanvasElement,
    HtmlElement,
    HtmlImageElement,
    Response,
    Window,
};

// ==================== Logging ====================
// Console output for the whole crate
// - `log!`   -> console.log
// - `error!` -> console.error
// Outside of wasm32 there is no console, so messages are dropped and the
// game logic stays runnable under plain `cargo test`
macro_rules! log {
    ($($t:tt)*) => {
        $crate::browser::log_message(&format!($($t)*))
    };
}

macro_rules! error {
    ($($t:tt)*) => {
        $crate::browser::error_message(&format!($($t)*))
    };
}

pub fn log_message(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

pub fn error_message(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

// ==================== Constants ====================
// Constants related to HTML elements
mod html {
    pub const CONTEXT_2D: &str = "2d";
    pub const CANVAS_TAG: &str = "canvas";
    pub const DIV_TAG: &str = "div";
    pub const BUTTON_TAG: &str = "button";
    pub const HEADING_TAG: &str = "h2";
    pub const PARAGRAPH_TAG: &str = "p";
    pub const MOBILE_AGENTS: [&str; 7] = [
        "Android",
        "webOS",
        "iPhone",
        "iPad",
        "iPod",
        "BlackBerry",
        "IEMobile",
    ];
}

pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn canvas(canvas_id: &str) -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(canvas_id)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID : '{}'", canvas_id))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

/// Off-screen canvas, never attached to the document
pub fn new_canvas(width: u32, height: u32) -> Result<HtmlCanvasElement> {
    let canvas = document()?
        .create_element(html::CANVAS_TAG)
        .map_err(|err| anyhow!("Could not create canvas element : {:#?}", err))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))?;
    canvas.set_width(width);
    canvas.set_height(height);
    Ok(canvas)
}

pub fn context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    // get_context returns Result<Option<Object>, JsValue>
    // - JsValue error is mapped to anyhow
    // - None means the canvas refused a 2d context (already bound to webgl)
    canvas
        .get_context(html::CONTEXT_2D)
        .map_err(|js_value| anyhow!("Error getting context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

/// Same page, fresh start
pub fn reload() -> Result<()> {
    window()?
        .location()
        .reload()
        .map_err(|err| anyhow!("Could not reload the page : {:#?}", err))
}

pub fn new_image() -> Result<HtmlImageElement> {
    HtmlImageElement::new().map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

pub fn is_mobile_user_agent() -> bool {
    window()
        .and_then(|window| {
            window
                .navigator()
                .user_agent()
                .map_err(|err| anyhow!("Could not read user agent : {:#?}", err))
        })
        .map(|agent| html::MOBILE_AGENTS.iter().any(|name| agent.contains(name)))
        .unwrap_or(false)
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame : {:#?}", err))
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f) as Box<dyn FnMut(f64)>)
}

pub fn closure_once<F, A, R>(f: F) -> Closure<F::FnMut>
where
    F: 'static + WasmClosureFnOnce<A, R>,
{
    Closure::once(f)
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!(
            "request for {} failed with status {}",
            json_path,
            resp.status()
        ));
    }
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}

// ==================== Error overlay ====================
const OVERLAY_STYLE: &str = "position:absolute;top:50%;left:50%;\
    transform:translate(-50%,-50%);text-align:center;padding:24px;\
    background:rgba(255,255,255,0.92);border-radius:8px;z-index:1000;";
const TITLE_STYLE: &str = "font-size:20px;margin-bottom:8px;color:#ef4444;";
const MESSAGE_STYLE: &str = "font-size:16px;color:#4b5563;";
const RETRY_STYLE: &str = "margin-top:12px;padding:8px 20px;border:none;\
    border-radius:6px;background:#3b82f6;color:white;font-size:16px;cursor:pointer;";

fn styled_element(document: &Document, tag: &str, style: &str) -> Result<HtmlElement> {
    let element = document
        .create_element(tag)
        .map_err(|err| anyhow!("Could not create {} : {:#?}", tag, err))?
        .dyn_into::<HtmlElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlElement", element))?;
    element.style().set_css_text(style);
    Ok(element)
}

/// Centered message with a retry button, placed next to the game canvas
/// - the rest of the page stays interactive
/// - clicking retry removes the overlay before calling `on_retry`
pub fn show_error_overlay(
    canvas: &HtmlCanvasElement,
    title: &str,
    message: &str,
    on_retry: impl FnOnce() + 'static,
) -> Result<()> {
    let document = document()?;
    let overlay = styled_element(&document, html::DIV_TAG, OVERLAY_STYLE)?;
    // plain text, error messages may carry urls or markup
    for (tag, style, text) in [
        (html::HEADING_TAG, TITLE_STYLE, title),
        (html::PARAGRAPH_TAG, MESSAGE_STYLE, message),
    ] {
        let line = styled_element(&document, tag, style)?;
        line.set_inner_text(text);
        overlay
            .append_child(&line)
            .map_err(|err| anyhow!("Could not fill error overlay : {:#?}", err))?;
    }

    let button = styled_element(&document, html::BUTTON_TAG, RETRY_STYLE)?;
    button.set_inner_text("Try Again");

    let removable = overlay.clone();
    let on_click = closure_once(move || {
        removable.remove();
        on_retry();
    });
    button.set_onclick(Some(on_click.as_ref().unchecked_ref()));
    // the button owns the only path to this callback, keep it alive until clicked
    on_click.forget();

    overlay
        .append_child(&button)
        .map_err(|err| anyhow!("Could not attach retry button : {:#?}", err))?;
    canvas
        .parent_node()
        .ok_or_else(|| anyhow!("Canvas has no parent to hold the error overlay"))?
        .append_child(&overlay)
        .map_err(|err| anyhow!("Could not attach error overlay : {:#?}", err))?;
    Ok(())
}
