//! Bindings to the global `Quill` constructor loaded by the host page.

use crate::delta::Delta;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[derive(Debug, Clone)]
    pub(crate) type Quill;

    #[wasm_bindgen(constructor, catch)]
    fn new(container: &web_sys::Element, options: &JsValue) -> Result<Quill, JsValue>;

    #[wasm_bindgen(method, js_name = getContents)]
    fn get_contents(this: &Quill) -> JsValue;

    #[wasm_bindgen(method, getter)]
    fn root(this: &Quill) -> web_sys::Element;

    #[wasm_bindgen(method)]
    fn on(this: &Quill, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method)]
    fn off(this: &Quill, event: &str, handler: &js_sys::Function);
}

const TEXT_CHANGE: &str = "text-change";

type TextChangeCallback = Closure<dyn FnMut(JsValue, JsValue, JsValue)>;

/// A `text-change` handler attached to one editor. Dropping it detaches the
/// handler and frees the closure.
pub(crate) struct TextChangeListener {
    quill: Quill,
    callback: TextChangeCallback,
}

impl Drop for TextChangeListener {
    fn drop(&mut self) {
        self.quill
            .off(TEXT_CHANGE, self.callback.as_ref().unchecked_ref());
    }
}

fn to_json(value: &JsValue) -> Option<serde_json::Value> {
    let text = js_sys::JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

impl Quill {
    /// Mount a snow-themed editor on `container`, keeping whatever HTML it
    /// already holds as the initial contents.
    pub(crate) fn mount(container: &web_sys::Element, placeholder: &str) -> Result<Quill, JsValue> {
        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"theme".into(), &"snow".into())?;
        js_sys::Reflect::set(&options, &"placeholder".into(), &placeholder.into())?;
        Quill::new(container, &options)
    }

    /// Rendered markup of the `.ql-editor` element.
    pub(crate) fn html(&self) -> String {
        self.root().inner_html()
    }

    pub(crate) fn contents(&self) -> Delta {
        to_json(&self.get_contents())
            .map(Delta::from_wire)
            .unwrap_or_default()
    }

    /// Call `handler` with the change delta of every user or API edit, for
    /// as long as the returned listener is kept.
    pub(crate) fn on_text_change(
        &self,
        mut handler: impl FnMut(Delta) + 'static,
    ) -> TextChangeListener {
        let callback: TextChangeCallback = Closure::wrap(Box::new(
            move |delta: JsValue, _old: JsValue, _source: JsValue| {
                if let Some(value) = to_json(&delta) {
                    handler(Delta::from_wire(value));
                }
            },
        ));
        self.on(TEXT_CHANGE, callback.as_ref().unchecked_ref());
        TextChangeListener {
            quill: self.clone(),
            callback,
        }
    }
}
