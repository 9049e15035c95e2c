//! Forwards engine output to the host's callbacks.

use js_sys::Function;
use wasm_bindgen::JsValue;

use reckon_core::references::BoundAttr;
use reckon_core::traits::Surface;

/// Calls back into JS with rendered markup and propagated bound updates.
/// Callback exceptions are dropped; display is fire-and-forget.
pub struct JsSurface {
    on_display: Function,
    on_bound: Option<Function>,
}

impl JsSurface {
    pub fn new(on_display: Function, on_bound: Option<Function>) -> Self {
        Self {
            on_display,
            on_bound,
        }
    }
}

impl Surface for JsSurface {
    fn display(&mut self, index: usize, markup: &str) {
        let _ = self.on_display.call2(
            &JsValue::NULL,
            &JsValue::from_f64(index as f64),
            &JsValue::from_str(markup),
        );
    }

    fn update_bound(&mut self, name: &str, attribute: BoundAttr, value: f64) {
        if let Some(callback) = &self.on_bound {
            let _ = callback.call3(
                &JsValue::NULL,
                &JsValue::from_str(name),
                &JsValue::from_str(attribute.name()),
                &JsValue::from_f64(value),
            );
        }
    }
}
