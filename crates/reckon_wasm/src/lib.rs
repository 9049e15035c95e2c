//! Browser bridge for the Reckon equation engine.
//!
//! `WasmSession` owns one `reckon_core` session plus the JS callbacks it
//! drives. Construction validates everything and renders once; afterwards
//! the host forwards widget events to `on_input`/`on_matrix_cell` and
//! receives fresh markup through the `on_display` callback.

mod compute;
mod convert;
mod surface;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use reckon_core::engine::Session;

use compute::JsCompute;
use convert::{config_from_js, equations_from_js, options_from_js};
use surface::JsSurface;

#[wasm_bindgen]
pub struct WasmSession {
    session: Session<JsCompute>,
    surface: JsSurface,
}

/// One-shot summary the host can use to bootstrap its widgets.
#[derive(Serialize)]
struct SessionInfo {
    defined: Vec<String>,
    computed: Vec<String>,
    fractions: usize,
}

#[wasm_bindgen]
impl WasmSession {
    /// Builds a session and performs the initial render.
    ///
    /// `equations` is a template string or an array of them; `config` maps
    /// each defined variable to its attributes; `compute` is the author's
    /// callable; `options` may carry `fractions`. `on_display(index, markup)`
    /// receives rendered equations and the optional `on_bound(name, attr,
    /// value)` mirrors propagated bound updates.
    #[wasm_bindgen(constructor)]
    pub fn new(
        equations: JsValue,
        config: JsValue,
        compute: js_sys::Function,
        options: JsValue,
        on_display: js_sys::Function,
        on_bound: Option<js_sys::Function>,
    ) -> Result<WasmSession, JsValue> {
        console_error_panic_hook::set_once();

        let equations = equations_from_js(&equations)?;
        let config = config_from_js(&config)?;
        let options = options_from_js(&options)?;

        let session = Session::new(equations, config, options, JsCompute::new(compute))
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let mut bridge = WasmSession {
            session,
            surface: JsSurface::new(on_display, on_bound),
        };
        bridge
            .session
            .recompute(&mut bridge.surface)
            .map_err(runtime_error)?;
        Ok(bridge)
    }

    /// Applies a scalar widget edit and re-renders.
    pub fn on_input(&mut self, name: &str, raw_value: &str) -> Result<(), JsValue> {
        self.session
            .on_input(name, raw_value, &mut self.surface)
            .map_err(runtime_error)
    }

    /// Applies a matrix cell edit and re-renders.
    pub fn on_matrix_cell(
        &mut self,
        name: &str,
        row: usize,
        col: usize,
        raw_value: &str,
    ) -> Result<(), JsValue> {
        self.session
            .on_matrix_cell(name, row, col, raw_value, &mut self.surface)
            .map_err(runtime_error)
    }

    /// The markup from the most recent recompute, one entry per equation.
    pub fn rendered(&self) -> Vec<String> {
        self.session.rendered().to_vec()
    }

    /// Widget metadata for every defined variable, in classification order.
    pub fn inputs(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.input_meta()).map_err(serialize_error)
    }

    /// Live bounds for one variable, or `undefined` if it has none.
    pub fn bounds_of(&self, name: &str) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.bounds_of(name)).map_err(serialize_error)
    }

    /// Variable partition and formatting settings.
    pub fn info(&self) -> Result<JsValue, JsValue> {
        let classification = self.session.classification();
        let info = SessionInfo {
            defined: classification.defined.clone(),
            computed: classification.computed.clone(),
            fractions: self.session.fractions(),
        };
        serde_wasm_bindgen::to_value(&info).map_err(serialize_error)
    }
}

fn runtime_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

fn serialize_error(err: serde_wasm_bindgen::Error) -> JsValue {
    JsValue::from_str(&format!("failed to serialize: {err}"))
}
