//! JsValue to engine-input conversions.
//!
//! The config and options arrive as plain JS objects. They are mirrored
//! into [`Raw`] by inspecting each value's runtime type; validation proper
//! happens in `reckon_core`, so anything unrecognized becomes `Raw::Other`
//! and fails there with a typed error instead of here.

use std::collections::BTreeMap;

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use reckon_core::config::{Options, Raw, RawConfig};

/// Accepts a single template string or an array of them.
pub fn equations_from_js(value: &JsValue) -> Result<Vec<String>, JsValue> {
    if let Some(single) = value.as_string() {
        return Ok(vec![single]);
    }
    if Array::is_array(value) {
        let array = Array::from(value);
        let mut equations = Vec::with_capacity(array.length() as usize);
        for entry in array.iter() {
            match entry.as_string() {
                Some(text) => equations.push(text),
                None => return Err(JsValue::from_str("every equation must be a string")),
            }
        }
        return Ok(equations);
    }
    Err(JsValue::from_str(
        "equations must be a string or an array of strings",
    ))
}

/// Mirrors the config object into the engine's raw representation.
pub fn config_from_js(value: &JsValue) -> Result<RawConfig, JsValue> {
    if !value.is_object() || Array::is_array(value) {
        return Err(JsValue::from_str("config must be a plain object"));
    }
    let object: &Object = value.unchecked_ref();
    let mut config = BTreeMap::new();
    for key in Object::keys(object).iter() {
        let name = key
            .as_string()
            .ok_or_else(|| JsValue::from_str("config keys must be strings"))?;
        let entry = Reflect::get(object, &key)?;
        config.insert(name, raw_from_js(&entry));
    }
    Ok(config)
}

/// Reads the session options. A bad `fractions` type is forwarded as NaN so
/// the engine reports it through its own error taxonomy.
pub fn options_from_js(value: &JsValue) -> Result<Options, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(Options::default());
    }
    if !value.is_object() {
        return Err(JsValue::from_str("options must be an object"));
    }
    let fractions = Reflect::get(value, &JsValue::from_str("fractions"))?;
    let fractions = if fractions.is_undefined() || fractions.is_null() {
        None
    } else {
        Some(fractions.as_f64().unwrap_or(f64::NAN))
    };
    Ok(Options { fractions })
}

fn raw_from_js(value: &JsValue) -> Raw {
    if let Some(number) = value.as_f64() {
        return Raw::Number(number);
    }
    if let Some(text) = value.as_string() {
        return Raw::Text(text);
    }
    if Array::is_array(value) {
        return rows_from_js(&Array::from(value));
    }
    if value.is_object() {
        let object: &Object = value.unchecked_ref();
        let mut fields = BTreeMap::new();
        for key in Object::keys(object).iter() {
            let Some(name) = key.as_string() else {
                return Raw::Other;
            };
            let Ok(field) = Reflect::get(object, &key) else {
                return Raw::Other;
            };
            fields.insert(name, raw_from_js(&field));
        }
        return Raw::Record(fields);
    }
    Raw::Other
}

/// An array is only meaningful as a matrix literal: rows of numbers.
fn rows_from_js(array: &Array) -> Raw {
    let mut rows = Vec::with_capacity(array.length() as usize);
    for row in array.iter() {
        if !Array::is_array(&row) {
            return Raw::Other;
        }
        let row = Array::from(&row);
        let mut cells = Vec::with_capacity(row.length() as usize);
        for cell in row.iter() {
            match cell.as_f64() {
                Some(number) => cells.push(number),
                None => return Raw::Other,
            }
        }
        rows.push(cells);
    }
    Raw::Rows(rows)
}
