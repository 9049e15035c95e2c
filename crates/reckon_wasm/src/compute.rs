//! Wraps the author's JS function as the engine's compute callable.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use js_sys::{Array, Function, Object, Reflect};
use nalgebra::DMatrix;
use wasm_bindgen::{JsCast, JsValue};

use reckon_core::traits::Compute;
use reckon_core::value::{matrix_rows, ComplexNumber, Computed, EigenPair, Value};

pub struct JsCompute {
    function: Function,
    source: String,
}

impl JsCompute {
    /// Captures the function together with its source text, which the
    /// engine checks once at session construction.
    pub fn new(function: Function) -> Self {
        let source = String::from(function.to_string());
        Self { function, source }
    }
}

impl Compute for JsCompute {
    fn source(&self) -> &str {
        &self.source
    }

    fn call(&self, inputs: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Computed>> {
        let record = Object::new();
        for (name, value) in inputs {
            let js = match value {
                Value::Scalar(v) => JsValue::from_f64(*v),
                Value::Matrix(m) => rows_to_js(&matrix_rows(m)),
            };
            Reflect::set(&record, &JsValue::from_str(name), &js)
                .map_err(|err| anyhow!("could not build the input record: {}", describe(&err)))?;
        }

        let result = self
            .function
            .call1(&JsValue::NULL, &record)
            .map_err(|err| anyhow!("compute callable threw: {}", describe(&err)))?;
        parse_result(&result)
    }
}

fn rows_to_js(rows: &[Vec<f64>]) -> JsValue {
    let outer = Array::new();
    for row in rows {
        let inner = Array::new();
        for cell in row {
            inner.push(&JsValue::from_f64(*cell));
        }
        outer.push(&inner);
    }
    outer.into()
}

fn parse_result(value: &JsValue) -> Result<BTreeMap<String, Computed>> {
    if !value.is_object() || Array::is_array(value) {
        return Err(anyhow!(
            "compute callable must return a record of computed values"
        ));
    }
    let object: &Object = value.unchecked_ref();
    let mut outputs = BTreeMap::new();
    for key in Object::keys(object).iter() {
        let name = key
            .as_string()
            .ok_or_else(|| anyhow!("compute result keys must be strings"))?;
        let field = Reflect::get(object, &key)
            .map_err(|err| anyhow!("could not read compute result '{name}': {}", describe(&err)))?;
        outputs.insert(name, computed_from_js(&field));
    }
    Ok(outputs)
}

/// Maps one returned value onto a renderable shape. Unknown shapes become
/// [`Computed::Unsupported`] rather than failing the recompute.
pub(crate) fn computed_from_js(value: &JsValue) -> Computed {
    if let Some(number) = value.as_f64() {
        return Computed::Scalar(number);
    }
    if let Some(text) = value.as_string() {
        return Computed::Text(text);
    }
    if Array::is_array(value) {
        return array_to_computed(&Array::from(value));
    }
    if value.is_object() {
        if let Some(pairs) = eigen_from_js(value) {
            return Computed::Eigen(pairs);
        }
    }
    Computed::Unsupported
}

/// A flat numeric array is a vector; an array of equal-length numeric
/// arrays is a matrix. Anything mixed is unsupported.
fn array_to_computed(array: &Array) -> Computed {
    let length = array.length() as usize;
    if length == 0 {
        return Computed::Vector(Vec::new());
    }

    if let Some(values) = array
        .iter()
        .map(|entry| entry.as_f64())
        .collect::<Option<Vec<f64>>>()
    {
        return Computed::Vector(values);
    }

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(length);
    for entry in array.iter() {
        if !Array::is_array(&entry) {
            return Computed::Unsupported;
        }
        let mut row = Vec::new();
        for cell in Array::from(&entry).iter() {
            match cell.as_f64() {
                Some(number) => row.push(number),
                None => return Computed::Unsupported,
            }
        }
        rows.push(row);
    }
    let width = rows[0].len();
    if width == 0 || rows.iter().any(|row| row.len() != width) {
        return Computed::Unsupported;
    }
    Computed::Matrix(DMatrix::from_fn(rows.len(), width, |i, j| rows[i][j]))
}

/// An eigen result is an object with a `values` array; each entry is a
/// number or an `{re, im}` pair. An optional `vectors` array pairs the
/// eigenvector at index `i` with `values[i]`.
fn eigen_from_js(value: &JsValue) -> Option<Vec<EigenPair>> {
    let values = Reflect::get(value, &JsValue::from_str("values")).ok()?;
    if !Array::is_array(&values) {
        return None;
    }
    let values = Array::from(&values);

    let vectors = Reflect::get(value, &JsValue::from_str("vectors"))
        .ok()
        .filter(Array::is_array)
        .map(|v| Array::from(&v));

    let mut pairs = Vec::with_capacity(values.length() as usize);
    for (index, entry) in values.iter().enumerate() {
        let value = complex_from_js(&entry)?;
        let vector = match &vectors {
            Some(vectors) => complex_vector_from_js(&vectors.get(index as u32))?,
            None => Vec::new(),
        };
        pairs.push(EigenPair { value, vector });
    }
    Some(pairs)
}

fn complex_vector_from_js(value: &JsValue) -> Option<Vec<ComplexNumber>> {
    if value.is_undefined() {
        return Some(Vec::new());
    }
    if !Array::is_array(value) {
        return None;
    }
    Array::from(value)
        .iter()
        .map(|entry| complex_from_js(&entry))
        .collect()
}

fn complex_from_js(value: &JsValue) -> Option<ComplexNumber> {
    if let Some(number) = value.as_f64() {
        return Some(ComplexNumber::real(number));
    }
    if !value.is_object() {
        return None;
    }
    let re = Reflect::get(value, &JsValue::from_str("re")).ok()?.as_f64()?;
    let im = Reflect::get(value, &JsValue::from_str("im")).ok()?.as_f64()?;
    Some(ComplexNumber { re, im })
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
