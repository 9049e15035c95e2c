use std::collections::BTreeMap;

use anyhow::Result;

use crate::references::BoundAttr;
use crate::value::{Computed, Value};

/// The external compute callable.
///
/// The engine never interprets the callable's body; it checks `source` once
/// at session construction (see `contract`) and then invokes `call` on every
/// recompute with the full defined-value record.
pub trait Compute {
    /// The callable's text, as the host environment exposes it.
    fn source(&self) -> &str;

    /// Produces the computed values for the current inputs.
    fn call(&self, inputs: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Computed>>;
}

/// The host surface the engine drives: rendered markup out, propagated
/// bound updates out. Input events come in through `Session` methods.
pub trait Surface {
    /// Receives the substituted markup for the equation at `index`.
    fn display(&mut self, index: usize, markup: &str);

    /// Mirrors a propagated bound change onto the widget for `name`.
    fn update_bound(&mut self, name: &str, attribute: BoundAttr, value: f64);
}
