//! `reckon_core` is the engine behind Reckon's reactive equation displays.
//!
//! An equation is authored once as display markup with `{{name}}`
//! placeholders. The engine classifies the placeholders into defined
//! (input) and computed (derived) variables, statically checks the external
//! compute callable against that partition, validates the per-variable
//! config and its cross-references, and then drives the live value store:
//! clamp, propagate, recompute, render.
//!
//! The crate is host-agnostic; `reckon_wasm` adapts it to the browser.

pub mod classify;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod format;
pub mod references;
pub mod template;
pub mod traits;
pub mod value;
