//! Display formatting: the fraction policy and per-shape presentations.
//!
//! Scalars follow a three-step policy driven by the session's `fractions`
//! count (decimal places):
//!
//! 1. values that already need at most `fractions` decimals print in their
//!    shortest form, untouched;
//! 2. values below one whose leading fractional zeros meet or exceed the
//!    count switch to scientific notation, so they never round away;
//! 3. everything else rounds to `fractions` decimals, falling back to
//!    scientific if rounding collapses the value to zero.

use std::fmt::Write;

use nalgebra::DMatrix;

use crate::value::{ComplexNumber, EigenPair};

/// Marker substituted for result shapes the engine cannot render.
pub const UNSUPPORTED: &str = "\\text{unsupported}";

/// True when a scalar should substitute into a template. Zero, NaN and
/// unset values echo the variable name instead.
pub fn is_displayable(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Formats one scalar under the fraction policy.
pub fn scalar(value: f64, fractions: usize) -> String {
    if decimal_places(value) <= fractions {
        return format!("{value}");
    }
    if value.abs() < 1.0 && leading_fraction_zeros(value) >= fractions {
        return format!("{value:.fractions$e}");
    }
    let rounded = format!("{value:.fractions$}");
    if is_zero_text(&rounded) {
        return format!("{value:.fractions$e}");
    }
    rounded
}

/// Formats a matrix cell. Unlike template substitution, zero is real
/// content here and NaN marks a cell the author has not filled in sensibly.
pub fn cell(value: f64, fractions: usize) -> String {
    if value == 0.0 || value.is_nan() {
        format!("{value}")
    } else {
        scalar(value, fractions)
    }
}

/// Comma-separated list, for one-dimensional results.
pub fn vector(values: &[f64], fractions: usize) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&cell(*value, fractions));
    }
    out
}

/// LaTeX `pmatrix` markup with formatted cells.
pub fn matrix(values: &DMatrix<f64>, fractions: usize) -> String {
    let mut out = String::from("\\begin{pmatrix}");
    for i in 0..values.nrows() {
        if i > 0 {
            out.push_str(" \\\\ ");
        }
        for j in 0..values.ncols() {
            if j > 0 {
                out.push_str(" & ");
            }
            out.push_str(&cell(values[(i, j)], fractions));
        }
    }
    out.push_str("\\end{pmatrix}");
    out
}

/// `a + bi` form, dropping the parts that are exactly zero.
pub fn complex(value: &ComplexNumber, fractions: usize) -> String {
    if value.im == 0.0 {
        return cell(value.re, fractions);
    }
    if value.re == 0.0 {
        return format!("{}i", cell(value.im, fractions));
    }
    if value.im < 0.0 {
        format!("{} - {}i", cell(value.re, fractions), cell(-value.im, fractions))
    } else {
        format!("{} + {}i", cell(value.re, fractions), cell(value.im, fractions))
    }
}

/// `\lambda_i = ..., v_i = (...)` per pair, `;` separated.
pub fn eigen(pairs: &[EigenPair], fractions: usize) -> String {
    let mut out = String::new();
    for (i, pair) in pairs.iter().enumerate() {
        if i > 0 {
            out.push_str(";\\; ");
        }
        let _ = write!(out, "\\lambda_{{{}}} = {}", i + 1, complex(&pair.value, fractions));
        if !pair.vector.is_empty() {
            let components: Vec<String> = pair
                .vector
                .iter()
                .map(|component| complex(component, fractions))
                .collect();
            let _ = write!(out, ",\\; v_{{{}}} = ({})", i + 1, components.join(", "));
        }
    }
    out
}

/// Decimal places in the value's shortest decimal form.
fn decimal_places(value: f64) -> usize {
    let text = format!("{value}");
    match text.split_once('.') {
        Some((_, fraction)) => fraction.len(),
        None => 0,
    }
}

/// Zeros between the decimal point and the first significant digit.
/// Only meaningful for values with no integer part.
fn leading_fraction_zeros(value: f64) -> usize {
    let text = format!("{}", value.abs());
    match text.split_once('.') {
        Some(("0", fraction)) => fraction.chars().take_while(|c| *c == '0').count(),
        _ => 0,
    }
}

fn is_zero_text(text: &str) -> bool {
    text.trim_start_matches('-')
        .chars()
        .all(|c| c == '0' || c == '.')
}
