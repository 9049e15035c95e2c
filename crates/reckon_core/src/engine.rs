//! The session: analysis products fixed at construction plus the live
//! value store they drive.
//!
//! Construction runs the full validation pipeline (classify, contract,
//! config, references) and fails fast with a [`SetupError`]. After that the
//! session is event-driven: `on_input` and `on_matrix_cell` apply widget
//! edits, propagate referenced bounds, recompute through the callable and
//! push fresh markup at the [`Surface`].

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use nalgebra::DMatrix;
use serde::Serialize;

use crate::classify::{self, Classification};
use crate::config::{self, Bound, Options, RawConfig, VarSpec};
use crate::contract;
use crate::error::SetupError;
use crate::format;
use crate::references::{self, BoundAttr, ReferenceGraph};
use crate::template::Template;
use crate::traits::{Compute, Surface};
use crate::value::{self, Computed, Value};

/// Live numeric bounds for one variable, after reference resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Widget metadata for one defined variable. `value` is `None` while the
/// scalar is unset (NaN); `cells` is present for matrix variables instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputMeta {
    pub name: String,
    pub value: Option<f64>,
    pub cells: Option<Vec<Vec<f64>>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

/// One reactive equation display.
pub struct Session<C: Compute> {
    templates: Vec<Template>,
    classification: Classification,
    specs: BTreeMap<String, VarSpec>,
    graph: ReferenceGraph,
    bounds: BTreeMap<String, Bounds>,
    inputs: BTreeMap<String, Value>,
    outputs: BTreeMap<String, Computed>,
    rendered: Vec<String>,
    fractions: usize,
    compute: C,
}

impl<C: Compute> Session<C> {
    /// Validates everything and builds the initial value store.
    ///
    /// No rendering happens here; call [`Session::recompute`] once after
    /// construction to produce the initial display.
    pub fn new(
        equations: Vec<String>,
        raw: RawConfig,
        options: Options,
        compute: C,
    ) -> Result<Self, SetupError> {
        let classification = classify::classify(&equations)?;
        contract::check(compute.source(), &classification.computed)?;
        let fractions = config::resolve_fractions(&options)?;
        let specs = config::validate(&raw, &classification)?;
        let graph = references::build(&specs, &classification)?;
        references::check_acyclic(&graph)?;

        let bounds = resolve_bounds(&specs);
        let inputs = initial_values(&specs, &bounds);
        let templates = equations.iter().map(|text| Template::parse(text)).collect();

        Ok(Self {
            templates,
            classification,
            specs,
            graph,
            bounds,
            inputs,
            outputs: BTreeMap::new(),
            rendered: Vec::new(),
            fractions,
            compute,
        })
    }

    /// Applies one scalar widget edit.
    ///
    /// `raw` is the widget's text; unparseable text becomes NaN, which falls
    /// back to the live minimum when one exists. The clamped value is
    /// stored, propagated into every bound that references this variable,
    /// and then everything recomputes.
    pub fn on_input(&mut self, name: &str, raw: &str, surface: &mut impl Surface) -> Result<()> {
        match self.inputs.get(name) {
            None => bail!("unknown input variable '{name}'"),
            Some(Value::Matrix(_)) => bail!("'{name}' holds a matrix; edit it per cell"),
            Some(Value::Scalar(_)) => {}
        }

        let bounds = self.bounds.get(name).copied().unwrap_or_default();
        let value = clamp(parse_number(raw), bounds);
        self.inputs.insert(name.to_string(), Value::Scalar(value));

        for (source, attribute) in self.graph.dependents_of(name) {
            let entry = self.bounds.entry(source.clone()).or_default();
            match attribute {
                BoundAttr::Min => entry.min = Some(value),
                BoundAttr::Max => entry.max = Some(value),
            }
            surface.update_bound(source, *attribute, value);
        }

        self.recompute(surface)
    }

    /// Applies one matrix cell edit. Cell edits clamp against the variable's
    /// bounds like scalars do, but never propagate references.
    pub fn on_matrix_cell(
        &mut self,
        name: &str,
        row: usize,
        col: usize,
        raw: &str,
        surface: &mut impl Surface,
    ) -> Result<()> {
        let bounds = self.bounds.get(name).copied().unwrap_or_default();
        let value = clamp(parse_number(raw), bounds);

        let Some(stored) = self.inputs.get_mut(name) else {
            bail!("unknown input variable '{name}'");
        };
        let Value::Matrix(matrix) = stored else {
            bail!("'{name}' holds a scalar, not a matrix");
        };
        if row >= matrix.nrows() || col >= matrix.ncols() {
            bail!(
                "cell ({row}, {col}) is outside '{name}', which is {}x{}",
                matrix.nrows(),
                matrix.ncols()
            );
        }
        matrix[(row, col)] = value;

        self.recompute(surface)
    }

    /// Runs the compute callable over the current inputs, replaces the
    /// computed values and pushes fresh markup for every equation.
    pub fn recompute(&mut self, surface: &mut impl Surface) -> Result<()> {
        let mut record = BTreeMap::new();
        for name in &self.classification.defined {
            if let Some(current) = self.inputs.get(name) {
                record.insert(name.clone(), current.clone());
            }
        }

        self.outputs = self
            .compute
            .call(&record)
            .context("compute callable failed")?;

        let rendered: Vec<String> = self
            .templates
            .iter()
            .map(|template| template.render(|name| self.substitute(name)))
            .collect();
        self.rendered = rendered;

        for (index, markup) in self.rendered.iter().enumerate() {
            surface.display(index, markup);
        }
        Ok(())
    }

    /// Resolves one placeholder for rendering. Defined values win over
    /// computed ones; anything unset or falsy echoes the name itself.
    fn substitute(&self, name: &str) -> String {
        if let Some(value) = self.inputs.get(name) {
            return match value {
                Value::Scalar(v) if format::is_displayable(*v) => {
                    format::scalar(*v, self.fractions)
                }
                Value::Scalar(_) => name.to_string(),
                Value::Matrix(m) => format::matrix(m, self.fractions),
            };
        }
        match self.outputs.get(name) {
            Some(Computed::Scalar(v)) if format::is_displayable(*v) => {
                format::scalar(*v, self.fractions)
            }
            Some(Computed::Scalar(_)) => name.to_string(),
            Some(Computed::Vector(values)) if !values.is_empty() => {
                format::vector(values, self.fractions)
            }
            Some(Computed::Vector(_)) => name.to_string(),
            Some(Computed::Matrix(m)) => format::matrix(m, self.fractions),
            Some(Computed::Eigen(pairs)) if !pairs.is_empty() => {
                format::eigen(pairs, self.fractions)
            }
            Some(Computed::Eigen(_)) => name.to_string(),
            Some(Computed::Text(text)) if !text.is_empty() => text.clone(),
            Some(Computed::Text(_)) => name.to_string(),
            Some(Computed::Unsupported) => format::UNSUPPORTED.to_string(),
            None => name.to_string(),
        }
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// The markup produced by the most recent recompute, per equation.
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }

    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    pub fn bounds_of(&self, name: &str) -> Option<Bounds> {
        self.bounds.get(name).copied()
    }

    pub fn fractions(&self) -> usize {
        self.fractions
    }

    /// Widget metadata for every defined variable, in classification order.
    pub fn input_meta(&self) -> Vec<InputMeta> {
        self.classification
            .defined
            .iter()
            .map(|name| {
                let bounds = self.bounds.get(name).copied().unwrap_or_default();
                let step = self.specs.get(name).and_then(|spec| spec.step);
                let (value, cells) = match self.inputs.get(name) {
                    Some(Value::Scalar(v)) if !v.is_nan() => (Some(*v), None),
                    Some(Value::Matrix(m)) => (None, Some(value::matrix_rows(m))),
                    _ => (None, None),
                };
                InputMeta {
                    name: name.clone(),
                    value,
                    cells,
                    min: bounds.min,
                    max: bounds.max,
                    step,
                }
            })
            .collect()
    }
}

/// Initial scalar for a spec: explicit `value`, else `default`, else unset.
fn initial_scalar(spec: &VarSpec) -> Option<f64> {
    spec.value.or(spec.default)
}

/// Resolves every bound to a number. References resolve once, here, to the
/// target's initial value; live tracking afterwards is the propagation
/// step's job. A reference to a variable with no initial value leaves the
/// bound unset until the first edit arrives.
fn resolve_bounds(specs: &BTreeMap<String, VarSpec>) -> BTreeMap<String, Bounds> {
    let resolve = |bound: &Option<Bound>| -> Option<f64> {
        match bound {
            Some(Bound::Literal(number)) => Some(*number),
            Some(Bound::Reference(target)) => specs.get(target).and_then(initial_scalar),
            None => None,
        }
    };
    specs
        .iter()
        .map(|(name, spec)| {
            (
                name.clone(),
                Bounds {
                    min: resolve(&spec.min),
                    max: resolve(&spec.max),
                },
            )
        })
        .collect()
}

/// Builds the initial store. Scalars start from `value`/`default` (NaN when
/// neither is given); matrices start from their literal, or filled with the
/// resolved minimum (0 when there is none).
fn initial_values(
    specs: &BTreeMap<String, VarSpec>,
    bounds: &BTreeMap<String, Bounds>,
) -> BTreeMap<String, Value> {
    specs
        .iter()
        .map(|(name, spec)| {
            let value = if let Some(rows) = &spec.matrix {
                Value::Matrix(DMatrix::from_fn(rows.len(), rows[0].len(), |i, j| {
                    rows[i][j]
                }))
            } else if let Some((nrows, ncols)) = spec.dims() {
                let fill = bounds
                    .get(name)
                    .and_then(|b| b.min)
                    .filter(|m| m.is_finite())
                    .unwrap_or(0.0);
                Value::Matrix(DMatrix::from_element(nrows, ncols, fill))
            } else {
                Value::Scalar(initial_scalar(spec).unwrap_or(f64::NAN))
            };
            (name.clone(), value)
        })
        .collect()
}

/// Widget text to number. Anything that does not parse becomes NaN.
fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Clamps against the live bounds, min first, then max. NaN input snaps to
/// the minimum when one exists; NaN bounds never fire.
fn clamp(value: f64, bounds: Bounds) -> f64 {
    if value.is_nan() {
        return bounds.min.unwrap_or(value);
    }
    let mut out = value;
    if let Some(min) = bounds.min {
        if out < min {
            out = min;
        }
    }
    if let Some(max) = bounds.max {
        if out > max {
            out = max;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{clamp, parse_number, Bounds, Session};
    use crate::config::{Options, Raw, RawConfig};
    use crate::error::SetupError;
    use crate::references::BoundAttr;
    use crate::traits::{Compute, Surface};
    use crate::value::{Computed, Value};
    use nalgebra::DMatrix;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// Scriptable callable: fixed source text plus a closure for results.
    struct TestCompute<F>
    where
        F: Fn(&BTreeMap<String, Value>) -> anyhow::Result<BTreeMap<String, Computed>>,
    {
        source: &'static str,
        produce: F,
    }

    impl<F> Compute for TestCompute<F>
    where
        F: Fn(&BTreeMap<String, Value>) -> anyhow::Result<BTreeMap<String, Computed>>,
    {
        fn source(&self) -> &str {
            self.source
        }

        fn call(&self, inputs: &BTreeMap<String, Value>) -> anyhow::Result<BTreeMap<String, Computed>> {
            (self.produce)(inputs)
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        displays: Vec<(usize, String)>,
        bound_updates: Vec<(String, BoundAttr, f64)>,
    }

    impl Surface for RecordingSurface {
        fn display(&mut self, index: usize, markup: &str) {
            self.displays.push((index, markup.to_string()));
        }

        fn update_bound(&mut self, name: &str, attribute: BoundAttr, value: f64) {
            self.bound_updates.push((name.to_string(), attribute, value));
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn entry(fields: &[(&str, Raw)]) -> Raw {
        Raw::Record(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        )
    }

    fn config(entries: &[(&str, Raw)]) -> RawConfig {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn equations(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn sum_compute() -> TestCompute<impl Fn(&BTreeMap<String, Value>) -> anyhow::Result<BTreeMap<String, Computed>>>
    {
        TestCompute {
            source: "(values) => { return { y: values.x + values.k }; }",
            produce: |inputs: &BTreeMap<String, Value>| {
                let x = inputs["x"].as_scalar().unwrap();
                let k = inputs["k"].as_scalar().unwrap();
                let mut out = BTreeMap::new();
                out.insert("y".to_string(), Computed::Scalar(x + k));
                Ok(out)
            },
        }
    }

    fn sum_session() -> Session<
        TestCompute<impl Fn(&BTreeMap<String, Value>) -> anyhow::Result<BTreeMap<String, Computed>>>,
    > {
        let raw = config(&[
            (
                "x",
                entry(&[
                    ("value", Raw::Number(1.0)),
                    ("min", Raw::Number(0.0)),
                    ("max", Raw::Number(10.0)),
                ]),
            ),
            ("k", entry(&[("value", Raw::Number(2.0))])),
        ]);
        Session::new(
            equations(&["{{x}} + {{k}} = {{y}}"]),
            raw,
            Options::default(),
            sum_compute(),
        )
        .unwrap()
    }

    #[test]
    fn initial_recompute_renders_the_equation() {
        let mut session = sum_session();
        let mut surface = RecordingSurface::default();
        session.recompute(&mut surface).unwrap();

        assert_eq!(surface.displays, [(0, "1 + 2 = 3".to_string())]);
        assert_eq!(session.rendered(), ["1 + 2 = 3"]);
    }

    #[test]
    fn input_edits_clamp_store_and_rerender() {
        let mut session = sum_session();
        let mut surface = RecordingSurface::default();

        session.on_input("x", "4.5", &mut surface).unwrap();
        assert_eq!(session.value_of("x"), Some(&Value::Scalar(4.5)));
        assert_eq!(session.rendered(), ["4.5 + 2 = 6.5"]);

        // Above max: clamps to 10.
        session.on_input("x", "99", &mut surface).unwrap();
        assert_eq!(session.value_of("x"), Some(&Value::Scalar(10.0)));
        assert_eq!(session.rendered(), ["10 + 2 = 12"]);

        // Below min: clamps to 0, which then echoes its own name.
        session.on_input("x", "-3", &mut surface).unwrap();
        assert_eq!(session.value_of("x"), Some(&Value::Scalar(0.0)));
        assert_eq!(session.rendered(), ["x + 2 = 2"]);
    }

    #[test]
    fn unparseable_input_falls_back_to_the_minimum() {
        let mut session = sum_session();
        let mut surface = RecordingSurface::default();
        session.on_input("x", "not a number", &mut surface).unwrap();
        assert_eq!(session.value_of("x"), Some(&Value::Scalar(0.0)));
    }

    #[test]
    fn unknown_and_mistyped_inputs_are_runtime_errors() {
        let mut session = sum_session();
        let mut surface = RecordingSurface::default();

        assert_err_contains(
            session.on_input("ghost", "1", &mut surface),
            "unknown input variable",
        );
        assert_err_contains(
            session.on_matrix_cell("x", 0, 0, "1", &mut surface),
            "holds a scalar",
        );
    }

    #[test]
    fn callable_receives_exactly_the_defined_set() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_by_compute = Rc::clone(&seen);
        let compute = TestCompute {
            source: "(values) => { return { y: 1 }; }",
            produce: move |inputs: &BTreeMap<String, Value>| {
                seen_by_compute
                    .borrow_mut()
                    .push(inputs.keys().cloned().collect::<Vec<_>>());
                Ok(BTreeMap::from([("y".to_string(), Computed::Scalar(1.0))]))
            },
        };
        let raw = config(&[
            ("x", entry(&[("value", Raw::Number(1.0))])),
            ("k", entry(&[("value", Raw::Number(2.0))])),
        ]);
        let mut session = Session::new(
            equations(&["{{x}} + {{k}} = {{y}}"]),
            raw,
            Options::default(),
            compute,
        )
        .unwrap();

        let mut surface = RecordingSurface::default();
        session.recompute(&mut surface).unwrap();
        assert_eq!(seen.borrow().as_slice(), [vec![
            "k".to_string(),
            "x".to_string()
        ]]);
    }

    #[test]
    fn reference_propagation_updates_bounds_and_surface() {
        // x's max tracks k's live value.
        let raw = config(&[
            (
                "x",
                entry(&[("value", Raw::Number(1.0)), ("max", Raw::Text("k".to_string()))]),
            ),
            ("k", entry(&[("value", Raw::Number(5.0))])),
        ]);
        let mut session = Session::new(
            equations(&["{{x}} + {{k}} = {{y}}"]),
            raw,
            Options::default(),
            sum_compute(),
        )
        .unwrap();

        // Resolved once at construction to k's initial value.
        assert_eq!(
            session.bounds_of("x"),
            Some(Bounds {
                min: None,
                max: Some(5.0),
            })
        );

        let mut surface = RecordingSurface::default();
        session.on_input("k", "3", &mut surface).unwrap();
        assert_eq!(
            session.bounds_of("x"),
            Some(Bounds {
                min: None,
                max: Some(3.0),
            })
        );
        assert_eq!(
            surface.bound_updates,
            [("x".to_string(), BoundAttr::Max, 3.0)]
        );

        // The stored x is not re-clamped by propagation alone...
        assert_eq!(session.value_of("x"), Some(&Value::Scalar(1.0)));
        // ...but the next edit clamps against the tracked bound.
        session.on_input("x", "9", &mut surface).unwrap();
        assert_eq!(session.value_of("x"), Some(&Value::Scalar(3.0)));
    }

    #[test]
    fn matrix_variables_initialize_and_take_cell_edits() {
        let raw = config(&[
            (
                "m",
                entry(&[("rows", Raw::Number(2.0)), ("cols", Raw::Number(2.0))]),
            ),
            (
                "lit",
                entry(&[("matrix", Raw::Rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]))]),
            ),
        ]);
        let compute = TestCompute {
            source: "(values) => { return { d: det(values.m) }; }",
            produce: |inputs: &BTreeMap<String, Value>| {
                let m = inputs["m"].as_matrix().unwrap();
                let mut out = BTreeMap::new();
                out.insert("d".to_string(), Computed::Scalar(m.determinant()));
                Ok(out)
            },
        };
        let mut session = Session::new(
            equations(&["\\det {{m}} {{lit}} = {{d}}"]),
            raw,
            Options::default(),
            compute,
        )
        .unwrap();

        // Dimension-declared matrices start zero-filled.
        assert_eq!(
            session.value_of("m"),
            Some(&Value::Matrix(DMatrix::zeros(2, 2)))
        );
        // Literal matrices start from their literal.
        assert_eq!(
            session.value_of("lit"),
            Some(&Value::Matrix(DMatrix::from_row_slice(
                2,
                2,
                &[1.0, 2.0, 3.0, 4.0]
            ))),
        );

        let mut surface = RecordingSurface::default();
        session.on_matrix_cell("m", 0, 0, "2", &mut surface).unwrap();
        session.on_matrix_cell("m", 1, 1, "3", &mut surface).unwrap();
        let Some(Value::Matrix(m)) = session.value_of("m") else {
            panic!("m should be a matrix");
        };
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 1)], 3.0);
        assert_eq!(
            session.rendered()[0],
            "\\det \\begin{pmatrix}2 & 0 \\\\ 0 & 3\\end{pmatrix} \
             \\begin{pmatrix}1 & 2 \\\\ 3 & 4\\end{pmatrix} = 6"
        );

        assert_err_contains(
            session.on_matrix_cell("m", 5, 0, "1", &mut surface),
            "outside",
        );
    }

    #[test]
    fn failing_callable_surfaces_as_an_error() {
        let compute = TestCompute {
            source: "(values) => { return { y: boom() }; }",
            produce: |_: &BTreeMap<String, Value>| anyhow::bail!("boom"),
        };
        let raw = config(&[("x", entry(&[("value", Raw::Number(1.0))]))]);
        let mut session = Session::new(
            equations(&["{{x}} = {{y}}"]),
            raw,
            Options::default(),
            compute,
        )
        .unwrap();
        let mut surface = RecordingSurface::default();
        let err = session.recompute(&mut surface).unwrap_err();
        assert!(format!("{err:#}").contains("compute callable failed"));
        assert!(format!("{err:#}").contains("boom"));
        assert!(surface.displays.is_empty());
    }

    #[test]
    fn empty_result_shapes_echo_their_names() {
        let compute = TestCompute {
            source: "(values) => { return { y: a, z: b, w: c }; }",
            produce: |_: &BTreeMap<String, Value>| {
                Ok(BTreeMap::from([
                    ("y".to_string(), Computed::Eigen(Vec::new())),
                    ("z".to_string(), Computed::Vector(Vec::new())),
                    ("w".to_string(), Computed::Text(String::new())),
                ]))
            },
        };
        let raw = config(&[("x", entry(&[("value", Raw::Number(1.0))]))]);
        let mut session = Session::new(
            equations(&["{{x}} = {{y}} {{z}} {{w}}"]),
            raw,
            Options::default(),
            compute,
        )
        .unwrap();
        let mut surface = RecordingSurface::default();
        session.recompute(&mut surface).unwrap();
        assert_eq!(session.rendered(), ["1 = y z w"]);
    }

    #[test]
    fn setup_failures_come_out_typed() {
        let raw = config(&[("x", entry(&[("value", Raw::Number(1.0))]))]);
        let err = Session::new(
            equations(&["{{x}} = {{y}}"]),
            raw,
            Options {
                fractions: Some(-2.0),
            },
            sum_compute(),
        )
        .err()
        .expect("construction should fail");
        assert!(matches!(err, SetupError::Fractions(_)));
    }

    #[test]
    fn clamp_applies_min_before_max() {
        let bounds = Bounds {
            min: Some(0.0),
            max: Some(10.0),
        };
        assert_eq!(clamp(-5.0, bounds), 0.0);
        assert_eq!(clamp(15.0, bounds), 10.0);
        assert_eq!(clamp(5.0, bounds), 5.0);

        // Contradictory bounds: max wins because it is applied last.
        let crossed = Bounds {
            min: Some(10.0),
            max: Some(2.0),
        };
        assert_eq!(clamp(5.0, crossed), 2.0);

        // NaN input snaps to min when present, stays NaN otherwise.
        assert!(clamp(f64::NAN, Bounds::default()).is_nan());
        assert_eq!(clamp(f64::NAN, bounds), 0.0);
    }

    #[test]
    fn parse_number_accepts_trimmed_floats_only() {
        assert_eq!(parse_number(" 2.5 "), 2.5);
        assert_eq!(parse_number("-1e3"), -1000.0);
        assert!(parse_number("12abc").is_nan());
        assert!(parse_number("").is_nan());
    }
}
