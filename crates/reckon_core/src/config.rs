//! Author-supplied configuration: the raw attribute tree and its validation.
//!
//! The config arrives from the host environment as loosely-typed data (JS
//! objects in the browser). It is mirrored into [`Raw`] verbatim and then
//! checked against the classification: every defined variable needs an
//! entry, computed variables must not have one, and each entry may only use
//! the known attributes with the right types.

use std::collections::BTreeMap;

use crate::classify::Classification;
use crate::error::{ConfigError, FractionsError};

/// An attribute value exactly as the author supplied it.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Number(f64),
    Text(String),
    /// An array of numeric rows (a matrix literal).
    Rows(Vec<Vec<f64>>),
    /// A nested record; only legal as a top-level config entry.
    Record(BTreeMap<String, Raw>),
    /// Anything the engine has no use for (booleans, null, functions, ...).
    Other,
}

/// The whole config as supplied: one entry per variable name.
pub type RawConfig = BTreeMap<String, Raw>;

/// A `min`/`max` attribute: either a numeric literal or the name of another
/// defined variable whose live value the bound should track.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Literal(f64),
    Reference(String),
}

/// One variable's validated configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarSpec {
    pub value: Option<f64>,
    pub default: Option<f64>,
    pub step: Option<f64>,
    pub min: Option<Bound>,
    pub max: Option<Bound>,
    pub rows: Option<f64>,
    pub cols: Option<f64>,
    pub matrix: Option<Vec<Vec<f64>>>,
}

impl VarSpec {
    /// True when the entry declares a matrix, by literal or by dimensions.
    pub fn is_matrix(&self) -> bool {
        self.matrix.is_some() || self.rows.is_some()
    }

    /// Declared dimensions. Literal matrices win over `rows`/`cols`;
    /// fractional dimensions truncate.
    pub fn dims(&self) -> Option<(usize, usize)> {
        if let Some(rows) = &self.matrix {
            return Some((rows.len(), rows[0].len()));
        }
        match (self.rows, self.cols) {
            (Some(rows), Some(cols)) => Some((rows as usize, cols as usize)),
            _ => None,
        }
    }
}

/// Session-wide options, separate from per-variable config.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Options {
    /// Decimal places for formatted results. `None` means the default.
    pub fractions: Option<f64>,
}

pub const DEFAULT_FRACTIONS: usize = 3;

/// Resolves the fraction count, applying the default when unset.
pub fn resolve_fractions(options: &Options) -> Result<usize, FractionsError> {
    match options.fractions {
        None => Ok(DEFAULT_FRACTIONS),
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value as usize),
        Some(value) => Err(FractionsError { value }),
    }
}

/// Validates `raw` against the classification and produces typed specs.
///
/// The config must cover the defined set exactly: a missing defined
/// variable, an entry for a computed variable, and an entry for a name no
/// equation mentions are all errors. Keys are visited in lexicographic
/// order, so the first violation reported is deterministic.
pub fn validate(
    raw: &RawConfig,
    classification: &Classification,
) -> Result<BTreeMap<String, VarSpec>, ConfigError> {
    for name in &classification.defined {
        if !raw.contains_key(name) {
            return Err(ConfigError::MissingVariable { name: name.clone() });
        }
    }
    for name in raw.keys() {
        if classification.is_computed(name) {
            return Err(ConfigError::ComputedKey { name: name.clone() });
        }
        if !classification.is_defined(name) {
            return Err(ConfigError::StrayKey { name: name.clone() });
        }
    }

    let mut specs = BTreeMap::new();
    for (key, entry) in raw {
        let fields = match entry {
            Raw::Record(fields) => fields,
            _ => return Err(ConfigError::NotARecord { key: key.clone() }),
        };

        let mut spec = VarSpec::default();
        for (attribute, value) in fields {
            match attribute.as_str() {
                "value" => spec.value = Some(expect_number(key, attribute, value)?),
                "default" => spec.default = Some(expect_number(key, attribute, value)?),
                "step" => spec.step = Some(expect_number(key, attribute, value)?),
                "rows" => spec.rows = Some(expect_number(key, attribute, value)?),
                "cols" => spec.cols = Some(expect_number(key, attribute, value)?),
                "min" => spec.min = Some(expect_bound(key, attribute, value)?),
                "max" => spec.max = Some(expect_bound(key, attribute, value)?),
                "matrix" => spec.matrix = Some(expect_matrix(key, attribute, value)?),
                _ => {
                    return Err(ConfigError::UnknownAttribute {
                        key: key.clone(),
                        attribute: attribute.clone(),
                    })
                }
            }
        }

        if spec.matrix.is_some() && (spec.rows.is_some() || spec.cols.is_some()) {
            return Err(ConfigError::AmbiguousShape { key: key.clone() });
        }
        if spec.rows.is_some() != spec.cols.is_some() {
            return Err(ConfigError::IncompleteShape { key: key.clone() });
        }

        specs.insert(key.clone(), spec);
    }

    Ok(specs)
}

fn expect_number(key: &str, attribute: &str, value: &Raw) -> Result<f64, ConfigError> {
    match value {
        Raw::Number(number) => Ok(*number),
        _ => Err(ConfigError::InvalidType {
            key: key.to_string(),
            attribute: attribute.to_string(),
            expected: "a number",
        }),
    }
}

fn expect_bound(key: &str, attribute: &str, value: &Raw) -> Result<Bound, ConfigError> {
    match value {
        Raw::Number(number) => Ok(Bound::Literal(*number)),
        Raw::Text(target) => Ok(Bound::Reference(target.clone())),
        _ => Err(ConfigError::InvalidType {
            key: key.to_string(),
            attribute: attribute.to_string(),
            expected: "a number or a variable name",
        }),
    }
}

fn expect_matrix(key: &str, attribute: &str, value: &Raw) -> Result<Vec<Vec<f64>>, ConfigError> {
    let rows = match value {
        Raw::Rows(rows) => rows,
        _ => {
            return Err(ConfigError::InvalidType {
                key: key.to_string(),
                attribute: attribute.to_string(),
                expected: "an array of numeric rows",
            })
        }
    };
    if rows.is_empty() || rows[0].is_empty() {
        return Err(ConfigError::MalformedMatrix {
            key: key.to_string(),
        });
    }
    let width = rows[0].len();
    if rows.iter().any(|row| row.len() != width) {
        return Err(ConfigError::MalformedMatrix {
            key: key.to_string(),
        });
    }
    Ok(rows.clone())
}
