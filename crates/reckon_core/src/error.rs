use thiserror::Error;

/// Equation shape problems found while partitioning placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The equation is empty, or contains only `=` signs.
    #[error("equation {index} has no content")]
    NoContent { index: usize },
    /// A placeholder on a result side was already classified as an input.
    #[error("equation {index}: '{name}' is a defined value and cannot be computed")]
    DefinedValue { index: usize, name: String },
}

/// Return-shape mismatches between the compute callable and the equations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("no return statement found in compute callable")]
    NoReturn,
    #[error("compute callable does not return: {}", .names.join(", "))]
    Missing { names: Vec<String> },
    #[error("compute callable returns unknown value(s): {}", .names.join(", "))]
    Redundant { names: Vec<String> },
}

/// Config attribute typing, allowlist and shape violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("defined variable '{name}' is missing from the config")]
    MissingVariable { name: String },
    #[error("'{name}' is a computed value and cannot be configured")]
    ComputedKey { name: String },
    #[error("config key '{name}' does not appear in any equation")]
    StrayKey { name: String },
    #[error("config entry '{key}' must be a record of attributes")]
    NotARecord { key: String },
    #[error("unknown attribute '{attribute}' on '{key}'")]
    UnknownAttribute { key: String, attribute: String },
    #[error("attribute '{attribute}' on '{key}' must be {expected}")]
    InvalidType {
        key: String,
        attribute: String,
        expected: &'static str,
    },
    #[error("'{key}' declares 'matrix' together with 'rows'/'cols'")]
    AmbiguousShape { key: String },
    #[error("'{key}' declares only one of 'rows' and 'cols'")]
    IncompleteShape { key: String },
    #[error("matrix literal for '{key}' must be a non-empty rectangle")]
    MalformedMatrix { key: String },
}

/// Invalid cross-references between config entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("'{key}.{attribute}' references unknown variable '{target}'")]
    Undefined {
        key: String,
        attribute: String,
        target: String,
    },
    #[error("'{key}.{attribute}' references computed value '{target}'; only static (input) values can be referenced")]
    ComputedTarget {
        key: String,
        attribute: String,
        target: String,
    },
    #[error("'{key}.{attribute}' references itself")]
    SelfReference { key: String, attribute: String },
}

/// A cycle in the bound-reference graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circular reference: {}", .path.join(" -> "))]
pub struct CircularReferenceError {
    /// Variables along the cycle; the first one appears again at the end.
    pub path: Vec<String>,
}

/// Invalid global `fractions` setting.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("'fractions' must be a non-negative number, got {value}")]
pub struct FractionsError {
    pub value: f64,
}

/// Any failure that aborts session construction.
///
/// Construction fails fast: the first violation encountered is returned and
/// no further stages run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    CircularReference(#[from] CircularReferenceError),
    #[error(transparent)]
    Fractions(#[from] FractionsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_variable() {
        let err = ClassificationError::DefinedValue {
            index: 2,
            name: "x".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "equation 2: 'x' is a defined value and cannot be computed"
        );

        let err = ContractError::Missing {
            names: vec!["y".to_string(), "z".to_string()],
        };
        assert_eq!(format!("{err}"), "compute callable does not return: y, z");

        let err = CircularReferenceError {
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(format!("{err}"), "circular reference: a -> b -> a");
    }

    #[test]
    fn setup_error_is_transparent_over_its_sources() {
        let err: SetupError = ConfigError::StrayKey {
            name: "ghost".to_string(),
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "config key 'ghost' does not appear in any equation"
        );
    }
}
