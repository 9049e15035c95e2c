//! Partitions equation placeholders into defined and computed variables.

use crate::error::ClassificationError;
use crate::template;

/// The two variable sets, in first-seen order. Disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Input variables: the author supplies these through widgets.
    pub defined: Vec<String>,
    /// Derived variables: the compute callable produces these.
    pub computed: Vec<String>,
}

impl Classification {
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.iter().any(|n| n == name)
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.computed.iter().any(|n| n == name)
    }
}

/// Classifies every placeholder across `equations`.
///
/// Each equation is stripped of whitespace and split on `=`, dropping empty
/// sides. Placeholders on the first side are defined unless an earlier
/// equation already computes them; placeholders on any later side are
/// computed. A later-side placeholder that is already defined is a
/// contradiction and aborts classification.
pub fn classify(equations: &[String]) -> Result<Classification, ClassificationError> {
    let mut classification = Classification::default();

    for (index, equation) in equations.iter().enumerate() {
        let stripped: String = equation.chars().filter(|c| !c.is_whitespace()).collect();
        let sides: Vec<&str> = stripped.split('=').filter(|side| !side.is_empty()).collect();
        if sides.is_empty() {
            return Err(ClassificationError::NoContent { index });
        }

        for (side_index, side) in sides.iter().enumerate() {
            for name in template::placeholder_names(side) {
                if side_index == 0 {
                    if !classification.is_computed(&name) && !classification.is_defined(&name) {
                        classification.defined.push(name);
                    }
                } else if classification.is_defined(&name) {
                    return Err(ClassificationError::DefinedValue { index, name });
                } else if !classification.is_computed(&name) {
                    classification.computed.push(name);
                }
            }
        }
    }

    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::{classify, Classification};
    use crate::error::ClassificationError;

    fn equations(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn first_side_defines_later_sides_compute() {
        let classification = classify(&equations(&["{{x}} + {{k}} = {{y}}"])).unwrap();
        assert_eq!(
            classification,
            Classification {
                defined: vec!["x".to_string(), "k".to_string()],
                computed: vec!["y".to_string()],
            }
        );
    }

    #[test]
    fn single_side_equations_define_their_placeholders() {
        let classification = classify(&equations(&["{{a}} \\cdot {{b}}"])).unwrap();
        assert_eq!(classification.defined, ["a", "b"]);
        assert!(classification.computed.is_empty());
    }

    #[test]
    fn computed_wins_across_equations() {
        // y is computed by the first equation, so its later first-side
        // appearance must not reclassify it as defined.
        let classification =
            classify(&equations(&["{{x}} = {{y}}", "{{y}} + {{z}} = {{w}}"])).unwrap();
        assert_eq!(classification.defined, ["x", "z"]);
        assert_eq!(classification.computed, ["y", "w"]);
    }

    #[test]
    fn chained_sides_all_compute() {
        let classification = classify(&equations(&["{{a}} = {{b}} = {{c}}"])).unwrap();
        assert_eq!(classification.defined, ["a"]);
        assert_eq!(classification.computed, ["b", "c"]);
    }

    #[test]
    fn defined_then_computed_is_a_contradiction() {
        let err = classify(&equations(&["{{x}} + {{k}} = {{y}}", "{{q}} = {{x}}"])).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::DefinedValue {
                index: 1,
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn same_equation_contradiction_is_caught() {
        let err = classify(&equations(&["{{x}} = {{x}}"])).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::DefinedValue {
                index: 0,
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn empty_equations_are_rejected() {
        for text in ["", "   ", "=", " = = "] {
            let err = classify(&equations(&[text])).unwrap_err();
            assert_eq!(err, ClassificationError::NoContent { index: 0 });
        }
    }

    #[test]
    fn literal_only_equations_are_allowed() {
        // No placeholders at all is legal; there is just nothing to classify.
        let classification = classify(&equations(&["E = mc^2"])).unwrap();
        assert!(classification.defined.is_empty());
        assert!(classification.computed.is_empty());
    }

    #[test]
    fn duplicates_keep_first_seen_order() {
        let classification =
            classify(&equations(&["{{b}} + {{a}} + {{b}} = {{r}} + {{r}}"])).unwrap();
        assert_eq!(classification.defined, ["b", "a"]);
        assert_eq!(classification.computed, ["r"]);
    }
}
