use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Some packages could not be ordered because they sit on, or downstream
    /// of, a dependency cycle.
    CircularDependency {
        /// Every package left unsorted, in input order.
        unsortable: Vec<String>,
        /// A concrete cycle, first element repeated at the end.
        cycle: Option<Vec<String>>,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::CircularDependency { unsortable, cycle } => match cycle {
                Some(cycle) => write!(
                    f,
                    "Circular dependency detected: {} (unsortable packages: {})",
                    cycle.join(" -> "),
                    unsortable.join(", ")
                ),
                None => write!(
                    f,
                    "Circular dependency detected among packages: {}",
                    unsortable.join(", ")
                ),
            },
        }
    }
}

impl std::error::Error for GraphError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_trace() {
        let err = GraphError::CircularDependency {
            unsortable: vec!["a".into(), "b".into()],
            cycle: Some(vec!["a".into(), "b".into(), "a".into()]),
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: a -> b -> a (unsortable packages: a, b)"
        );
    }

    #[test]
    fn test_display_without_trace() {
        let err = GraphError::CircularDependency {
            unsortable: vec!["x".into()],
            cycle: None,
        };
        assert_eq!(err.to_string(), "Circular dependency detected among packages: x");
    }
}
