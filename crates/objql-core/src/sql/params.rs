//! Parameter binding.
//!
//! Every literal in a generated statement is bound as a named parameter;
//! names are allocated monotonically as `p0, p1, …` and render as `@pN`
//! placeholders. Substitution is the driver's job.

use objql_ir::Value;

/// A generated statement with its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSql {
    /// The statement text with `@pN` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<(String, Value)>,
}

/// Allocates parameter names and collects bound values.
#[derive(Debug, Default)]
pub struct ParameterBag {
    params: Vec<(String, Value)>,
}

impl ParameterBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, returning its placeholder.
    pub fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.params.len());
        self.params.push((name.clone(), value));
        format!("@{}", name)
    }

    /// Consume the bag into its ordered parameter list.
    pub fn into_params(self) -> Vec<(String, Value)> {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_allocation() {
        let mut bag = ParameterBag::new();
        assert_eq!(bag.bind(Value::Int(1)), "@p0");
        assert_eq!(bag.bind(Value::String("x".into())), "@p1");
        assert_eq!(bag.bind(Value::Null), "@p2");

        let params = bag.into_params();
        assert_eq!(params[0], ("p0".to_string(), Value::Int(1)));
        assert_eq!(params[2].0, "p2");
    }
}
