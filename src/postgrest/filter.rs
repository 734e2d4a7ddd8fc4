//! Filter rendering for the REST query interface.

use std::fmt;

/// Comparison operators used by the marketplace queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Neq,
    /// Pattern match, case insensitive
    ILike,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::ILike => "ilike",
        }
    }
}

/// A single column condition, rendered as `column=op.value` or, inside an OR
/// group, as `column.op.value`.
#[derive(Debug, Clone)]
pub struct Condition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Condition {
    pub fn eq<T: fmt::Display>(column: &str, value: T) -> Self {
        Self {
            column: column.to_string(),
            operator: FilterOperator::Eq,
            value: value.to_string(),
        }
    }

    /// Render for use inside an `or=(...)` group.
    pub(crate) fn render_grouped(&self) -> String {
        format!("{}.{}.{}", self.column, self.operator.as_str(), self.value)
    }
}

/// Render a disjunction of conditions as the value of an `or` parameter.
pub(crate) fn render_or_group(conditions: &[Condition]) -> String {
    let parts: Vec<String> = conditions.iter().map(Condition::render_grouped).collect();
    format!("({})", parts.join(","))
}
