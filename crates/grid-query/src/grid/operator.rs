//! Filter discriminants parsed from their wire tags.

use crate::error::{GridError, GridResult};

/// Leaf filter kind (`filterType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Set,
    Text,
    Number,
    Date,
}

impl FilterKind {
    pub fn from_tag(tag: &str) -> GridResult<Self> {
        match tag {
            "set" => Ok(FilterKind::Set),
            "text" => Ok(FilterKind::Text),
            "number" => Ok(FilterKind::Number),
            "date" => Ok(FilterKind::Date),
            other => Err(GridError::UnknownFilterType(format!("filterType '{other}'"))),
        }
    }
}

/// Combinator operator; matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn from_tag(tag: &str) -> GridResult<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "and" => Ok(BoolOperator::And),
            "or" => Ok(BoolOperator::Or),
            _ => Err(GridError::UnknownFilterType(format!(
                "combinator operator '{tag}'"
            ))),
        }
    }
}

/// Text filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperator {
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
}

impl TextOperator {
    pub fn from_tag(tag: &str) -> GridResult<Self> {
        match tag {
            "equals" => Ok(TextOperator::Equals),
            "notEqual" => Ok(TextOperator::NotEqual),
            "contains" => Ok(TextOperator::Contains),
            "notContains" => Ok(TextOperator::NotContains),
            "startsWith" => Ok(TextOperator::StartsWith),
            "endsWith" => Ok(TextOperator::EndsWith),
            "blank" => Ok(TextOperator::Blank),
            "notBlank" => Ok(TextOperator::NotBlank),
            other => Err(unknown_operator("text", other)),
        }
    }
}

/// Number filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOperator {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    InRange,
    Blank,
    NotBlank,
}

impl NumberOperator {
    pub fn from_tag(tag: &str) -> GridResult<Self> {
        match tag {
            "equals" => Ok(NumberOperator::Equals),
            "notEqual" => Ok(NumberOperator::NotEqual),
            "greaterThan" => Ok(NumberOperator::GreaterThan),
            "greaterThanOrEqual" => Ok(NumberOperator::GreaterThanOrEqual),
            "lessThan" => Ok(NumberOperator::LessThan),
            "lessThanOrEqual" => Ok(NumberOperator::LessThanOrEqual),
            "inRange" => Ok(NumberOperator::InRange),
            "blank" => Ok(NumberOperator::Blank),
            "notBlank" => Ok(NumberOperator::NotBlank),
            other => Err(unknown_operator("number", other)),
        }
    }
}

/// Date filter operators.
///
/// `GreaterThan` and `LessThan` are inclusive at day granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOperator {
    Equals,
    NotEqual,
    GreaterThan,
    LessThan,
    InRange,
    Blank,
    NotBlank,
}

impl DateOperator {
    pub fn from_tag(tag: &str) -> GridResult<Self> {
        match tag {
            "equals" => Ok(DateOperator::Equals),
            "notEqual" => Ok(DateOperator::NotEqual),
            "greaterThan" => Ok(DateOperator::GreaterThan),
            "lessThan" => Ok(DateOperator::LessThan),
            "inRange" => Ok(DateOperator::InRange),
            "blank" => Ok(DateOperator::Blank),
            "notBlank" => Ok(DateOperator::NotBlank),
            other => Err(unknown_operator("date", other)),
        }
    }
}

fn unknown_operator(kind: &str, tag: &str) -> GridError {
    GridError::UnknownFilterType(format!("{kind} filter type '{tag}'"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn filter_kinds() {
        assert_eq!(FilterKind::from_tag("set").unwrap(), FilterKind::Set);
        assert_eq!(FilterKind::from_tag("date").unwrap(), FilterKind::Date);
        assert!(matches!(
            FilterKind::from_tag("boolean"),
            Err(GridError::UnknownFilterType(_))
        ));
    }

    #[test]
    fn combinator_operator_is_case_insensitive() {
        assert_eq!(BoolOperator::from_tag("AND").unwrap(), BoolOperator::And);
        assert_eq!(BoolOperator::from_tag("Or").unwrap(), BoolOperator::Or);
        assert!(BoolOperator::from_tag("xor").is_err());
    }

    #[test]
    fn operator_tags_are_case_sensitive() {
        assert_eq!(
            TextOperator::from_tag("notContains").unwrap(),
            TextOperator::NotContains
        );
        assert!(TextOperator::from_tag("NOTCONTAINS").is_err());
        assert_eq!(
            NumberOperator::from_tag("greaterThanOrEqual").unwrap(),
            NumberOperator::GreaterThanOrEqual
        );
    }

    #[test]
    fn date_has_no_or_equal_variants() {
        assert!(DateOperator::from_tag("greaterThanOrEqual").is_err());
        assert_eq!(
            DateOperator::from_tag("inRange").unwrap(),
            DateOperator::InRange
        );
    }
}
