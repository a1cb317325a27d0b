//! Dynamic `where<Column>[Operator][Or]` predicates
//!
//! Compatibility shim for callers that build predicate names at runtime, such
//! as `whereEmail`, `whereStatusNot`, `whereNameLikeOr` or `whereDeletedAtNull`.
//! The typed `where_*` methods are the primary API.

use crate::backends::DatabaseValue;
use crate::error::QueryError;
use crate::sql::to_snake_case;

use super::builder::QueryBuilder;
use super::predicate::Predicate;

/// Operator keyword recovered from a dynamic method name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicOperator {
    Equal,
    Not,
    Like,
    NotLike,
    In,
    NotIn,
    Null,
    NotNull,
    Between,
    NotBetween,
}

/// Decomposed dynamic method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicWhere {
    pub column: String,
    pub operator: DynamicOperator,
    pub or: bool,
}

// Longest keywords first so `NotNull` is not read as `Null`.
const SUFFIXES: &[(&str, DynamicOperator)] = &[
    ("NotBetween", DynamicOperator::NotBetween),
    ("NotNull", DynamicOperator::NotNull),
    ("NotLike", DynamicOperator::NotLike),
    ("Between", DynamicOperator::Between),
    ("NotIn", DynamicOperator::NotIn),
    ("Null", DynamicOperator::Null),
    ("Like", DynamicOperator::Like),
    ("Not", DynamicOperator::Not),
    ("In", DynamicOperator::In),
];

impl DynamicWhere {
    /// Split a method name such as `whereEmailLikeOr` into its parts
    pub fn parse(method: &str) -> Result<Self, QueryError> {
        let invalid = |reason: &str| QueryError::InvalidDynamicMethod(format!("{}: {}", method, reason));

        let rest = method
            .strip_prefix("where")
            .ok_or_else(|| invalid("must start with 'where'"))?;

        let (rest, or) = match rest.strip_suffix("Or") {
            Some(stripped) if !stripped.is_empty() => (stripped, true),
            _ => (rest, false),
        };

        let (column, operator) = SUFFIXES
            .iter()
            .find_map(|(suffix, op)| {
                rest.strip_suffix(suffix)
                    .filter(|column| !column.is_empty())
                    .map(|column| (column, *op))
            })
            .unwrap_or((rest, DynamicOperator::Equal));

        if !column.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(invalid("column must be written in PascalCase"));
        }
        if !column.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("column may only contain letters and digits"));
        }

        Ok(Self {
            column: to_snake_case(column),
            operator,
            or,
        })
    }

    /// Build the predicate for `args`, checking the argument count
    pub fn to_predicate(&self, method: &str, args: Vec<DatabaseValue>) -> Result<Predicate, QueryError> {
        let arity_error = |expected: &str| {
            QueryError::InvalidDynamicMethod(format!(
                "{} expects {}, got {} argument(s)",
                method,
                expected,
                args.len()
            ))
        };

        let column = self.column.as_str();
        let predicate = match self.operator {
            DynamicOperator::Null | DynamicOperator::NotNull => {
                if !args.is_empty() {
                    return Err(arity_error("no arguments"));
                }
                if self.operator == DynamicOperator::Null {
                    Predicate::null(column)
                } else {
                    Predicate::not_null(column)
                }
            }
            DynamicOperator::Between | DynamicOperator::NotBetween => {
                let [low, high]: [DatabaseValue; 2] = args
                    .clone()
                    .try_into()
                    .map_err(|_| arity_error("two arguments"))?;
                if self.operator == DynamicOperator::Between {
                    Predicate::between(column, low, high)
                } else {
                    Predicate::not_between(column, low, high)
                }
            }
            DynamicOperator::In | DynamicOperator::NotIn => {
                if args.is_empty() {
                    return Err(arity_error("at least one argument"));
                }
                if self.operator == DynamicOperator::In {
                    Predicate::is_in(column, args.clone())
                } else {
                    Predicate::not_in(column, args.clone())
                }
            }
            DynamicOperator::Equal
            | DynamicOperator::Not
            | DynamicOperator::Like
            | DynamicOperator::NotLike => {
                let [value]: [DatabaseValue; 1] = args
                    .clone()
                    .try_into()
                    .map_err(|_| arity_error("one argument"))?;
                match self.operator {
                    DynamicOperator::Not => Predicate::ne(column, value),
                    DynamicOperator::Like => Predicate::like(column, value),
                    DynamicOperator::NotLike => Predicate::like(column, value).negate(),
                    _ => Predicate::eq(column, value),
                }
            }
        };

        Ok(if self.or { predicate.or() } else { predicate })
    }
}

impl<M> QueryBuilder<M> {
    /// Apply a dynamic predicate method by name, e.g. `where_dynamic("whereRoleIn", args)`
    pub fn where_dynamic(self, method: &str, args: Vec<DatabaseValue>) -> Result<Self, QueryError> {
        let parsed = DynamicWhere::parse(method)?;
        let predicate = parsed.to_predicate(method, args)?;
        Ok(self.filter(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryBuilder;

    #[test]
    fn test_parse_plain_equality() {
        let parsed = DynamicWhere::parse("whereEmail").unwrap();
        assert_eq!(parsed.column, "email");
        assert_eq!(parsed.operator, DynamicOperator::Equal);
        assert!(!parsed.or);
    }

    #[test]
    fn test_parse_operator_and_or_suffix() {
        let parsed = DynamicWhere::parse("whereDeletedAtNotNullOr").unwrap();
        assert_eq!(parsed.column, "deleted_at");
        assert_eq!(parsed.operator, DynamicOperator::NotNull);
        assert!(parsed.or);

        let parsed = DynamicWhere::parse("whereSortOrderBetween").unwrap();
        assert_eq!(parsed.column, "sort_order");
        assert_eq!(parsed.operator, DynamicOperator::Between);
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        assert!(DynamicWhere::parse("findEmail").is_err());
        assert!(DynamicWhere::parse("where").is_err());
        assert!(DynamicWhere::parse("whereemail").is_err());
    }

    #[test]
    fn test_dynamic_predicates_compile() {
        let query = QueryBuilder::table("users")
            .where_dynamic("whereRoleIn", vec!["admin".into(), "owner".into()])
            .unwrap()
            .where_dynamic("whereNameLikeOr", vec!["%ann%".into()])
            .unwrap()
            .where_dynamic("whereStatusNot", vec!["banned".into()])
            .unwrap();

        assert_eq!(
            query.to_sql(),
            "SELECT * FROM users WHERE role IN (?, ?) OR name LIKE ? AND status != ?"
        );
        assert_eq!(query.bindings().len(), 4);
    }

    #[test]
    fn test_argument_count_is_checked() {
        let err = QueryBuilder::table("users")
            .where_dynamic("whereAgeBetween", vec![1.into()])
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidDynamicMethod(_)));

        assert!(QueryBuilder::table("users")
            .where_dynamic("whereDeletedAtNull", vec![1.into()])
            .is_err());
    }
}
