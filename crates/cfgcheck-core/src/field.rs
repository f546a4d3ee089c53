//! # Extraction Fields
//!
//! Views over `params.fields` of extraction tasks and the small type
//! language used in each field's `type`.
//!
//! `TypeExpr` is parsed from text over `str | int | float | bool | Any`
//! and one level of `Optional[T]` / `List[T]` around a base type. The
//! string is never evaluated.

use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::error::TypeExprError;

/// Parsed field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// `str`
    Str,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `Any`
    Any,
    /// `Optional[T]`
    Optional(Box<TypeExpr>),
    /// `List[T]`
    List(Box<TypeExpr>),
}

impl TypeExpr {
    /// True for `int`, `float`, and optional forms of them.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Int | Self::Float => true,
            Self::Optional(inner) => inner.is_numeric(),
            _ => false,
        }
    }

    fn parse_inner(expr: &str, whole: &str, allow_generic: bool) -> Result<Self, TypeExprError> {
        let expr = expr.trim();
        let fail = |reason: &str| TypeExprError {
            expr: whole.to_string(),
            reason: reason.to_string(),
        };
        match expr {
            "str" => return Ok(Self::Str),
            "int" => return Ok(Self::Int),
            "float" => return Ok(Self::Float),
            "bool" => return Ok(Self::Bool),
            "Any" => return Ok(Self::Any),
            "" => return Err(fail("empty type")),
            _ => {}
        }
        let Some(open) = expr.find('[').filter(|_| allow_generic) else {
            return Err(fail("expected str, int, float, bool, Any, Optional[T] or List[T]"));
        };
        let Some(body) = expr.strip_suffix(']') else {
            return Err(fail("missing closing bracket"));
        };
        let inner = Self::parse_inner(&body[open + 1..], whole, false)?;
        match expr[..open].trim() {
            "Optional" => Ok(Self::Optional(Box::new(inner))),
            "List" => Ok(Self::List(Box::new(inner))),
            other => Err(fail(&format!("unknown generic {other:?}"))),
        }
    }
}

impl FromStr for TypeExpr {
    type Err = TypeExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_inner(s, s, true)
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str => f.write_str("str"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("bool"),
            Self::Any => f.write_str("Any"),
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::List(inner) => write!(f, "List[{inner}]"),
        }
    }
}

/// Borrowed view of one extraction field spec.
#[derive(Debug, Clone)]
pub struct ExtractionField<'a> {
    /// Key under `fields`; the token name other tasks use.
    pub key: &'a str,
    /// `alias`, when it is a string.
    pub alias: Option<&'a str>,
    /// Parsed `type`, when present and valid.
    pub type_expr: Option<TypeExpr>,
    /// `is_table: true`.
    pub is_table: bool,
    /// Sub-fields of a table field.
    pub item_fields: Vec<ExtractionField<'a>>,
}

impl<'a> ExtractionField<'a> {
    fn from_spec(key: &'a str, spec: &'a Mapping, depth: usize) -> Self {
        let item_fields = match spec.get("item_fields").and_then(Value::as_mapping) {
            Some(items) if depth == 0 => collect(items, depth + 1),
            _ => Vec::new(),
        };
        Self {
            key,
            alias: spec.get("alias").and_then(Value::as_str),
            type_expr: spec
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| t.parse().ok()),
            is_table: spec.get("is_table").and_then(Value::as_bool).unwrap_or(false),
            item_fields,
        }
    }
}

fn collect(fields: &Mapping, depth: usize) -> Vec<ExtractionField<'_>> {
    fields
        .iter()
        .filter_map(|(key, spec)| {
            Some(ExtractionField::from_spec(
                key.as_str()?,
                spec.as_mapping()?,
                depth,
            ))
        })
        .collect()
}

/// Fields declared under `params.fields` of an extraction task.
pub fn extraction_fields(params: &Mapping) -> Vec<ExtractionField<'_>> {
    params
        .get("fields")
        .and_then(Value::as_mapping)
        .map(|fields| collect(fields, 0))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_and_generic_types() {
        assert_eq!("str".parse::<TypeExpr>().unwrap(), TypeExpr::Str);
        assert_eq!(
            "Optional[ float ]".parse::<TypeExpr>().unwrap(),
            TypeExpr::Optional(Box::new(TypeExpr::Float))
        );
        assert_eq!(
            "List[Any]".parse::<TypeExpr>().unwrap(),
            TypeExpr::List(Box::new(TypeExpr::Any))
        );
    }

    #[test]
    fn rejects_unsupported_types() {
        for bad in [
            "string",
            "Dict[str]",
            "List[str",
            "List[]",
            "Optional[List[str]]",
            "",
            "__import__('os')",
        ] {
            assert!(bad.parse::<TypeExpr>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn numeric_detection_sees_through_optional() {
        assert!(TypeExpr::Int.is_numeric());
        assert!("Optional[float]".parse::<TypeExpr>().unwrap().is_numeric());
        assert!(!"List[int]".parse::<TypeExpr>().unwrap().is_numeric());
    }

    #[test]
    fn reads_fields_and_one_level_of_items() {
        let params: Mapping = serde_yaml::from_str(
            r#"
fields:
  supplier_name: {alias: Supplier, type: str}
  line_items:
    alias: Items
    type: List[Any]
    is_table: true
    item_fields:
      amount: {alias: Amount, type: float}
  broken: 3
"#,
        )
        .unwrap();
        let fields = extraction_fields(&params);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].key, "supplier_name");
        assert!(!fields[0].is_table);
        assert!(fields[1].is_table);
        assert_eq!(fields[1].item_fields[0].key, "amount");
        assert_eq!(fields[1].item_fields[0].type_expr, Some(TypeExpr::Float));
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        fn type_expr() -> impl Strategy<Value = TypeExpr> {
            let leaf = prop_oneof![
                Just(TypeExpr::Str),
                Just(TypeExpr::Int),
                Just(TypeExpr::Float),
                Just(TypeExpr::Bool),
                Just(TypeExpr::Any),
            ];
            prop_oneof![
                leaf.clone(),
                leaf.clone().prop_map(|t| TypeExpr::Optional(Box::new(t))),
                leaf.prop_map(|t| TypeExpr::List(Box::new(t))),
            ]
        }

        proptest! {
            #[test]
            fn display_parses_back(expr in type_expr()) {
                let text = expr.to_string();
                prop_assert_eq!(text.parse::<TypeExpr>().unwrap(), expr);
            }

            #[test]
            fn parser_never_panics(text in "\\PC{0,24}") {
                let _ = text.parse::<TypeExpr>();
            }
        }
    }
}
