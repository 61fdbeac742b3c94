use bson::{Bson, Document};
use regex::Regex;

use crate::error::StoreError;
use crate::sort::partial_compare;

/// A parsed filter document.
///
/// `$ne` and `$nin` parse to `Not(Eq)` / `Not(In)` so that documents
/// missing the field match, as they do in mongo.
#[derive(Debug, Clone)]
pub enum Expression {
    // Logical
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Nor(Vec<Expression>),
    Not(Box<Expression>),
    // Comparison
    Eq(String, Bson),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    // Sets
    In(String, Vec<Bson>),
    All(String, Vec<Bson>),
    // Shape
    Exists(String, bool),
    Size(String, usize),
    Type(String, Vec<&'static str>),
    Regex(String, Regex),
    ElemMatch(String, Box<Expression>),
}

impl Expression {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Expression::And(children) => children.iter().all(|c| c.matches(doc)),
            Expression::Or(children) => children.iter().any(|c| c.matches(doc)),
            Expression::Nor(children) => !children.iter().any(|c| c.matches(doc)),
            Expression::Not(inner) => !inner.matches(doc),
            Expression::Eq(field, Bson::Null) => {
                // null matches both missing fields and explicit null values
                path_values(doc, field).is_empty()
                    || any_value(doc, field, |v| matches!(v, Bson::Null))
            }
            Expression::Eq(field, val) => any_value(doc, field, |v| value_eq(v, val)),
            Expression::Gt(field, val) => any_value(doc, field, |v| {
                partial_compare(v, val).is_some_and(|o| o.is_gt())
            }),
            Expression::Gte(field, val) => any_value(doc, field, |v| {
                partial_compare(v, val).is_some_and(|o| o.is_ge())
            }),
            Expression::Lt(field, val) => any_value(doc, field, |v| {
                partial_compare(v, val).is_some_and(|o| o.is_lt())
            }),
            Expression::Lte(field, val) => any_value(doc, field, |v| {
                partial_compare(v, val).is_some_and(|o| o.is_le())
            }),
            Expression::In(field, vals) => {
                if vals.iter().any(|v| matches!(v, Bson::Null))
                    && path_values(doc, field).is_empty()
                {
                    return true;
                }
                any_value(doc, field, |v| vals.iter().any(|q| value_eq(v, q)))
            }
            Expression::All(field, vals) => {
                !vals.is_empty()
                    && vals
                        .iter()
                        .all(|q| any_value(doc, field, |v| value_eq(v, q)))
            }
            Expression::Exists(field, expected) => {
                // presence is physical: an explicit null still exists
                !path_values(doc, field).is_empty() == *expected
            }
            Expression::Size(field, len) => path_values(doc, field)
                .into_iter()
                .any(|v| matches!(v, Bson::Array(items) if items.len() == *len)),
            Expression::Type(field, aliases) => any_value(doc, field, |v| {
                let alias = type_alias(v);
                aliases
                    .iter()
                    .any(|a| *a == alias || (*a == "number" && is_number(v)))
            }),
            Expression::Regex(field, re) => {
                any_value(doc, field, |v| matches!(v, Bson::String(s) if re.is_match(s)))
            }
            Expression::ElemMatch(field, inner) => {
                path_values(doc, field).into_iter().any(|v| match v {
                    Bson::Array(items) => items.iter().any(|item| match item {
                        Bson::Document(d) => inner.matches(d),
                        _ => false,
                    }),
                    _ => false,
                })
            }
        }
    }
}

/// Every value reachable at a dotted `path`, descending into arrays of
/// documents along the way. Missing segments contribute nothing.
pub(crate) fn path_values<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((first, rest)) = segments.split_first()
        && let Some(value) = doc.get(*first)
    {
        collect_values(value, rest, &mut out);
    }
    out
}

fn collect_values<'a>(value: &'a Bson, segments: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((first, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(d) => {
            if let Some(child) = d.get(*first) {
                collect_values(child, rest, out);
            }
        }
        Bson::Array(items) => {
            for item in items {
                if let Bson::Document(d) = item
                    && let Some(child) = d.get(*first)
                {
                    collect_values(child, rest, out);
                }
            }
        }
        _ => {}
    }
}

/// Apply `pred` to each value at `field`, and to the elements of any
/// array value found there.
fn any_value(doc: &Document, field: &str, pred: impl Fn(&Bson) -> bool) -> bool {
    path_values(doc, field).into_iter().any(|v| match v {
        Bson::Array(items) => pred(v) || items.iter().any(&pred),
        _ => pred(v),
    })
}

fn is_number(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

fn value_eq(stored: &Bson, query: &Bson) -> bool {
    if is_number(stored) && is_number(query) {
        return partial_compare(stored, query).is_some_and(|o| o.is_eq());
    }
    stored == query
}

fn type_alias(v: &Bson) -> &'static str {
    match v {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "date",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::Int32(_) => "int",
        Bson::Timestamp(_) => "timestamp",
        Bson::Int64(_) => "long",
        Bson::Decimal128(_) => "decimal",
        _ => "other",
    }
}

fn alias_for_code(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "double",
        2 => "string",
        3 => "object",
        4 => "array",
        5 => "binData",
        7 => "objectId",
        8 => "bool",
        9 => "date",
        10 => "null",
        11 => "regex",
        16 => "int",
        17 => "timestamp",
        18 => "long",
        19 => "decimal",
        _ => return None,
    })
}

const ALIASES: &[&str] = &[
    "double",
    "string",
    "object",
    "array",
    "binData",
    "objectId",
    "bool",
    "date",
    "null",
    "regex",
    "int",
    "timestamp",
    "long",
    "decimal",
    "number",
];

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidFilter(msg.into())
}

/// Parse a mongo-style filter document into an [`Expression`].
///
/// The top-level document is an implicit AND of its entries; an empty
/// document matches everything.
pub fn parse_filter(doc: &Document) -> Result<Expression, StoreError> {
    let mut children = Vec::new();

    for (key, value) in doc {
        match key.as_str() {
            "$and" => children.push(Expression::And(parse_logical_array(key, value)?)),
            "$or" => children.push(Expression::Or(parse_logical_array(key, value)?)),
            "$nor" => children.push(Expression::Nor(parse_logical_array(key, value)?)),
            k if k.starts_with('$') => {
                return Err(invalid(format!("unknown top-level operator: {k}")));
            }
            _ => children.push(parse_field_condition(key, value)?),
        }
    }

    Ok(match children.len() {
        1 => children.remove(0),
        _ => Expression::And(children),
    })
}

fn parse_logical_array(op: &str, value: &Bson) -> Result<Vec<Expression>, StoreError> {
    let Bson::Array(items) = value else {
        return Err(invalid(format!("{op} value must be an array")));
    };
    if items.is_empty() {
        return Err(invalid(format!("{op} array must not be empty")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_filter(d),
            _ => Err(invalid(format!("{op} array elements must be documents"))),
        })
        .collect()
}

/// Either implicit `$eq` or an operator sub-document.
fn parse_field_condition(field: &str, value: &Bson) -> Result<Expression, StoreError> {
    if let Bson::Document(ops) = value
        && ops.keys().next().is_some_and(|k| k.starts_with('$'))
    {
        return parse_operator_doc(field, ops);
    }
    Ok(Expression::Eq(field.to_string(), value.clone()))
}

/// Parse an operator sub-document like `{ "$gt": 21, "$lte": 100 }`.
fn parse_operator_doc(field: &str, ops: &Document) -> Result<Expression, StoreError> {
    if let Some(pattern) = ops.get("$regex") {
        return parse_regex(field, pattern, ops.get("$options"));
    }

    let mut conditions = Vec::with_capacity(ops.len());
    for (op, value) in ops {
        let f = field.to_string();
        let expr = match op.as_str() {
            "$eq" => Expression::Eq(f, value.clone()),
            "$ne" => Expression::Not(Box::new(Expression::Eq(f, value.clone()))),
            "$gt" => Expression::Gt(f, value.clone()),
            "$gte" => Expression::Gte(f, value.clone()),
            "$lt" => Expression::Lt(f, value.clone()),
            "$lte" => Expression::Lte(f, value.clone()),
            "$in" => Expression::In(f, array_operand(op, value)?),
            "$nin" => Expression::Not(Box::new(Expression::In(f, array_operand(op, value)?))),
            "$all" => Expression::All(f, array_operand(op, value)?),
            "$exists" => Expression::Exists(f, truthy(value)),
            "$size" => Expression::Size(f, size_operand(value)?),
            "$type" => Expression::Type(f, type_operand(value)?),
            "$elemMatch" => match value {
                Bson::Document(d) => Expression::ElemMatch(f, Box::new(parse_filter(d)?)),
                _ => return Err(invalid("$elemMatch value must be a document")),
            },
            "$not" => match value {
                Bson::Document(d) => Expression::Not(Box::new(parse_operator_doc(field, d)?)),
                _ => return Err(invalid("$not value must be an operator document")),
            },
            "$options" => return Err(invalid("$options without $regex")),
            k => return Err(invalid(format!("unknown field operator: {k}"))),
        };
        conditions.push(expr);
    }

    match conditions.len() {
        0 => Err(invalid("empty operator document")),
        1 => Ok(conditions.remove(0)),
        _ => Ok(Expression::And(conditions)),
    }
}

fn parse_regex(
    field: &str,
    pattern: &Bson,
    options: Option<&Bson>,
) -> Result<Expression, StoreError> {
    let Bson::String(pattern) = pattern else {
        return Err(invalid("$regex value must be a string"));
    };
    let flags: String = match options {
        None => String::new(),
        Some(Bson::String(opts)) => opts.chars().filter(|c| "imsx".contains(*c)).collect(),
        Some(_) => return Err(invalid("$options value must be a string")),
    };
    let source = if flags.is_empty() {
        pattern.clone()
    } else {
        format!("(?{flags}){pattern}")
    };
    let re = Regex::new(&source).map_err(|e| invalid(format!("bad $regex: {e}")))?;
    Ok(Expression::Regex(field.to_string(), re))
}

fn array_operand(op: &str, value: &Bson) -> Result<Vec<Bson>, StoreError> {
    match value {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(invalid(format!("{op} value must be an array"))),
    }
}

pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

fn size_operand(value: &Bson) -> Result<usize, StoreError> {
    let len = match value {
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        _ => return Err(invalid("$size value must be an integer")),
    };
    usize::try_from(len).map_err(|_| invalid("$size value must not be negative"))
}

fn type_operand(value: &Bson) -> Result<Vec<&'static str>, StoreError> {
    let one = |v: &Bson| -> Result<&'static str, StoreError> {
        match v {
            Bson::String(s) => ALIASES
                .iter()
                .find(|a| **a == s.as_str())
                .copied()
                .ok_or_else(|| invalid(format!("unknown $type alias: {s}"))),
            Bson::Int32(code) => alias_for_code(i64::from(*code))
                .ok_or_else(|| invalid(format!("unknown $type code: {code}"))),
            Bson::Int64(code) => {
                alias_for_code(*code).ok_or_else(|| invalid(format!("unknown $type code: {code}")))
            }
            _ => Err(invalid("$type value must be a string or number")),
        }
    };
    match value {
        Bson::Array(items) => items.iter().map(one).collect(),
        v => Ok(vec![one(v)?]),
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn check(filter: Document, doc: Document) -> bool {
        parse_filter(&filter).unwrap().matches(&doc)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(check(doc! {}, doc! { "name": "Burt" }));
    }

    #[test]
    fn implicit_eq() {
        assert!(check(doc! { "name": "Burt" }, doc! { "name": "Burt" }));
        assert!(!check(doc! { "name": "Burt" }, doc! { "name": "Fred" }));
    }

    #[test]
    fn eq_matches_array_element() {
        let doc = doc! { "traits": ["irritable", "narcissistic"] };
        assert!(check(doc! { "traits": "irritable" }, doc.clone()));
        assert!(!check(doc! { "traits": "calm" }, doc));
    }

    #[test]
    fn eq_null_matches_missing() {
        assert!(check(doc! { "lair": null }, doc! { "name": "Burt" }));
        assert!(check(doc! { "lair": null }, doc! { "lair": null }));
        assert!(!check(doc! { "lair": null }, doc! { "lair": 1 }));
    }

    #[test]
    fn numeric_comparison_crosses_types() {
        let doc = doc! { "gold": 1000_i64 };
        assert!(check(doc! { "gold": { "$gt": 999 } }, doc.clone()));
        assert!(check(doc! { "gold": { "$lte": 1000.0 } }, doc.clone()));
        assert!(check(doc! { "gold": 1000 }, doc));
    }

    #[test]
    fn in_and_nin() {
        let doc = doc! { "_id": 2 };
        assert!(check(doc! { "_id": { "$in": [1, 2, 3] } }, doc.clone()));
        assert!(!check(doc! { "_id": { "$nin": [1, 2, 3] } }, doc.clone()));
        assert!(check(doc! { "missing": { "$nin": [1] } }, doc));
    }

    #[test]
    fn ne_matches_missing_field() {
        assert!(check(doc! { "breed": { "$ne": "Wyvern" } }, doc! { "name": "Burt" }));
    }

    #[test]
    fn dotted_path_through_array_of_documents() {
        let doc = doc! { "items": [ { "gold": 1 }, { "gold": 50 } ] };
        assert!(check(doc! { "items.gold": 50 }, doc.clone()));
        assert!(check(doc! { "items.gold": { "$gt": 10 } }, doc.clone()));
        assert!(!check(doc! { "items.gold": { "$gt": 100 } }, doc));
    }

    #[test]
    fn elem_match_requires_single_element() {
        let doc = doc! { "items": [ { "gold": 1, "kind": "coin" }, { "gold": 50, "kind": "gem" } ] };
        assert!(check(
            doc! { "items": { "$elemMatch": { "gold": { "$gt": 10 }, "kind": "gem" } } },
            doc.clone()
        ));
        assert!(!check(
            doc! { "items": { "$elemMatch": { "gold": { "$gt": 10 }, "kind": "coin" } } },
            doc
        ));
    }

    #[test]
    fn all_size_exists_type() {
        let doc = doc! { "traits": ["a", "b"], "name": "Burt", "lair": null };
        assert!(check(doc! { "traits": { "$all": ["b", "a"] } }, doc.clone()));
        assert!(check(doc! { "traits": { "$size": 2 } }, doc.clone()));
        assert!(check(doc! { "lair": { "$exists": true } }, doc.clone()));
        assert!(check(doc! { "dob": { "$exists": false } }, doc.clone()));
        assert!(check(doc! { "name": { "$type": "string" } }, doc));
    }

    #[test]
    fn regex_with_options() {
        let doc = doc! { "name": "Burt" };
        assert!(check(doc! { "name": { "$regex": "^bu", "$options": "i" } }, doc.clone()));
        assert!(!check(doc! { "name": { "$regex": "^bu" } }, doc));
    }

    #[test]
    fn logical_groups() {
        let doc = doc! { "name": "Burt", "breed": "Cold-drake" };
        assert!(check(doc! { "$or": [ { "name": "Fred" }, { "breed": "Cold-drake" } ] }, doc.clone()));
        assert!(!check(doc! { "$nor": [ { "name": "Burt" } ] }, doc.clone()));
        assert!(check(doc! { "name": { "$not": { "$eq": "Fred" } } }, doc));
    }

    #[test]
    fn rejects_unknown_operators() {
        assert!(parse_filter(&doc! { "$where": "1" }).is_err());
        assert!(parse_filter(&doc! { "name": { "$near": 1 } }).is_err());
        assert!(parse_filter(&doc! { "name": { "$options": "i" } }).is_err());
    }
}
