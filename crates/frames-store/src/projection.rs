use std::collections::HashMap;

use bson::{Bson, Document};

use crate::error::StoreError;
use crate::filter::truthy;

/// A parsed projection document.
///
/// Any truthy flag on a field other than `_id` puts the projection in
/// inclusion mode; otherwise it excludes the falsy fields and returns the
/// rest. `_id` is returned unless explicitly excluded. `{f: {$slice: ..}}`
/// trims an array field without affecting the mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    tree: HashMap<String, FieldTree>,
    inclusive: bool,
}

/// A tree of dot-notation projection paths.
///
/// Given `{"lair.name": 1, "lair.inventory": 1, "name": 1}`, builds:
/// ```text
/// { "lair": Branch({ "name": Leaf(Include), "inventory": Leaf(Include) }),
///   "name": Leaf(Include) }
/// ```
#[derive(Debug, Clone, PartialEq)]
enum FieldTree {
    Leaf(Rule),
    Branch(HashMap<String, FieldTree>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Rule {
    Include,
    Exclude,
    /// Negative `skip` counts from the end of the array.
    Slice { skip: i64, limit: Option<i64> },
}

impl Projection {
    pub fn parse(doc: &Document) -> Result<Self, StoreError> {
        let mut tree = HashMap::new();
        let mut inclusive = false;
        for (path, value) in doc {
            let rule = match value {
                Bson::Document(ops) => parse_operator(path, ops)?,
                v if truthy(v) => Rule::Include,
                _ => Rule::Exclude,
            };
            if rule == Rule::Include && path != "_id" {
                inclusive = true;
            }
            insert_path(&mut tree, path, rule);
        }
        Ok(Self { tree, inclusive })
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn apply(&self, doc: &Document) -> Document {
        project(doc, &self.tree, self.inclusive, true)
    }
}

fn parse_operator(path: &str, ops: &Document) -> Result<Rule, StoreError> {
    let mut rule = None;
    for (op, value) in ops {
        rule = Some(match (op.as_str(), value) {
            ("$slice", Bson::Int32(n)) => slice_of(i64::from(*n)),
            ("$slice", Bson::Int64(n)) => slice_of(*n),
            ("$slice", Bson::Array(pair)) => match pair.as_slice() {
                [skip, limit] => Rule::Slice {
                    skip: as_i64(skip)?,
                    limit: Some(as_i64(limit)?.max(0)),
                },
                _ => {
                    return Err(StoreError::InvalidProjection(format!(
                        "{path}: $slice array must be [skip, limit]"
                    )));
                }
            },
            (op, _) => {
                return Err(StoreError::InvalidProjection(format!(
                    "{path}: unsupported projection operator {op}"
                )));
            }
        });
    }
    rule.ok_or_else(|| StoreError::InvalidProjection(format!("{path}: empty operator document")))
}

fn slice_of(n: i64) -> Rule {
    if n >= 0 {
        Rule::Slice {
            skip: 0,
            limit: Some(n),
        }
    } else {
        Rule::Slice {
            skip: n,
            limit: None,
        }
    }
}

fn as_i64(v: &Bson) -> Result<i64, StoreError> {
    match v {
        Bson::Int32(n) => Ok(i64::from(*n)),
        Bson::Int64(n) => Ok(*n),
        _ => Err(StoreError::InvalidProjection(
            "$slice bounds must be integers".into(),
        )),
    }
}

fn insert_path(map: &mut HashMap<String, FieldTree>, remaining: &str, rule: Rule) {
    match remaining.split_once('.') {
        None => {
            // Leaf takes the whole field and overrides any existing Branch.
            map.insert(remaining.to_string(), FieldTree::Leaf(rule));
        }
        Some((top, rest)) => {
            let entry = map
                .entry(top.to_string())
                .or_insert_with(|| FieldTree::Branch(HashMap::new()));
            if let FieldTree::Branch(children) = entry {
                insert_path(children, rest, rule);
            }
        }
    }
}

fn project(src: &Document, tree: &HashMap<String, FieldTree>, inclusive: bool, top: bool) -> Document {
    let mut dest = Document::new();
    for (key, value) in src {
        match tree.get(key.as_str()) {
            Some(FieldTree::Leaf(Rule::Exclude)) => {}
            Some(FieldTree::Leaf(Rule::Include)) => {
                dest.insert(key.clone(), value.clone());
            }
            Some(FieldTree::Leaf(Rule::Slice { skip, limit })) => {
                dest.insert(key.clone(), slice(value, *skip, *limit));
            }
            Some(FieldTree::Branch(children)) => {
                let projected = match value {
                    Bson::Document(sub) => Bson::Document(project(sub, children, inclusive, false)),
                    Bson::Array(items) => Bson::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Bson::Document(sub) => {
                                    Bson::Document(project(sub, children, inclusive, false))
                                }
                                other => other.clone(),
                            })
                            .collect(),
                    ),
                    other => other.clone(),
                };
                dest.insert(key.clone(), projected);
            }
            None => {
                if !inclusive || (top && key == "_id") {
                    dest.insert(key.clone(), value.clone());
                }
            }
        }
    }
    dest
}

fn slice(value: &Bson, skip: i64, limit: Option<i64>) -> Bson {
    let Bson::Array(items) = value else {
        return value.clone();
    };
    let len = items.len() as i64;
    let start = if skip < 0 { (len + skip).max(0) } else { skip.min(len) };
    let end = match limit {
        Some(limit) => start.saturating_add(limit.clamp(0, len)).min(len),
        None => len,
    };
    Bson::Array(items[start as usize..end as usize].to_vec())
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn dragon() -> Document {
        doc! {
            "_id": 1,
            "name": "Burt",
            "breed": "Cold-drake",
            "traits": ["irritable", "narcissistic", "greedy"],
            "lair": { "name": "Cave", "inventory": { "gold": 1000 } },
        }
    }

    #[test]
    fn inclusion_keeps_id() {
        let p = Projection::parse(&doc! { "name": true }).unwrap();
        assert!(p.is_inclusive());
        assert_eq!(p.apply(&dragon()), doc! { "_id": 1, "name": "Burt" });
    }

    #[test]
    fn inclusion_can_drop_id() {
        let p = Projection::parse(&doc! { "name": 1, "_id": 0 }).unwrap();
        assert_eq!(p.apply(&dragon()), doc! { "name": "Burt" });
    }

    #[test]
    fn exclusion_mode() {
        let p = Projection::parse(&doc! { "traits": false, "lair": false }).unwrap();
        assert!(!p.is_inclusive());
        assert_eq!(
            p.apply(&dragon()),
            doc! { "_id": 1, "name": "Burt", "breed": "Cold-drake" }
        );
    }

    #[test]
    fn dotted_inclusion() {
        let p = Projection::parse(&doc! { "lair.inventory": true }).unwrap();
        assert_eq!(
            p.apply(&dragon()),
            doc! { "_id": 1, "lair": { "inventory": { "gold": 1000 } } }
        );
    }

    #[test]
    fn slice_first_and_last() {
        let p = Projection::parse(&doc! { "traits": { "$slice": 1 }, "name": true }).unwrap();
        assert_eq!(
            p.apply(&dragon()),
            doc! { "_id": 1, "name": "Burt", "traits": ["irritable"] }
        );

        let p = Projection::parse(&doc! { "traits": { "$slice": -2 } }).unwrap();
        let out = p.apply(&dragon());
        assert_eq!(out.get_array("traits").unwrap().len(), 2);
        assert_eq!(out.get_str("name").unwrap(), "Burt");
    }

    #[test]
    fn slice_skip_limit() {
        let p = Projection::parse(&doc! { "traits": { "$slice": [1, 5] } }).unwrap();
        let out = p.apply(&dragon());
        assert_eq!(
            out.get_array("traits").unwrap(),
            &vec![Bson::from("narcissistic"), Bson::from("greedy")]
        );
    }

    #[test]
    fn slice_with_huge_bounds_saturates() {
        let p = Projection::parse(&doc! { "traits": { "$slice": [1_i64, i64::MAX] } }).unwrap();
        assert_eq!(p.apply(&dragon()).get_array("traits").unwrap().len(), 2);

        let p = Projection::parse(&doc! { "traits": { "$slice": [i64::MIN, i64::MAX] } }).unwrap();
        assert_eq!(p.apply(&dragon()).get_array("traits").unwrap().len(), 3);

        let p = Projection::parse(&doc! { "traits": { "$slice": i64::MAX } }).unwrap();
        assert_eq!(p.apply(&dragon()).get_array("traits").unwrap().len(), 3);
    }

    #[test]
    fn unknown_operator_rejected() {
        assert!(Projection::parse(&doc! { "traits": { "$meta": "textScore" } }).is_err());
    }
}
