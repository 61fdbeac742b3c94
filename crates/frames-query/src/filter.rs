use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::operator::{LogicalOp, Operator};

/// Start point for building a condition against a dotted field path.
///
/// ```
/// use frames_query::Q;
///
/// let cond = Q::field("lair").dot("name").eq("Cave");
/// assert_eq!(bson::Document::from(cond), bson::doc! { "lair.name": "Cave" });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Q {
    path: String,
}

impl Q {
    pub fn field(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Extend the path by one segment.
    pub fn dot(mut self, name: &str) -> Self {
        self.path.push('.');
        self.path.push_str(name);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn condition(self, operator: Operator, value: Bson) -> Condition {
        Condition {
            path: self.path,
            operator,
            value,
        }
    }

    pub fn eq(self, value: impl Into<Bson>) -> Condition {
        self.condition(Operator::Eq, value.into())
    }

    pub fn ne(self, value: impl Into<Bson>) -> Condition {
        self.condition(Operator::Ne, value.into())
    }

    pub fn gt(self, value: impl Into<Bson>) -> Condition {
        self.condition(Operator::Gt, value.into())
    }

    pub fn gte(self, value: impl Into<Bson>) -> Condition {
        self.condition(Operator::Gte, value.into())
    }

    pub fn lt(self, value: impl Into<Bson>) -> Condition {
        self.condition(Operator::Lt, value.into())
    }

    pub fn lte(self, value: impl Into<Bson>) -> Condition {
        self.condition(Operator::Lte, value.into())
    }

    /// Matches arrays containing every one of `values`.
    pub fn all<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.condition(Operator::All, array(values))
    }

    pub fn is_in<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.condition(Operator::In, array(values))
    }

    /// Matches when the value is not in `values` or the field is missing.
    pub fn not_in<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.condition(Operator::Nin, array(values))
    }

    pub fn exists(self, exists: bool) -> Condition {
        self.condition(Operator::Exists, Bson::Boolean(exists))
    }

    pub fn size(self, len: i64) -> Condition {
        self.condition(Operator::Size, Bson::Int64(len))
    }

    pub fn type_of(self, bson_type: impl Into<Bson>) -> Condition {
        self.condition(Operator::Type, bson_type.into())
    }

    /// Matches arrays with at least one element satisfying every condition.
    pub fn elem_match<I, F>(self, conditions: I) -> Condition
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        let mut merged = Document::new();
        for condition in conditions {
            let rendered: Document = condition.into().into();
            deep_merge(&rendered, &mut merged);
        }
        self.condition(Operator::ElemMatch, Bson::Document(merged))
    }
}

fn array<I, V>(values: I) -> Bson
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    Bson::Array(values.into_iter().map(Into::into).collect())
}

/// A single `{path: {operator: value}}` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub path: String,
    pub operator: Operator,
    pub value: Bson,
}

impl Condition {
    /// Negate the condition. Documents missing the field also match.
    pub fn not(self) -> Condition {
        let mut inner = Document::new();
        inner.insert(self.operator.as_str(), self.value);
        Condition {
            path: self.path,
            operator: Operator::Not,
            value: Bson::Document(inner),
        }
    }
}

impl From<Condition> for Document {
    fn from(c: Condition) -> Self {
        let value = match c.operator {
            Operator::Eq => c.value,
            op => {
                let mut inner = Document::new();
                inner.insert(op.as_str(), c.value);
                Bson::Document(inner)
            }
        };
        let mut d = Document::new();
        d.insert(c.path, value);
        d
    }
}

/// Two or more filters joined by a logical operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub logical: LogicalOp,
    pub children: Vec<Filter>,
}

impl From<Group> for Document {
    fn from(g: Group) -> Self {
        let children: Vec<Bson> = g
            .children
            .into_iter()
            .map(|child| Bson::Document(child.into()))
            .collect();
        let mut d = Document::new();
        d.insert(g.logical.as_str(), children);
        d
    }
}

fn group<I, F>(logical: LogicalOp, filters: I) -> Group
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    Group {
        logical,
        children: filters.into_iter().map(Into::into).collect(),
    }
}

pub fn and<I, F>(filters: I) -> Group
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    group(LogicalOp::And, filters)
}

pub fn or<I, F>(filters: I) -> Group
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    group(LogicalOp::Or, filters)
}

pub fn nor<I, F>(filters: I) -> Group
where
    I: IntoIterator<Item = F>,
    F: Into<Filter>,
{
    group(LogicalOp::Nor, filters)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Condition(Condition),
    Group(Group),
    Document(Document),
}

impl From<Condition> for Filter {
    fn from(c: Condition) -> Self {
        Filter::Condition(c)
    }
}

impl From<Group> for Filter {
    fn from(g: Group) -> Self {
        Filter::Group(g)
    }
}

impl From<Document> for Filter {
    fn from(d: Document) -> Self {
        Filter::Document(d)
    }
}

impl From<Filter> for Document {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Condition(c) => c.into(),
            Filter::Group(g) => g.into(),
            Filter::Document(d) => d,
        }
    }
}

/// Deep merge `source` into `dest`.
///
/// Nested documents merge key by key; arrays present on both sides are
/// unioned (existing order kept, new items appended). Anything else in
/// `source` overwrites `dest`.
pub fn deep_merge(source: &Document, dest: &mut Document) {
    for (key, value) in source {
        match (value, dest.get_mut(key)) {
            (Bson::Document(src), Some(Bson::Document(dst))) => {
                deep_merge(src, dst);
                continue;
            }
            (Bson::Array(src), Some(Bson::Array(dst))) => {
                for item in src {
                    if !dst.contains(item) {
                        dst.push(item.clone());
                    }
                }
                continue;
            }
            _ => {}
        }
        dest.insert(key.clone(), value.clone());
    }
}
