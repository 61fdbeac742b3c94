use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    All,
    In,
    Nin,
    Exists,
    Size,
    Type,
    ElemMatch,
    Not,
}

impl Operator {
    /// The mongo-style key this operator renders as.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::All => "$all",
            Operator::In => "$in",
            Operator::Nin => "$nin",
            Operator::Exists => "$exists",
            Operator::Size => "$size",
            Operator::Type => "$type",
            Operator::ElemMatch => "$elemMatch",
            Operator::Not => "$not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
    Nor,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
            LogicalOp::Nor => "$nor",
        }
    }
}
