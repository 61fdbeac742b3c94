mod filter;
mod operator;
mod query;
mod sort;

pub use filter::{Condition, Filter, Group, Q, and, deep_merge, nor, or};
pub use operator::{LogicalOp, Operator};
pub use query::FindOptions;
pub use sort::{Sort, SortDirection, sort_by};
