use std::cmp::Ordering;

use bson::{Bson, Document};
use frames_query::{Sort, SortDirection};

use crate::filter::path_values;

/// Compare two values of the same type bracket. Numbers compare across
/// int32/int64/double; anything else of mismatched type is incomparable.
pub(crate) fn partial_compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::Int32(a), Bson::Int32(b)) => Some(a.cmp(b)),
        (Bson::Int64(a), Bson::Int64(b)) => Some(a.cmp(b)),
        (Bson::Int32(a), Bson::Int64(b)) => Some(i64::from(*a).cmp(b)),
        (Bson::Int64(a), Bson::Int32(b)) => Some(a.cmp(&i64::from(*b))),
        (Bson::Double(a), Bson::Double(b)) => a.partial_cmp(b),
        (Bson::Double(a), Bson::Int64(b)) => a.partial_cmp(&(*b as f64)),
        (Bson::Double(a), Bson::Int32(b)) => a.partial_cmp(&f64::from(*b)),
        (Bson::Int64(a), Bson::Double(b)) => (*a as f64).partial_cmp(b),
        (Bson::Int32(a), Bson::Double(b)) => f64::from(*a).partial_cmp(b),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total ordering for sorting. Missing and null sort first; values of
/// incomparable types are treated as equal.
pub fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None | Some(Bson::Null), None | Some(Bson::Null)) => Ordering::Equal,
        (None | Some(Bson::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Bson::Null)) => Ordering::Greater,
        (Some(a), Some(b)) => partial_compare(a, b).unwrap_or(Ordering::Equal),
    }
}

/// Stable multi-key sort on dotted paths.
pub fn sort_documents(docs: &mut [Document], sorts: &[Sort]) {
    if sorts.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for sort in sorts {
            let a_field = path_values(a, &sort.field).into_iter().next();
            let b_field = path_values(b, &sort.field).into_iter().next();
            let ord = match sort.direction {
                SortDirection::Asc => compare_values(a_field, b_field),
                SortDirection::Desc => compare_values(a_field, b_field).reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn compare_basic() {
        assert_eq!(
            compare_values(Some(&Bson::Int32(10)), Some(&Bson::Int32(20))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&Bson::String("b".into())), Some(&Bson::String("a".into()))),
            Ordering::Greater
        );
        assert_eq!(compare_values(None, None), Ordering::Equal);
        assert_eq!(compare_values(None, Some(&Bson::Int32(1))), Ordering::Less);
    }

    #[test]
    fn compare_cross_int() {
        assert_eq!(
            compare_values(Some(&Bson::Int32(10)), Some(&Bson::Int64(10))),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(Some(&Bson::Double(9.5)), Some(&Bson::Int64(10))),
            Ordering::Less
        );
    }

    #[test]
    fn multi_key_sort() {
        let mut docs = vec![
            doc! { "breed": "b", "name": "Z" },
            doc! { "breed": "a", "name": "Y" },
            doc! { "breed": "b", "name": "X" },
            doc! { "name": "W" },
        ];
        sort_documents(&mut docs, &[Sort::asc("breed"), Sort::desc("name")]);
        let names: Vec<&str> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, vec!["W", "Y", "Z", "X"]);
    }
}
