use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Build sort instructions from dotted paths. A trailing `.desc` segment
/// flips the direction for that path.
pub fn sort_by<I, S>(paths: I) -> Vec<Sort>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .map(|path| {
            let path = path.as_ref();
            match path.strip_suffix(".desc") {
                Some(field) => Sort::desc(field),
                None => Sort::asc(path),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desc_suffix_is_stripped() {
        let sorts = sort_by(["name", "dob.desc", "lair.name"]);
        assert_eq!(
            sorts,
            vec![Sort::asc("name"), Sort::desc("dob"), Sort::asc("lair.name")]
        );
    }
}
