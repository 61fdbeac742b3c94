mod common;

use bson::doc;
use common::*;
use frames_mapper::{FrameError, Paginator, PaginatorOptions, Value};
use frames_query::{Q, sort_by};

fn options(per_page: usize, orphans: usize) -> PaginatorOptions {
    PaginatorOptions {
        per_page,
        orphans,
        sort: sort_by(["_id"]),
        ..Default::default()
    }
}

fn ids(page: &frames_mapper::Page) -> Vec<i64> {
    page.iter()
        .filter_map(|r| r.get("_id").and_then(Value::as_i64))
        .collect()
}

#[test]
fn pages_split_results() {
    let (mapper, _) = mapper();
    let paginator = Paginator::new(&mapper, &DRAGON, doc! {}, options(3, 0)).unwrap();

    assert_eq!(paginator.item_count(), 4);
    assert_eq!(paginator.page_count(), 2);
    assert_eq!(paginator.page_numbers(), 1..=2);

    let first = paginator.page(1).unwrap();
    assert_eq!(ids(&first), vec![1, 2, 3]);
    assert_eq!(first.number(), 1);
    assert_eq!(first.prev(), None);
    assert_eq!(first.next(), Some(2));

    let second = paginator.page(2).unwrap();
    assert_eq!(ids(&second), vec![4]);
    assert_eq!(second.offset(), 3);
    assert_eq!(second.prev(), Some(1));
    assert_eq!(second.next(), None);
    assert_eq!(second.offset_of(&second.items()[0]), Some(3));
}

#[test]
fn orphans_fold_into_the_last_page() {
    let (mapper, _) = mapper();
    let paginator = Paginator::new(&mapper, &DRAGON, doc! {}, options(3, 1)).unwrap();

    assert_eq!(paginator.page_count(), 1);
    assert_eq!(ids(&paginator.page(1).unwrap()), vec![1, 2, 3, 4]);
}

#[test]
fn out_of_range_pages_are_errors() {
    let (mapper, _) = mapper();
    let paginator = Paginator::new(&mapper, &DRAGON, doc! {}, options(2, 0)).unwrap();

    for page in [0, 3] {
        assert!(matches!(
            paginator.page(page),
            Err(FrameError::InvalidPage { page_count: 2, .. })
        ));
    }
}

#[test]
fn empty_results_still_have_one_page() {
    let (mapper, _) = mapper();
    let paginator =
        Paginator::new(&mapper, &DRAGON, Q::field("name").eq("Smaug"), options(2, 0)).unwrap();

    assert_eq!(paginator.page_count(), 1);
    assert!(paginator.page(1).unwrap().is_empty());
}

#[test]
fn pages_iterate_in_order_with_projection() {
    let (mapper, source) = mapper();
    let paginator = Paginator::new(
        &mapper,
        &COMPLEX_DRAGON,
        doc! {},
        PaginatorOptions {
            projection: Some(lair_with_inventory()),
            ..options(2, 0)
        },
    )
    .unwrap();

    let pages: Vec<_> = paginator.pages().collect::<Result<_, _>>().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(ids(&pages[0]), vec![1, 2]);
    assert_eq!(ids(&pages[1]), vec![3, 4]);
    assert!(pages[0].items()[0].get("lair").unwrap().as_record().is_some());
    assert_eq!(source.finds(LAIRS), 2);
}
