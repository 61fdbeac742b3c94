use std::ops::RangeInclusive;

use frames_query::{FindOptions, Sort};

use crate::error::FrameError;
use crate::mapper::Mapper;
use crate::projection::Projection;
use crate::record::Record;
use crate::schema::Schema;

#[derive(Debug, Clone)]
pub struct PaginatorOptions {
    pub per_page: usize,
    /// Up to this many trailing records are folded into the last page
    /// instead of starting a new one.
    pub orphans: usize,
    pub projection: Option<Projection>,
    pub sort: Vec<Sort>,
}

impl Default for PaginatorOptions {
    fn default() -> Self {
        Self {
            per_page: 20,
            orphans: 0,
            projection: None,
            sort: Vec::new(),
        }
    }
}

/// Slices a query's results into numbered pages. Matching records are
/// counted once, up front.
pub struct Paginator<'m> {
    mapper: &'m Mapper,
    schema: &'static Schema,
    filter: bson::Document,
    options: PaginatorOptions,
    item_count: u64,
    page_count: usize,
}

impl<'m> Paginator<'m> {
    pub fn new(
        mapper: &'m Mapper,
        schema: &'static Schema,
        filter: impl Into<bson::Document>,
        mut options: PaginatorOptions,
    ) -> Result<Self, FrameError> {
        options.per_page = options.per_page.max(1);
        let filter = filter.into();
        let item_count = mapper.count(schema, filter.clone())?;

        let total = item_count.saturating_sub(options.orphans as u64) as usize;
        let page_count = total.div_ceil(options.per_page).max(1);

        Ok(Self {
            mapper,
            schema,
            filter,
            options,
            item_count,
            page_count,
        })
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn per_page(&self) -> usize {
        self.options.per_page
    }

    pub fn orphans(&self) -> usize {
        self.options.orphans
    }

    pub fn page_numbers(&self) -> RangeInclusive<usize> {
        1..=self.page_count
    }

    /// Fetch a page by its 1-based number.
    pub fn page(&self, number: usize) -> Result<Page, FrameError> {
        if !self.page_numbers().contains(&number) {
            return Err(FrameError::InvalidPage {
                page: number,
                page_count: self.page_count,
            });
        }

        let per_page = self.options.per_page;
        let offset = (number - 1) * per_page;
        let mut limit = per_page;
        let remaining = self.item_count as i64 - (number * per_page) as i64;
        if remaining <= self.options.orphans as i64 {
            limit += self.options.orphans;
        }

        let items = self.mapper.many(
            self.schema,
            self.filter.clone(),
            self.options.projection.as_ref(),
            &FindOptions {
                sort: self.options.sort.clone(),
                skip: Some(offset),
                limit: Some(limit),
            },
        )?;

        Ok(Page {
            offset,
            number,
            items,
            next: (number < self.page_count).then_some(number + 1),
            prev: (number > 1).then(|| number - 1),
        })
    }

    /// Every page in order.
    pub fn pages(&self) -> impl Iterator<Item = Result<Page, FrameError>> + '_ {
        self.page_numbers().map(|number| self.page(number))
    }
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page {
    offset: usize,
    number: usize,
    items: Vec<Record>,
    next: Option<usize>,
    prev: Option<usize>,
}

impl Page {
    /// Position of the page's first item within the whole result set.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Record> {
        self.items
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }

    /// Position of `item` within the whole result set.
    pub fn offset_of(&self, item: &Record) -> Option<usize> {
        self.items
            .iter()
            .position(|candidate| candidate == item)
            .map(|index| self.offset + index)
    }
}

impl<'a> IntoIterator for &'a Page {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
