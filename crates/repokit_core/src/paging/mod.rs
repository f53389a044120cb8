//! Page and slice execution over compiled plans.
//!
//! # Responsibility
//! - Window a base plan by page number and size.
//! - Build counted [`Page`] results and uncounted [`Slice`] results.
//!
//! # Invariants
//! - `fetch_page` issues exactly one row query and one count query.
//! - `fetch_slice` never issues a count query; it over-fetches one row.
//! - The base plan is never mutated; windowed plans are derived copies.

use crate::model::value::Value;
use crate::projection::{ensure_arity, project, FromRow};
use crate::query::params::Params;
use crate::query::plan::CompiledPlan;
use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::Store;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Zero-based page number, positive page size and an optional sort.
///
/// Deserialization goes through [`PageRequest::of`], so a zero size is
/// rejected there too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PageRequestFields")]
pub struct PageRequest {
    page: u64,
    size: u64,
    sort: Sort,
}

#[derive(Deserialize)]
struct PageRequestFields {
    page: u64,
    size: u64,
    #[serde(default)]
    sort: Sort,
}

impl TryFrom<PageRequestFields> for PageRequest {
    type Error = RepoError;

    fn try_from(fields: PageRequestFields) -> RepoResult<Self> {
        Ok(Self::of(fields.page, fields.size)?.with_sort(fields.sort))
    }
}

impl PageRequest {
    pub fn of(page: u64, size: u64) -> RepoResult<Self> {
        if size == 0 {
            return Err(RepoError::InvalidQuery(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            page,
            size,
            sort: Sort::unsorted(),
        })
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Row offset of the first element on this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }
}

/// One page of results plus the total row count of the unwindowed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    number: u64,
    size: u64,
    total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.size)
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    /// Also true when the query matched nothing.
    pub fn is_last(&self) -> bool {
        self.number.saturating_add(1) >= self.total_pages()
    }

    pub fn has_next(&self) -> bool {
        !self.is_last()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    /// Applies `transform` to every element; paging metadata is unchanged.
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(transform).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 9)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("number", &self.number)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("number_of_elements", &self.number_of_elements())?;
        state.serialize_field("total_elements", &self.total_elements)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.serialize_field("first", &self.is_first())?;
        state.serialize_field("last", &self.is_last())?;
        state.serialize_field("has_next", &self.has_next())?;
        state.end()
    }
}

/// One window of results that only knows whether another window follows.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    content: Vec<T>,
    number: u64,
    size: u64,
    has_next: bool,
}

impl<T> Slice<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, has_next: bool) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            has_next,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(transform).collect(),
            number: self.number,
            size: self.size,
            has_next: self.has_next,
        }
    }
}

impl<T: Serialize> Serialize for Slice<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Slice", 7)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("number", &self.number)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("number_of_elements", &self.number_of_elements())?;
        state.serialize_field("first", &self.is_first())?;
        state.serialize_field("last", &self.is_last())?;
        state.serialize_field("has_next", &self.has_next)?;
        state.end()
    }
}

/// Runs `plan` windowed to `request` and counts the unwindowed result.
pub fn fetch_page<T, S>(
    store: &S,
    plan: &CompiledPlan,
    params: &Params,
    request: &PageRequest,
) -> RepoResult<Page<T>>
where
    T: FromRow,
    S: Store + ?Sized,
{
    let (windowed, values) = prepare::<T>(plan, params, request, request.size)?;
    let content = project(store.fetch(&windowed, values.clone())?)?;
    let total_elements = store.count(plan, values)?;
    Ok(Page::new(content, request, total_elements))
}

/// Runs `plan` windowed to `request.size + 1` rows and trims the extra row.
pub fn fetch_slice<T, S>(
    store: &S,
    plan: &CompiledPlan,
    params: &Params,
    request: &PageRequest,
) -> RepoResult<Slice<T>>
where
    T: FromRow,
    S: Store + ?Sized,
{
    let (windowed, values) = prepare::<T>(plan, params, request, request.size.saturating_add(1))?;
    let mut content: Vec<T> = project(store.fetch(&windowed, values)?)?;
    let size = usize::try_from(request.size).unwrap_or(usize::MAX);
    let has_next = content.len() > size;
    content.truncate(size);
    Ok(Slice::new(content, request, has_next))
}

fn prepare<T: FromRow>(
    plan: &CompiledPlan,
    params: &Params,
    request: &PageRequest,
    fetch_size: u64,
) -> RepoResult<(CompiledPlan, Vec<Value>)> {
    let values = plan.bind(params)?;
    if let Some(width) = plan.column_count() {
        ensure_arity::<T>(width)?;
    }
    let windowed = plan
        .with_sort(request.sort())?
        .with_window(Some(fetch_size), request.offset());
    Ok((windowed, values))
}

#[cfg(test)]
mod tests {
    use super::{Page, PageRequest, Slice};
    use crate::repo::error::RepoError;

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(matches!(
            PageRequest::of(0, 0),
            Err(RepoError::InvalidQuery(_))
        ));
    }

    #[test]
    fn first_of_two_pages() {
        let request = PageRequest::of(0, 3).unwrap();
        let page = Page::new(vec!["member5", "member4", "member3"], &request, 5);
        assert_eq!(page.total_pages(), 2);
        assert!(page.is_first());
        assert!(page.has_next());
        assert!(!page.is_last());
        assert!(!page.has_previous());
    }

    #[test]
    fn last_page_and_empty_result() {
        let request = PageRequest::of(1, 3).unwrap();
        let page = Page::new(vec![1, 2], &request, 5);
        assert!(page.is_last());
        assert!(!page.has_next());
        assert!(page.has_previous());

        let empty: Page<i32> = Page::new(Vec::new(), &PageRequest::of(0, 3).unwrap(), 0);
        assert_eq!(empty.total_pages(), 0);
        assert!(empty.is_first());
        assert!(empty.is_last());
    }

    #[test]
    fn map_keeps_metadata() {
        let request = PageRequest::of(0, 2).unwrap();
        let page = Page::new(vec![1, 2], &request, 7).map(|value| value * 10);
        assert_eq!(page.content(), &[10, 20]);
        assert_eq!(page.total_elements(), 7);
        assert_eq!(page.total_pages(), 4);
    }

    #[test]
    fn request_navigation() {
        let request = PageRequest::of(2, 10).unwrap();
        assert_eq!(request.offset(), 20);
        assert_eq!(request.next().page(), 3);
        assert_eq!(request.previous_or_first().page(), 1);
        assert_eq!(PageRequest::of(0, 10).unwrap().previous_or_first().page(), 0);
    }

    #[test]
    fn slice_flags_follow_has_next() {
        let request = PageRequest::of(0, 3).unwrap();
        let slice = Slice::new(vec![1, 2, 3], &request, true);
        assert!(!slice.is_last());
        let slice = slice.map(|value| value + 1);
        assert_eq!(slice.content(), &[2, 3, 4]);
        assert!(slice.has_next());
    }
}
