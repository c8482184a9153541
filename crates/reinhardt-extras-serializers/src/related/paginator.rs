//! Pagination of embedded collections

use reinhardt_extras_core::request::replace_query_param;
use reinhardt_extras_core::tokens::{FieldTokens, PAGE_PATTERN};
use reinhardt_extras_core::{Error, Request, Result};
use serde_json::{Map, Value};
use std::ops::Range;
use std::sync::Arc;

use crate::list::ListPaginator;

/// Position of the page being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
	/// Current page number (1-indexed)
	pub number: usize,
	/// Total number of pages
	pub num_pages: usize,
	/// Total number of items across all pages
	pub count: usize,
}

impl PageState {
	pub fn has_next(&self) -> bool {
		self.number < self.num_pages
	}

	pub fn has_previous(&self) -> bool {
		self.number > 1
	}
}

/// Paginates one relation of one request.
///
/// Page number and size come from the `page(<n>)` and `page_size(<n>)`
/// tokens of the relation's `fields[<relation>]` selection. Links rewrite
/// that one query parameter and nothing else.
///
/// A paginator is stateful. Build a fresh one per relation per request.
#[derive(Debug, Clone)]
pub struct RelatedObjectPaginator {
	relation: String,
	tokens: Vec<String>,
	parsed: FieldTokens,
	request: Arc<Request>,
	default_page_size: usize,
	page: Option<PageState>,
}

impl RelatedObjectPaginator {
	/// The token list is copied; the caller's list is never modified.
	pub fn new<S: AsRef<str>>(
		relation: impl Into<String>,
		tokens: &[S],
		request: Arc<Request>,
		default_page_size: usize,
	) -> Self {
		let tokens: Vec<String> = tokens.iter().map(|token| token.as_ref().to_string()).collect();
		let parsed = FieldTokens::parse(&tokens);
		Self {
			relation: relation.into(),
			tokens,
			parsed,
			request,
			default_page_size,
			page: None,
		}
	}

	pub fn relation(&self) -> &str {
		&self.relation
	}

	/// # Errors
	///
	/// [`Error::NotFound`] when the `page(<n>)` directive does not hold a
	/// usable number.
	pub fn page_number(&self) -> Result<usize> {
		self.parsed.page_number().ok_or_else(|| self.invalid_page())
	}

	/// # Errors
	///
	/// [`Error::NotFound`] when the `page_size(<n>)` directive is zero or does
	/// not hold a usable number.
	pub fn page_size(&self) -> Result<usize> {
		match self.parsed.page_size_or(self.default_page_size) {
			Some(size) if size > 0 => Ok(size),
			_ => Err(Error::NotFound(format!(
				"Invalid page size for `{}`.",
				self.relation
			))),
		}
	}

	fn invalid_page(&self) -> Error {
		Error::NotFound(format!("Invalid page for `{}`.", self.relation))
	}

	/// State of the last [`page_bounds`](Self::page_bounds) call.
	pub fn page(&self) -> Option<PageState> {
		self.page
	}

	pub fn count(&self) -> usize {
		self.page.map_or(0, |page| page.count)
	}

	/// Validate the requested page against `count` items and return the
	/// index range it covers.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] naming the relation when the page size is zero or
	/// the page number is out of range.
	pub fn page_bounds(&mut self, count: usize) -> Result<Range<usize>> {
		let page_size = self.page_size()?;
		let num_pages = count.div_ceil(page_size).max(1);
		let number = self.page_number()?;
		if number < 1 || number > num_pages {
			tracing::debug!(
				relation = %self.relation,
				page = number,
				num_pages,
				"requested page is out of range"
			);
			return Err(self.invalid_page());
		}
		self.page = Some(PageState {
			number,
			num_pages,
			count,
		});
		let start = (number - 1) * page_size;
		Ok(start..count.min(start + page_size))
	}

	/// Cut `items` down to the requested page.
	///
	/// # Errors
	///
	/// See [`page_bounds`](Self::page_bounds).
	pub fn paginate<T>(&mut self, items: Vec<T>) -> Result<Vec<T>> {
		let bounds = self.page_bounds(items.len())?;
		Ok(items
			.into_iter()
			.skip(bounds.start)
			.take(bounds.len())
			.collect())
	}

	/// `fields[<relation>]`
	pub fn field_param(&self) -> String {
		format!("fields[{}]", self.relation)
	}

	/// `page(<n>)`
	pub fn page_param(&self, page: usize) -> String {
		format!("page({})", page)
	}

	/// The selection with its page token set to `page`, appending one when
	/// the selection had none.
	pub fn replace_page(&self, page: usize) -> String {
		let mut tokens = self.tokens.clone();
		let mut replaced = false;
		tokens.retain_mut(|token| {
			if !PAGE_PATTERN.is_match(token) {
				return true;
			}
			if replaced {
				return false;
			}
			*token = self.page_param(page);
			replaced = true;
			true
		});
		if !replaced {
			tokens.push(self.page_param(page));
		}
		tokens.join(",")
	}

	/// The selection without any page token.
	pub fn remove_page(&self) -> String {
		self.tokens
			.iter()
			.filter(|token| !PAGE_PATTERN.is_match(token))
			.cloned()
			.collect::<Vec<_>>()
			.join(",")
	}

	pub fn next_link(&self) -> Result<Option<String>> {
		let Some(page) = self.page.filter(PageState::has_next) else {
			return Ok(None);
		};
		let url = self.request.build_absolute_uri();
		replace_query_param(&url, &self.field_param(), &self.replace_page(page.number + 1)).map(Some)
	}

	pub fn previous_link(&self) -> Result<Option<String>> {
		let Some(page) = self.page.filter(PageState::has_previous) else {
			return Ok(None);
		};
		let url = self.request.build_absolute_uri();
		let target = page.number - 1;
		let selection = if target == 1 {
			self.remove_page()
		} else {
			self.replace_page(target)
		};
		replace_query_param(&url, &self.field_param(), &selection).map(Some)
	}

	/// `{count, next, previous, results}`, in that order.
	pub fn paginated_data(&self, results: Vec<Value>) -> Result<Value> {
		let mut envelope = Map::new();
		envelope.insert("count".to_string(), Value::from(self.count()));
		envelope.insert(
			"next".to_string(),
			self.next_link()?.map_or(Value::Null, Value::String),
		);
		envelope.insert(
			"previous".to_string(),
			self.previous_link()?.map_or(Value::Null, Value::String),
		);
		envelope.insert("results".to_string(), Value::Array(results));
		Ok(Value::Object(envelope))
	}
}

impl ListPaginator for RelatedObjectPaginator {
	fn page_bounds(&mut self, count: usize) -> Result<Range<usize>> {
		RelatedObjectPaginator::page_bounds(self, count)
	}

	fn num_pages(&self) -> usize {
		self.page.map_or(1, |page| page.num_pages)
	}

	fn paginated_data(&self, results: Vec<Value>) -> Result<Value> {
		RelatedObjectPaginator::paginated_data(self, results)
	}
}
