//! List serializer with filtering and pagination hooks

use reinhardt_extras_core::orm::{Instance, QuerySet, Relation};
use reinhardt_extras_core::Result;
use serde_json::Value;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::related::RelatedFilter;
use crate::serializer::BoundSerializer;

/// What [`PaginatedListSerializer`] needs from a paginator.
pub trait ListPaginator: Send + fmt::Debug {
	/// Validate the requested page against the filtered item count,
	/// recording the totals, and return the index range of that page.
	fn page_bounds(&mut self, count: usize) -> Result<Range<usize>>;

	/// Cut already loaded items down to one page.
	fn paginate_data(&mut self, items: Vec<Arc<dyn Instance>>) -> Result<Vec<Arc<dyn Instance>>> {
		let bounds = self.page_bounds(items.len())?;
		Ok(items
			.into_iter()
			.skip(bounds.start)
			.take(bounds.len())
			.collect())
	}

	/// Page count of the last `page_bounds` call.
	fn num_pages(&self) -> usize;

	/// Wrap a rendered page in its envelope.
	fn paginated_data(&self, results: Vec<Value>) -> Result<Value>;
}

/// Checks each item before it is rendered.
pub type ItemGuard = Arc<dyn Fn(&dyn Instance) -> Result<()> + Send + Sync>;

/// Renders a collection with a child serializer.
///
/// Items are filtered, then paginated, then rendered. The output is a bare
/// list unless the paginator reports more than one page, in which case it
/// is the paginator's envelope.
pub struct PaginatedListSerializer {
	child: Arc<BoundSerializer>,
	filter: Option<RelatedFilter>,
	paginator: Option<Box<dyn ListPaginator>>,
	guard: Option<ItemGuard>,
}

impl fmt::Debug for PaginatedListSerializer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PaginatedListSerializer")
			.field("child", &self.child.name())
			.field("filter", &self.filter)
			.field("paginator", &self.paginator)
			.finish()
	}
}

impl PaginatedListSerializer {
	pub fn new(child: Arc<BoundSerializer>) -> Self {
		Self {
			child,
			filter: None,
			paginator: None,
			guard: None,
		}
	}

	pub fn with_filter(mut self, filter: Option<RelatedFilter>) -> Self {
		self.filter = filter;
		self
	}

	pub fn with_paginator(mut self, paginator: Box<dyn ListPaginator>) -> Self {
		self.paginator = Some(paginator);
		self
	}

	pub fn with_guard(mut self, guard: ItemGuard) -> Self {
		self.guard = Some(guard);
		self
	}

	/// Narrow `queryset` by the lookups filter and push the child's
	/// annotations into it.
	fn prepare(&self, queryset: Box<dyn QuerySet>) -> Box<dyn QuerySet> {
		let queryset = match &self.filter {
			Some(RelatedFilter::Lookups(lookups)) => queryset.filter(lookups),
			_ => queryset,
		};
		let annotations = self.child.annotation_map();
		if annotations.is_empty() {
			queryset
		} else {
			queryset.annotate(&annotations)
		}
	}

	/// Load the items of `relation` that pass the filter, cut to the
	/// paginator's page.
	///
	/// A queryset filtered by lookups is counted and then sliced so only the
	/// requested page is fetched. A predicate filter has to see every row, so
	/// it and plain item lists are paginated after loading.
	fn load(&mut self, relation: Relation) -> Result<Vec<Arc<dyn Instance>>> {
		let predicate = match &self.filter {
			Some(RelatedFilter::Predicate(predicate)) => Some(predicate.clone()),
			_ => None,
		};
		let mut items = match relation {
			Relation::One(queryset) | Relation::Many(queryset) => {
				let queryset = self.prepare(queryset);
				match self.paginator.as_mut() {
					Some(paginator) if predicate.is_none() => {
						let bounds = paginator.page_bounds(queryset.count()?)?;
						return queryset.slice(bounds.start, bounds.len()).fetch();
					}
					_ => queryset.fetch()?,
				}
			}
			Relation::Items(items) => match &self.filter {
				Some(RelatedFilter::Lookups(lookups)) => items
					.into_iter()
					.filter(|item| {
						lookups
							.iter()
							.all(|(name, expected)| item.attribute(name).as_ref() == Some(expected))
					})
					.collect(),
				_ => items,
			},
		};
		if let Some(predicate) = predicate {
			items.retain(|item| predicate(item.as_ref()));
		}
		match self.paginator.as_mut() {
			Some(paginator) => paginator.paginate_data(items),
			None => Ok(items),
		}
	}

	pub fn to_representation(&mut self, relation: Relation) -> Result<Value> {
		let items = self.load(relation)?;
		let mut results = Vec::with_capacity(items.len());
		for item in &items {
			if let Some(guard) = &self.guard {
				guard(item.as_ref())?;
			}
			results.push(self.child.to_representation(item.as_ref())?);
		}
		match &self.paginator {
			Some(paginator) if paginator.num_pages() > 1 => paginator.paginated_data(results),
			_ => Ok(Value::Array(results)),
		}
	}
}
