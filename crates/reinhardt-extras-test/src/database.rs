//! In-memory ORM
//!
//! Just enough of an ORM to drive serializers in tests: rows as JSON
//! objects, foreign keys, many-to-many and reverse relations, `exact`-style
//! lookups and [`TestExpr`] annotations. Every evaluated queryset counts as
//! one query, so tests can assert query budgets.

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use reinhardt_extras_core::orm::{
	AnnotationCache, AnnotationMap, Instance, Lookups, QuerySet, Relation,
};
use reinhardt_extras_core::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::expression::TestExpr;

type Row = Map<String, Value>;

#[derive(Debug, Clone)]
enum RelationDef {
	/// Column `<name>` holds the target id.
	ForeignKey { target: String },
	ManyToMany { target: String },
	/// Rows of `source` whose `column` holds this row's id.
	Reverse { source: String, column: String },
}

#[derive(Debug, Default)]
struct State {
	next_ids: HashMap<String, i64>,
	rows: HashMap<String, BTreeMap<i64, Row>>,
	relations: HashMap<(String, String), RelationDef>,
	links: HashMap<(String, String), Vec<(i64, i64)>>,
}

impl State {
	fn relation(&self, model: &str, name: &str) -> Option<&RelationDef> {
		self.relations.get(&(model.to_string(), name.to_string()))
	}

	fn row(&self, model: &str, id: i64) -> Option<&Row> {
		self.rows.get(model).and_then(|rows| rows.get(&id))
	}

	/// Rows on the far side of `relation`, duplicates and link order kept.
	fn related_rows(&self, model: &str, id: i64, relation: &str) -> Result<Vec<(i64, Row)>> {
		let def = self.relation(model, relation).ok_or_else(|| unknown_field(model, relation))?;
		let rows = match def {
			RelationDef::ForeignKey { target } => self
				.row(model, id)
				.and_then(|row| row.get(relation))
				.and_then(Value::as_i64)
				.and_then(|fk| self.row(target, fk).map(|row| (fk, row.clone())))
				.into_iter()
				.collect(),
			RelationDef::ManyToMany { target } => self
				.links
				.get(&(model.to_string(), relation.to_string()))
				.into_iter()
				.flatten()
				.filter(|(owner, _)| *owner == id)
				.filter_map(|(_, target_id)| {
					self.row(target, *target_id).map(|row| (*target_id, row.clone()))
				})
				.collect(),
			RelationDef::Reverse { source, column } => self
				.rows
				.get(source)
				.into_iter()
				.flatten()
				.filter(|(_, row)| row.get(column).and_then(Value::as_i64) == Some(id))
				.map(|(source_id, row)| (*source_id, row.clone()))
				.collect(),
		};
		Ok(rows)
	}
}

fn unknown_field(model: &str, field: &str) -> Error {
	Error::Database(format!("Cannot resolve keyword '{}' into field of {}", field, model))
}

fn column(id: i64, row: &Row, field: &str) -> Value {
	match field {
		"id" | "pk" => Value::from(id),
		_ => row.get(field).cloned().unwrap_or(Value::Null),
	}
}

fn numeric(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.parse().ok(),
		_ => None,
	}
}

fn values_equal(left: &Value, right: &Value) -> bool {
	match (left, right) {
		(Value::Number(_), Value::Number(_)) => numeric(left) == numeric(right),
		_ => left == right,
	}
}

/// Whether `actual` satisfies `field__op = expected`.
fn lookup_matches(actual: &Value, op: &str, expected: &Value) -> Result<bool> {
	let matched = match op {
		"exact" => values_equal(actual, expected),
		"iexact" => match (actual.as_str(), expected.as_str()) {
			(Some(a), Some(e)) => a.eq_ignore_ascii_case(e),
			_ => values_equal(actual, expected),
		},
		"startswith" => match (actual.as_str(), expected.as_str()) {
			(Some(a), Some(e)) => a.starts_with(e),
			_ => false,
		},
		"contains" => match (actual.as_str(), expected.as_str()) {
			(Some(a), Some(e)) => a.contains(e),
			_ => false,
		},
		"in" => expected
			.as_array()
			.is_some_and(|items| items.iter().any(|item| values_equal(actual, item))),
		"isnull" => expected.as_bool() == Some(actual.is_null()),
		"gt" | "gte" | "lt" | "lte" => match (numeric(actual), numeric(expected)) {
			(Some(a), Some(e)) => match op {
				"gt" => a > e,
				"gte" => a >= e,
				"lt" => a < e,
				_ => a <= e,
			},
			_ => false,
		},
		other => return Err(Error::Database(format!("Unsupported lookup '{}'", other))),
	};
	Ok(matched)
}

fn split_lookup(key: &str) -> (&str, &str) {
	match key.rsplit_once("__") {
		Some((field, op)) => (field, op),
		None => (key, "exact"),
	}
}

/// An in-memory database shared by every queryset and record created from it.
pub struct MemoryDatabase {
	state: RwLock<State>,
	queries: AtomicUsize,
	log: Mutex<Vec<String>>,
}

impl fmt::Debug for MemoryDatabase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDatabase")
			.field("queries", &self.query_count())
			.finish_non_exhaustive()
	}
}

impl MemoryDatabase {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			state: RwLock::new(State::default()),
			queries: AtomicUsize::new(0),
			log: Mutex::new(Vec::new()),
		})
	}

	/// `model.<name>` holds the id of a `target` row.
	pub fn register_foreign_key(&self, model: &str, name: &str, target: &str) {
		self.state.write().relations.insert(
			(model.to_string(), name.to_string()),
			RelationDef::ForeignKey {
				target: target.to_string(),
			},
		);
	}

	pub fn register_many_to_many(&self, model: &str, name: &str, target: &str) {
		self.state.write().relations.insert(
			(model.to_string(), name.to_string()),
			RelationDef::ManyToMany {
				target: target.to_string(),
			},
		);
	}

	/// `model.<name>` yields the `source` rows whose `column` points at it.
	pub fn register_reverse(&self, model: &str, name: &str, source: &str, column: &str) {
		self.state.write().relations.insert(
			(model.to_string(), name.to_string()),
			RelationDef::Reverse {
				source: source.to_string(),
				column: column.to_string(),
			},
		);
	}

	/// Insert a row and return its id. Ids start at 1 per model.
	pub fn insert(&self, model: &str, values: Value) -> i64 {
		let mut state = self.state.write();
		let next = state.next_ids.entry(model.to_string()).or_insert(0);
		*next += 1;
		let id = *next;
		let row = match values {
			Value::Object(row) => row,
			_ => Row::new(),
		};
		state.rows.entry(model.to_string()).or_default().insert(id, row);
		id
	}

	pub fn update(&self, model: &str, id: i64, field: &str, value: Value) {
		if let Some(row) = self.state.write().rows.get_mut(model).and_then(|rows| rows.get_mut(&id)) {
			row.insert(field.to_string(), value);
		}
	}

	/// Add a many-to-many link. Linking the same pair twice stores it twice.
	pub fn link(&self, model: &str, relation: &str, owner: i64, target: i64) {
		self.state
			.write()
			.links
			.entry((model.to_string(), relation.to_string()))
			.or_default()
			.push((owner, target));
	}

	pub fn objects(self: &Arc<Self>, model: &str) -> Box<dyn QuerySet> {
		Box::new(MemoryQuerySet::new(self.clone(), model))
	}

	/// Fetch one row by id (one query).
	pub fn get(self: &Arc<Self>, model: &str, id: i64) -> Result<Option<Arc<dyn Instance>>> {
		let mut lookups = Lookups::new();
		lookups.insert("pk".to_string(), Value::from(id));
		self.objects(model).filter(&lookups).first()
	}

	pub fn query_count(&self) -> usize {
		self.queries.load(Ordering::SeqCst)
	}

	pub fn reset_queries(&self) {
		self.queries.store(0, Ordering::SeqCst);
		self.log.lock().clear();
	}

	/// Descriptions of the queries run since the last reset.
	pub fn queries(&self) -> Vec<String> {
		self.log.lock().clone()
	}

	fn record_query(&self, description: String) {
		tracing::trace!(query = %description, "memory query");
		self.queries.fetch_add(1, Ordering::SeqCst);
		self.log.lock().push(description);
	}
}

#[derive(Debug, Clone)]
enum Scope {
	All,
	ManyToMany {
		owner_model: String,
		relation: String,
		owner_id: i64,
	},
	Nothing,
}

/// A lazily evaluated query over one model of a [`MemoryDatabase`].
#[derive(Debug, Clone)]
pub struct MemoryQuerySet {
	db: Arc<MemoryDatabase>,
	model: String,
	scope: Scope,
	lookups: Vec<(String, Value)>,
	annotations: AnnotationMap,
	window: Option<(usize, usize)>,
}

impl MemoryQuerySet {
	pub fn new(db: Arc<MemoryDatabase>, model: impl Into<String>) -> Self {
		Self {
			db,
			model: model.into(),
			scope: Scope::All,
			lookups: Vec::new(),
			annotations: AnnotationMap::new(),
			window: None,
		}
	}

	fn describe(&self, select: &str) -> String {
		let mut description = format!("{} {}", select, self.model);
		if let Scope::ManyToMany {
			owner_model,
			relation,
			owner_id,
		} = &self.scope
		{
			description.push_str(&format!(" JOIN {}.{}[{}]", owner_model, relation, owner_id));
		}
		if !self.lookups.is_empty() {
			let conditions: Vec<String> =
				self.lookups.iter().map(|(k, v)| format!("{} = {}", k, v)).collect();
			description.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
		}
		if !self.annotations.is_empty() {
			let keys: Vec<&str> = self.annotations.keys().map(String::as_str).collect();
			description.push_str(&format!(" ANNOTATE {}", keys.join(", ")));
		}
		if let Some((offset, limit)) = self.window {
			description.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
		}
		description
	}

	/// Rows in scope that pass the lookups, cut to the window.
	fn matching_rows(&self, state: &State) -> Result<Vec<(i64, Row)>> {
		let candidates: Vec<(i64, Row)> = match &self.scope {
			Scope::Nothing => Vec::new(),
			Scope::All => state
				.rows
				.get(&self.model)
				.into_iter()
				.flatten()
				.map(|(id, row)| (*id, row.clone()))
				.collect(),
			Scope::ManyToMany {
				owner_model,
				relation,
				owner_id,
			} => {
				let mut rows = state.related_rows(owner_model, *owner_id, relation)?;
				rows.sort_by_key(|(id, _)| *id);
				rows.dedup_by_key(|(id, _)| *id);
				rows
			}
		};
		let mut rows = Vec::new();
		for (id, row) in candidates {
			if self.matches(state, id, &row)? {
				rows.push((id, row));
			}
		}
		if let Some((offset, limit)) = self.window {
			rows = rows.into_iter().skip(offset).take(limit).collect();
		}
		Ok(rows)
	}

	fn evaluate(&self) -> Result<Vec<Arc<dyn Instance>>> {
		self.db.record_query(self.describe("SELECT"));
		let state = self.db.state.read();
		let mut records: Vec<Arc<dyn Instance>> = Vec::new();
		for (id, row) in self.matching_rows(&state)? {
			let cache = AnnotationCache::new();
			for (key, expression) in &self.annotations {
				let expression = expression
					.as_any()
					.downcast_ref::<TestExpr>()
					.ok_or_else(|| Error::Database(format!("Unsupported expression for {}", key)))?;
				cache.insert(key.clone(), self.evaluate_expression(&state, id, &row, expression)?);
			}
			records.push(Arc::new(Record {
				db: self.db.clone(),
				model: self.model.clone(),
				id,
				values: row,
				cache,
			}));
		}
		Ok(records)
	}

	fn matches(&self, state: &State, id: i64, row: &Row) -> Result<bool> {
		for (key, expected) in &self.lookups {
			let (field, op) = split_lookup(key);
			let known = matches!(field, "id" | "pk")
				|| row.contains_key(field)
				|| state.relation(&self.model, field).is_some();
			if !known {
				return Err(unknown_field(&self.model, field));
			}
			if !lookup_matches(&column(id, row, field), op, expected)? {
				return Ok(false);
			}
		}
		Ok(true)
	}

	fn evaluate_expression(&self, state: &State, id: i64, row: &Row, expression: &TestExpr) -> Result<Value> {
		let value = match expression {
			TestExpr::Value { value, .. } => value.clone(),
			TestExpr::Column { name } => column(id, row, name),
			TestExpr::ConcatPk { prefix } => Value::String(format!("{}{}", prefix, id)),
			TestExpr::Count { relation, filter } => {
				let related = state.related_rows(&self.model, id, relation)?;
				let count = related
					.iter()
					.filter(|(related_id, related_row)| match filter {
						Some((field, value)) => {
							values_equal(&column(*related_id, related_row, field), value)
						}
						None => true,
					})
					.count();
				Value::from(count)
			}
			TestExpr::SumCase {
				relation,
				field,
				cases,
			} => {
				let related = state.related_rows(&self.model, id, relation)?;
				let total: i64 = related
					.iter()
					.map(|(related_id, related_row)| {
						let actual = column(*related_id, related_row, field);
						cases
							.iter()
							.find(|(value, _)| values_equal(&actual, value))
							.map(|(_, weight)| *weight)
							.unwrap_or(0)
					})
					.sum();
				Value::from(total)
			}
			TestExpr::Avg { relation, field } => {
				let related = state.related_rows(&self.model, id, relation)?;
				let numbers: Vec<f64> = related
					.iter()
					.filter_map(|(related_id, related_row)| {
						numeric(&column(*related_id, related_row, field))
					})
					.collect();
				if numbers.is_empty() {
					Value::Null
				} else {
					Value::from(numbers.iter().sum::<f64>() / numbers.len() as f64)
				}
			}
		};
		Ok(value)
	}
}

impl QuerySet for MemoryQuerySet {
	fn model_name(&self) -> &str {
		&self.model
	}

	fn filter(&self, lookups: &Lookups) -> Box<dyn QuerySet> {
		let mut next = self.clone();
		next.lookups
			.extend(lookups.iter().map(|(k, v)| (k.clone(), v.clone())));
		Box::new(next)
	}

	fn annotate(&self, annotations: &AnnotationMap) -> Box<dyn QuerySet> {
		let mut next = self.clone();
		for (key, expression) in annotations {
			next.annotations.insert(key.clone(), expression.clone());
		}
		Box::new(next)
	}

	fn slice(&self, offset: usize, limit: usize) -> Box<dyn QuerySet> {
		let mut next = self.clone();
		next.window = Some(match self.window {
			Some((start, available)) => (
				start.saturating_add(offset),
				available.saturating_sub(offset).min(limit),
			),
			None => (offset, limit),
		});
		Box::new(next)
	}

	fn first(&self) -> Result<Option<Arc<dyn Instance>>> {
		Ok(self.evaluate()?.into_iter().next())
	}

	fn count(&self) -> Result<usize> {
		self.db.record_query(self.describe("COUNT"));
		let state = self.db.state.read();
		Ok(self.matching_rows(&state)?.len())
	}

	fn fetch(&self) -> Result<Vec<Arc<dyn Instance>>> {
		self.evaluate()
	}
}

/// A row fetched from a [`MemoryDatabase`].
pub struct Record {
	db: Arc<MemoryDatabase>,
	model: String,
	id: i64,
	values: Row,
	cache: AnnotationCache,
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Record")
			.field("model", &self.model)
			.field("id", &self.id)
			.field("values", &self.values)
			.finish()
	}
}

impl Record {
	pub fn id(&self) -> i64 {
		self.id
	}

	fn relation_def(&self, name: &str) -> Option<RelationDef> {
		self.db.state.read().relation(&self.model, name).cloned()
	}
}

impl Instance for Record {
	fn model_name(&self) -> &str {
		&self.model
	}

	fn pk(&self) -> Value {
		Value::from(self.id)
	}

	/// To-many relations answer with the list of related ids, which costs a
	/// query like any other relation access.
	fn attribute(&self, name: &str) -> Option<Value> {
		if matches!(name, "id" | "pk") {
			return Some(self.pk());
		}
		match self.relation_def(name) {
			Some(RelationDef::ManyToMany { .. }) | Some(RelationDef::Reverse { .. }) => {
				let items = self.related(name)?.fetch().ok()?;
				Some(Value::Array(items.iter().map(|item| item.pk()).collect()))
			}
			_ => self.values.get(name).cloned(),
		}
	}

	fn related(&self, name: &str) -> Option<Relation> {
		let relation = match self.relation_def(name)? {
			RelationDef::ForeignKey { target } => {
				let mut queryset = MemoryQuerySet::new(self.db.clone(), target);
				match self.values.get(name).and_then(Value::as_i64) {
					Some(fk) => queryset.lookups.push(("pk".to_string(), Value::from(fk))),
					None => queryset.scope = Scope::Nothing,
				}
				Relation::One(Box::new(queryset))
			}
			RelationDef::ManyToMany { target } => {
				let mut queryset = MemoryQuerySet::new(self.db.clone(), target);
				queryset.scope = Scope::ManyToMany {
					owner_model: self.model.clone(),
					relation: name.to_string(),
					owner_id: self.id,
				};
				Relation::Many(Box::new(queryset))
			}
			RelationDef::Reverse { source, column } => {
				let mut queryset = MemoryQuerySet::new(self.db.clone(), source);
				queryset.lookups.push((column, Value::from(self.id)));
				Relation::Many(Box::new(queryset))
			}
		};
		Some(relation)
	}

	fn objects(&self) -> Box<dyn QuerySet> {
		self.db.objects(&self.model)
	}

	fn annotation_cache(&self) -> &AnnotationCache {
		&self.cache
	}
}

/// Column names of a record, for assertions.
pub fn record_values(instance: &dyn Instance, fields: &[&str]) -> IndexMap<String, Value> {
	fields
		.iter()
		.map(|field| {
			(
				field.to_string(),
				instance.attribute(field).unwrap_or(Value::Null),
			)
		})
		.collect()
}
