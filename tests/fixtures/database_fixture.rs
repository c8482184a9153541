//! Seeded in-memory databases
//!
//! Ids start at 1 per model, so the ids below are stable across tests.

use reinhardt_extras_test::MemoryDatabase;
use rstest::fixture;
use serde_json::json;
use std::sync::Arc;

/// A `Many` row whose `foes` carry the tags `test_1` twice, `test_2` once
/// and `test_3` three times.
pub struct TaggedWorld {
	pub db: Arc<MemoryDatabase>,
	pub many: i64,
}

#[fixture]
pub fn tagged_world() -> TaggedWorld {
	let db = MemoryDatabase::new();
	db.register_many_to_many("Many", "foes", "Foo");
	let many = db.insert("Many", json!({"name": "tagged"}));
	for (bar, times) in [("test_1", 2), ("test_2", 1), ("test_3", 3)] {
		for _ in 0..times {
			let foo = db.insert("Foo", json!({"bar": bar, "creator": 1}));
			db.link("Many", "foes", many, foo);
		}
	}
	TaggedWorld { db, many }
}

/// An `Owner` with a `foo`, five `foes` (three of them starting with
/// `test`) and two `bars`.
pub struct OwnerWorld {
	pub db: Arc<MemoryDatabase>,
	pub owner: i64,
	pub foo: i64,
	pub foes: Vec<i64>,
	pub matching: Vec<i64>,
	pub bars: Vec<i64>,
}

#[fixture]
pub fn owner_world() -> OwnerWorld {
	let db = MemoryDatabase::new();
	db.register_foreign_key("Owner", "foo", "Foo");
	db.register_many_to_many("Owner", "foes", "Foo");
	db.register_many_to_many("Owner", "bars", "Bar");

	let foo = db.insert("Foo", json!({"bar": "test", "creator": 1}));
	let owner = db.insert("Owner", json!({"foo": foo}));

	let mut foes = Vec::new();
	let mut matching = Vec::new();
	for bar in ["test_1", "other_1", "test_2", "other_2", "test_3"] {
		let id = db.insert("Foo", json!({"bar": bar, "creator": 2}));
		db.link("Owner", "foes", owner, id);
		if bar.starts_with("test") {
			matching.push(id);
		}
		foes.push(id);
	}

	let bars: Vec<i64> = ["a", "b"]
		.iter()
		.map(|name| db.insert("Bar", json!({"name": name})))
		.collect();
	for id in &bars {
		db.link("Owner", "bars", owner, *id);
	}

	OwnerWorld {
		db,
		owner,
		foo,
		foes,
		matching,
		bars,
	}
}
