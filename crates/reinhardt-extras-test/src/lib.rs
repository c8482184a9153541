//! # Reinhardt Extras Test
//!
//! Testing utilities for reinhardt-extras.
//!
//! - [`MemoryDatabase`]: an in-memory ORM implementing the query collaborator
//!   traits, counting every evaluated query
//! - [`TestExpr`]: the expressions it can compute
//! - [`RequestFactory`]: builds requests against `http://testserver`
//!
//! ```rust,ignore
//! let db = MemoryDatabase::new();
//! db.register_many_to_many("Many", "foes", "Foo");
//! let foo = db.insert("Foo", json!({"bar": "test"}));
//! let many = db.insert("Many", json!({}));
//! db.link("Many", "foes", many, foo);
//!
//! db.reset_queries();
//! let rows = db.objects("Many").fetch()?;
//! assert_eq!(db.query_count(), 1);
//! ```

pub mod database;
pub mod expression;
pub mod factory;

pub use database::{MemoryDatabase, MemoryQuerySet, Record, record_values};
pub use expression::TestExpr;
pub use factory::{RequestFactory, TEST_SERVER};
