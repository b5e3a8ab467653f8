//! Boolean search query compiler.
//!
//! A search request carries a JSON expression tree of `and` / `or` / `not`
//! combinators over field-substring predicates, e.g.
//! `{"and": [{"matters": "politics"}, {"not": {"tags": "sports"}}]}`.
//! [`parse_tree`] validates the tree into a [`QueryNode`]; [`compile`] turns
//! it into a SeaORM [`sea_orm::Condition`] over the catalog columns, which
//! storage runs in primary-key order.
//!
//! Grammar notes:
//! - every node is an object with exactly one key: `and`, `or`, `not`, or an
//!   enumerated field name; anything else is rejected, never guessed at
//! - `and` / `or` take a non-empty list of nodes
//! - `not` wraps a single field predicate; negating a combinator is outside
//!   the grammar and rejected
//! - field matching is case-insensitive substring containment over the
//!   field's textual representation (integers compared via their text form)

pub mod compile;
pub mod errors;
pub mod fields;
pub mod tree;

pub use compile::compile;
pub use errors::QueryError;
pub use fields::CatalogField;
pub use tree::{parse_tree, FieldPredicate, QueryNode};
