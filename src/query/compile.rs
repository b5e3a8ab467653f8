//! Lowering of a validated [`QueryNode`] into a SeaORM [`Condition`].
//!
//! The compiler imposes no ordering of its own; callers run the condition
//! and order by primary key.

use sea_orm::Condition;

use crate::query::tree::{FieldPredicate, QueryNode};

pub fn compile(node: &QueryNode) -> Condition {
    match node {
        QueryNode::And(children) => children
            .iter()
            .fold(Condition::all(), |cond, child| cond.add(compile(child))),
        QueryNode::Or(children) => children
            .iter()
            .fold(Condition::any(), |cond, child| cond.add(compile(child))),
        QueryNode::Not(pred) => Condition::all().add(contains(pred)).not(),
        QueryNode::Match(pred) => Condition::all().add(contains(pred)),
    }
}

fn contains(pred: &FieldPredicate) -> sea_orm::sea_query::SimpleExpr {
    pred.field.contains(&pred.needle)
}
