//! Validation of the JSON expression tree into a typed [`QueryNode`].

use serde_json::Value;

use crate::query::errors::QueryError;
use crate::query::fields::CatalogField;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Conjunction over a non-empty, ordered child list.
    And(Vec<QueryNode>),
    /// Disjunction over a non-empty, ordered child list.
    Or(Vec<QueryNode>),
    /// Negation of a single field predicate. Combinators cannot be negated.
    Not(FieldPredicate),
    /// Leaf: substring containment on one catalog field.
    Match(FieldPredicate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field: CatalogField,
    pub needle: String,
}

/// Parse a query tree from its JSON form.
///
/// Every node must be an object carrying exactly one recognized key; a node
/// with zero keys, several keys, or a key that is neither a combinator nor
/// an enumerated field name is malformed.
pub fn parse_tree(value: &Value) -> Result<QueryNode, QueryError> {
    let node = value
        .as_object()
        .ok_or_else(|| QueryError::InvalidShape("query node must be a JSON object".into()))?;
    if node.len() != 1 {
        return Err(QueryError::InvalidShape(format!(
            "query node must have exactly one key, got {}",
            node.len()
        )));
    }
    let (key, inner) = node
        .iter()
        .next()
        .ok_or_else(|| QueryError::InvalidShape("query node must not be empty".into()))?;

    match key.as_str() {
        "and" => Ok(QueryNode::And(parse_children(inner, "and")?)),
        "or" => Ok(QueryNode::Or(parse_children(inner, "or")?)),
        "not" => Ok(QueryNode::Not(parse_negated(inner)?)),
        name => Ok(QueryNode::Match(parse_predicate(name, inner)?)),
    }
}

fn parse_children(value: &Value, op: &str) -> Result<Vec<QueryNode>, QueryError> {
    let children = value.as_array().ok_or_else(|| {
        QueryError::InvalidShape(format!("`{op}` expects a list of query nodes"))
    })?;
    if children.is_empty() {
        return Err(QueryError::InvalidShape(format!(
            "`{op}` requires at least one child"
        )));
    }
    children.iter().map(parse_tree).collect()
}

fn parse_negated(value: &Value) -> Result<FieldPredicate, QueryError> {
    let node = value.as_object().ok_or_else(|| {
        QueryError::InvalidShape("`not` expects a single field predicate".into())
    })?;
    if node.len() != 1 {
        return Err(QueryError::InvalidShape(format!(
            "`not` expects a single field predicate, got {} keys",
            node.len()
        )));
    }
    let (key, inner) = node
        .iter()
        .next()
        .ok_or_else(|| QueryError::InvalidShape("`not` must not be empty".into()))?;

    // A combinator under `not` is outside the grammar; reject it rather
    // than reinterpreting the tree.
    if matches!(key.as_str(), "and" | "or" | "not") {
        return Err(QueryError::InvalidShape(format!(
            "`not` cannot wrap `{key}`, only a field predicate"
        )));
    }
    parse_predicate(key, inner)
}

fn parse_predicate(name: &str, value: &Value) -> Result<FieldPredicate, QueryError> {
    let field = CatalogField::resolve(name)?;
    let needle = value.as_str().ok_or_else(|| {
        QueryError::InvalidShape(format!("field `{name}` expects a string to match"))
    })?;
    Ok(FieldPredicate {
        field,
        needle: needle.to_string(),
    })
}
