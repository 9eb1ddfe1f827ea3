//! Tree traversal and rewriting
//!
//! Rewrites never touch existing nodes: `transform_up` rebuilds every
//! ancestor of a replaced node through `with_children` and hands back a new
//! root.

use crate::common::error::RefractResult;
use crate::expression::ExpressionRef;
use std::sync::Arc;

/// Apply `rule` to every node bottom-up. Children are transformed first,
/// the parent is rebuilt over them when any of them changed, and the rule
/// then sees the rebuilt parent. The first error aborts the rewrite.
pub fn transform_up(
    expr: &ExpressionRef,
    rule: &mut dyn FnMut(ExpressionRef) -> RefractResult<ExpressionRef>,
) -> RefractResult<ExpressionRef> {
    let children = expr.children();
    let node = if children.is_empty() {
        expr.clone()
    } else {
        let mut changed = false;
        let mut rewritten = Vec::with_capacity(children.len());
        for child in &children {
            let new_child = transform_up(child, rule)?;
            changed |= !Arc::ptr_eq(child, &new_child);
            rewritten.push(new_child);
        }
        if changed {
            expr.with_children(rewritten)?
        } else {
            expr.clone()
        }
    };
    rule(node)
}

/// Visit nodes pre-order. Returning `false` from `visit` skips that node's
/// children.
pub fn inspect(expr: &ExpressionRef, visit: &mut dyn FnMut(&ExpressionRef) -> bool) {
    if visit(expr) {
        for child in expr.children() {
            inspect(&child, visit);
        }
    }
}

/// Every node of the tree, pre-order
pub fn walk(expr: &ExpressionRef) -> Vec<ExpressionRef> {
    let mut nodes = Vec::new();
    inspect(expr, &mut |node| {
        nodes.push(node.clone());
        true
    });
    nodes
}
