//! Expression tree tests
//!
//! Predicates, rewrites, sorting and subqueries driven only through the
//! public API, the way an executor would use them.

use pretty_assertions::assert_eq;
use refract::execution::{ProjectPlan, QueryPlanRef, ValuesPlan};
use refract::expression::{
    evaluate_condition, field, lit, transform_up, Arithmetic, BitOp, Case, CaseBranch,
    Comparison, InTuple, IsNull, Literal, Logic, Not, SortField, Sorter, Subquery,
};
use refract::{
    row, ExecutionContext, Expression, ExpressionRef, LogicalType, RefractError, RefractResult,
    Row, Value,
};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `a > 10 AND NOT(b IS NULL)`
fn filter() -> ExpressionRef {
    let a = field(0, LogicalType::BigInt, "a");
    let b = field(1, LogicalType::text(), "b");
    Arc::new(Logic::and(
        Arc::new(Comparison::greater_than(a, lit(10i64))),
        Arc::new(Not::new(Arc::new(IsNull::new(b)))),
    ))
}

#[test]
fn test_filter_uses_three_valued_logic() -> RefractResult<()> {
    let ctx = ExecutionContext::with_default_session();
    let filter = filter();
    assert_eq!(filter.to_string(), "((a > 10) AND NOT(b IS NULL))");

    assert_eq!(evaluate_condition(&ctx, filter.as_ref(), &row![42i64, "x"])?, Some(true));
    assert_eq!(evaluate_condition(&ctx, filter.as_ref(), &row![1i64, "x"])?, Some(false));
    assert_eq!(evaluate_condition(&ctx, filter.as_ref(), &row![Value::Null, "x"])?, None);
    // a NULL left side does not survive a false right side
    assert_eq!(
        evaluate_condition(&ctx, filter.as_ref(), &row![Value::Null, Value::Null])?,
        Some(false)
    );
    Ok(())
}

#[test]
fn test_constant_rewrite_leaves_original_tree() -> RefractResult<()> {
    let ctx = ExecutionContext::with_default_session();
    let filter = filter();
    let raised = transform_up(&filter, &mut |node| {
        match node.as_any().downcast_ref::<Literal>() {
            Some(literal) if literal.value() == &Value::BigInt(10) => Ok(lit(100i64)),
            _ => Ok(node),
        }
    })?;

    assert_eq!(raised.to_string(), "((a > 100) AND NOT(b IS NULL))");
    assert_eq!(filter.to_string(), "((a > 10) AND NOT(b IS NULL))");
    assert_eq!(raised.evaluate(&ctx, &row![42i64, "x"])?, Value::Boolean(false));
    Ok(())
}

#[test]
fn test_case_picks_first_matching_arm() -> RefractResult<()> {
    let ctx = ExecutionContext::with_default_session();
    let a = field(0, LogicalType::BigInt, "a");
    let case = Case::new(
        None,
        vec![
            CaseBranch::new(Arc::new(Comparison::less_than(a.clone(), lit(0i64))), lit("negative")),
            CaseBranch::new(Arc::new(Comparison::equals(a, lit(0i64))), lit("zero")),
        ],
        Some(lit("positive")),
    );
    assert_eq!(case.evaluate(&ctx, &row![-3i64])?, Value::varchar("negative"));
    assert_eq!(case.evaluate(&ctx, &row![0i64])?, Value::varchar("zero"));
    assert_eq!(case.evaluate(&ctx, &row![9i64])?, Value::varchar("positive"));
    assert_eq!(case.evaluate(&ctx, &row![Value::Null])?, Value::varchar("positive"));
    Ok(())
}

#[test]
fn test_sort_on_computed_key() -> RefractResult<()> {
    init_tracing();
    let ctx = ExecutionContext::with_default_session();
    // ORDER BY a % 3, a DESC
    let a = field(0, LogicalType::BigInt, "a");
    let sorter = Sorter::new(
        &ctx,
        vec![
            SortField::ascending(Arc::new(Arithmetic::modulo(a.clone(), lit(3i64)))),
            SortField::descending(a),
        ],
    );
    let mut rows: Vec<Row> = (1..=6i64).map(|i| row![i]).collect();
    sorter.sort(&mut rows)?;
    assert_eq!(
        rows,
        vec![row![6i64], row![3i64], row![4i64], row![1i64], row![5i64], row![2i64]]
    );
    Ok(())
}

#[test]
fn test_sort_surfaces_first_key_error() {
    init_tracing();
    let ctx = ExecutionContext::with_default_session();
    let overflow = Arc::new(Arithmetic::mult(field(0, LogicalType::BigInt, "a"), lit(i64::MAX)));
    let sorter = Sorter::new(&ctx, vec![SortField::ascending(overflow)]);
    let mut rows = vec![row![2i64], row![3i64], row![4i64]];
    assert!(matches!(sorter.sort(&mut rows), Err(RefractError::OutOfRange(_))));
}

#[test]
fn test_scalar_subquery_rejects_many_rows() -> RefractResult<()> {
    init_tracing();
    let ctx = ExecutionContext::with_default_session();
    let blank: QueryPlanRef = Arc::new(ValuesPlan::new(0, vec![Row::empty(), Row::empty()]));
    let plan: QueryPlanRef = Arc::new(ProjectPlan::new(blank, vec![lit(1i32)]));
    let subquery: ExpressionRef = Arc::new(Subquery::new(plan, 0, LogicalType::Integer));

    let compared = Comparison::equals(lit(1i32), subquery.clone());
    assert!(matches!(
        compared.evaluate(&ctx, &Row::empty()),
        Err(RefractError::TooManyRows)
    ));

    // the same plan feeds IN without complaint
    let membership = InTuple::new(lit(1i32), subquery);
    assert_eq!(membership.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));
    Ok(())
}

#[test]
fn test_bit_operations_compose() -> RefractResult<()> {
    let ctx = ExecutionContext::with_default_session();
    let flags = field(0, LogicalType::UBigInt, "flags");
    // (flags >> 4) & 15
    let nibble = BitOp::bit_and(
        Arc::new(BitOp::shift_right(flags, lit(4u64))),
        lit(15u64),
    );
    assert_eq!(nibble.evaluate(&ctx, &row![0xABu64])?, Value::UBigInt(0xA));
    assert_eq!(nibble.evaluate(&ctx, &row![Value::Null])?, Value::Null);
    assert_eq!(nibble.to_string(), "((flags >> 4) & 15)");
    Ok(())
}
