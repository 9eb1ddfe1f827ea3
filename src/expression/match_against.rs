//! `MATCH (cols) AGAINST (words [modifier])` full-text predicate

use crate::common::error::{RefractError, RefractResult};
use crate::execution::{ExactRange, ExecutionContext, IndexedTableRef};
use crate::expression::shape::{check_arity, join_display};
use crate::expression::{Expression, ExpressionRef};
use crate::not_implemented_err;
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchModifier {
    #[default]
    NaturalLanguage,
    NaturalLanguageWithQueryExpansion,
    Boolean,
    QueryExpansion,
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchModifier::NaturalLanguage => "IN NATURAL LANGUAGE MODE",
            SearchModifier::NaturalLanguageWithQueryExpansion => {
                "IN NATURAL LANGUAGE MODE WITH QUERY EXPANSION"
            }
            SearchModifier::Boolean => "IN BOOLEAN MODE",
            SearchModifier::QueryExpansion => "WITH QUERY EXPANSION",
        })
    }
}

/// Full-text relevance of the current row: 1.0 when any search word
/// appears in the row's document, 0.0 otherwise.
///
/// Words are looked up in a word index whose leading columns are
/// `(word, document id)`; the document id is read from the evaluated row at
/// `doc_id_column`. Only natural language mode is supported.
#[derive(Debug, Clone)]
pub struct MatchAgainst {
    columns: Vec<ExpressionRef>,
    search: ExpressionRef,
    modifier: SearchModifier,
    word_index: Option<IndexedTableRef>,
    doc_id_column: usize,
}

impl MatchAgainst {
    pub fn new(columns: Vec<ExpressionRef>, search: ExpressionRef, modifier: SearchModifier) -> Self {
        Self {
            columns,
            search,
            modifier,
            word_index: None,
            doc_id_column: 0,
        }
    }

    /// Bind the word index and the position of the document id in each row
    pub fn with_index(mut self, word_index: IndexedTableRef, doc_id_column: usize) -> Self {
        self.word_index = Some(word_index);
        self.doc_id_column = doc_id_column;
        self
    }

    pub fn modifier(&self) -> SearchModifier {
        self.modifier
    }

    fn natural_language(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let words = match self.search.evaluate(ctx, row)? {
            Value::Varchar(words) => words,
            other => {
                return Err(RefractError::Type(format!(
                    "expected search words to be a string, found {}",
                    other.logical_type()
                )))
            }
        };
        let index = self.word_index.as_ref().ok_or_else(|| {
            RefractError::Execution(format!("no full-text index bound for {}", self))
        })?;
        let doc_id = row.field(self.doc_id_column)?.clone();

        for word in words.split_whitespace() {
            let range = ExactRange::new(vec![Value::varchar(word), doc_id.clone()]);
            let mut hits = index.lookup(ctx, &range)?;
            let first = hits.next(ctx);
            hits.close(ctx)?;
            if first?.is_some() {
                tracing::trace!(word, index = index.name(), "full-text match");
                return Ok(Value::Float(1.0));
            }
        }
        Ok(Value::Float(0.0))
    }
}

impl fmt::Display for MatchAgainst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MATCH (")?;
        join_display(f, &self.columns, ",")?;
        write!(f, ") AGAINST ({} {})", self.search, self.modifier)
    }
}

impl Expression for MatchAgainst {
    fn return_type(&self) -> LogicalType {
        LogicalType::Float
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        match self.modifier {
            SearchModifier::NaturalLanguage => self.natural_language(ctx, row),
            other => Err(not_implemented_err!("'{}' has not yet been implemented", other)),
        }
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        let mut children = self.columns.clone();
        children.push(self.search.clone());
        children
    }

    fn with_children(&self, mut children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, self.columns.len() + 1)?;
        let search = children
            .pop()
            .ok_or_else(|| RefractError::invalid_children(self, 0, self.columns.len() + 1))?;
        Ok(Arc::new(MatchAgainst {
            columns: children,
            search,
            modifier: self.modifier,
            word_index: self.word_index.clone(),
            doc_id_column: self.doc_id_column,
        }))
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::MemoryIndexedTable;
    use crate::expression::{field, lit};
    use crate::row;
    use pretty_assertions::assert_eq;

    fn word_index() -> IndexedTableRef {
        let index = MemoryIndexedTable::new("ft_word_to_pos");
        index.insert(row!["apple", 1i64, 0i64]);
        index.insert(row!["pie", 1i64, 6i64]);
        index.insert(row!["pear", 2i64, 0i64]);
        Arc::new(index)
    }

    fn search(words: &str, modifier: SearchModifier) -> MatchAgainst {
        MatchAgainst::new(vec![field(1, LogicalType::text(), "body")], lit(words), modifier)
            .with_index(word_index(), 0)
    }

    #[test]
    fn test_natural_language_mode() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let doc1 = row![1i64, "apple pie"];
        let doc2 = row![2i64, "pear"];

        let expr = search("kiwi apple", SearchModifier::NaturalLanguage);
        assert_eq!(expr.evaluate(&ctx, &doc1)?, Value::Float(1.0));
        assert_eq!(expr.evaluate(&ctx, &doc2)?, Value::Float(0.0));
        assert!(!expr.is_nullable());
        Ok(())
    }

    #[test]
    fn test_other_modes_are_not_implemented() {
        let ctx = ExecutionContext::with_default_session();
        let expr = search("apple", SearchModifier::Boolean);
        match expr.evaluate(&ctx, &row![1i64, "apple"]) {
            Err(RefractError::NotImplemented(message)) => {
                assert_eq!(message, "'IN BOOLEAN MODE' has not yet been implemented")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_display_and_rebuild() -> RefractResult<()> {
        let expr = search("apple", SearchModifier::NaturalLanguage);
        assert_eq!(
            expr.to_string(),
            "MATCH (body) AGAINST ('apple' IN NATURAL LANGUAGE MODE)"
        );
        let rebuilt = expr.with_children(vec![
            field(1, LogicalType::text(), "title"),
            lit("pear"),
        ])?;
        assert_eq!(
            rebuilt.to_string(),
            "MATCH (title) AGAINST ('pear' IN NATURAL LANGUAGE MODE)"
        );
        assert!(expr.with_children(vec![lit("x")]).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_index_is_an_error() {
        let ctx = ExecutionContext::with_default_session();
        let expr = MatchAgainst::new(vec![], lit("apple"), SearchModifier::NaturalLanguage);
        assert!(matches!(
            expr.evaluate(&ctx, &row![1i64]),
            Err(RefractError::Execution(_))
        ));
    }
}
