use crate::error::EngineError;
use crate::iterator::{Row, RowIter};
use crate::sql::predicate::CompiledPredicate;

/// The Filter iterator (spec §4.4): wraps a child iterator and yields only
/// rows for which the predicate holds. A `None` predicate is a passthrough,
/// matching the "null predicate" case in the spec. A child `Err` (a
/// mid-stream `DataAccessError` from the Scan below) is passed straight
/// through and ends the iteration, never evaluated against the predicate.
pub struct FilterIterator {
    child: RowIter,
    predicate: Option<CompiledPredicate>,
}

impl FilterIterator {
    pub fn new(child: RowIter, predicate: Option<CompiledPredicate>) -> Self {
        FilterIterator { child, predicate }
    }
}

impl Iterator for FilterIterator {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Result<Row, EngineError>> {
        match &self.predicate {
            None => self.child.next(),
            Some(pred) => {
                for item in self.child.by_ref() {
                    match item {
                        Ok(row) => {
                            if pred.eval(&row) {
                                return Some(Ok(row));
                            }
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::predicate::{CompareMode, CompareOp};
    use crate::types::CellValue;

    #[test]
    fn passthrough_with_no_predicate() {
        let rows: RowIter = Box::new(vec![Ok(vec![CellValue::Integer(1)])].into_iter());
        let mut filter = FilterIterator::new(rows, None);
        assert_eq!(filter.next(), Some(Ok(vec![CellValue::Integer(1)])));
    }

    #[test]
    fn filters_rows_not_matching_predicate() {
        let rows: RowIter = Box::new(
            vec![
                Ok(vec![CellValue::Integer(1)]),
                Ok(vec![CellValue::Integer(2)]),
                Ok(vec![CellValue::Integer(3)]),
            ]
            .into_iter(),
        );
        let pred = CompiledPredicate::CmpColLit {
            col: 0,
            op: CompareOp::Gt,
            mode: CompareMode::Numeric,
            literal: CellValue::Integer(1),
        };
        let filter = FilterIterator::new(rows, Some(pred));
        let out: Vec<_> = filter.map(|r| r.unwrap()).collect();
        assert_eq!(out, vec![vec![CellValue::Integer(2)], vec![CellValue::Integer(3)]]);
    }

    #[test]
    fn mid_stream_error_passes_through_without_being_evaluated() {
        let rows: RowIter = Box::new(
            vec![
                Ok(vec![CellValue::Integer(5)]),
                Err(EngineError::data_access("boom")),
            ]
            .into_iter(),
        );
        let pred = CompiledPredicate::CmpColLit {
            col: 0,
            op: CompareOp::Gt,
            mode: CompareMode::Numeric,
            literal: CellValue::Integer(0),
        };
        let mut filter = FilterIterator::new(rows, Some(pred));
        assert_eq!(filter.next(), Some(Ok(vec![CellValue::Integer(5)])));
        assert!(filter.next().unwrap().is_err());
    }
}
