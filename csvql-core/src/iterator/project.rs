use crate::error::EngineError;
use crate::iterator::{Row, RowIter};
use crate::types::CellValue;

/// The Project iterator (spec §4.5): reorders/selects columns by index.
/// An index of `-1` yields `Null` — reserved for defensive coding, never
/// emitted by the validator for an accepted query. A child `Err` is passed
/// straight through, unprojected.
pub struct ProjectIterator {
    child: RowIter,
    indices: Vec<i64>,
}

impl ProjectIterator {
    pub fn new(child: RowIter, indices: Vec<i64>) -> Self {
        ProjectIterator { child, indices }
    }
}

impl Iterator for ProjectIterator {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Result<Row, EngineError>> {
        let row = match self.child.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(self
            .indices
            .iter()
            .map(|&i| {
                if i < 0 {
                    CellValue::Null
                } else {
                    row.get(i as usize).cloned().unwrap_or(CellValue::Null)
                }
            })
            .collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorders_columns_by_index() {
        let rows: RowIter = Box::new(
            vec![Ok(vec![
                CellValue::Integer(1),
                CellValue::String("a".into()),
                CellValue::Boolean(true),
            ])]
            .into_iter(),
        );
        let mut project = ProjectIterator::new(rows, vec![2, 0]);
        assert_eq!(
            project.next(),
            Some(Ok(vec![CellValue::Boolean(true), CellValue::Integer(1)]))
        );
    }

    #[test]
    fn negative_index_yields_null() {
        let rows: RowIter = Box::new(vec![Ok(vec![CellValue::Integer(1)])].into_iter());
        let mut project = ProjectIterator::new(rows, vec![-1, 0]);
        assert_eq!(
            project.next(),
            Some(Ok(vec![CellValue::Null, CellValue::Integer(1)]))
        );
    }

    #[test]
    fn mid_stream_error_passes_through_unprojected() {
        let rows: RowIter = Box::new(vec![Err(EngineError::data_access("boom"))].into_iter());
        let mut project = ProjectIterator::new(rows, vec![0]);
        assert!(project.next().unwrap().is_err());
    }
}
