//! Plan builder (spec §4.7) and executor: `Scan -> optional Filter ->
//! Project`, represented as a tagged enum per Design Notes §9 rather than an
//! inheritance hierarchy, and run by one `execute` dispatcher.

use crate::catalog::TableSchema;
use crate::error::EngineResult;
use crate::iterator::{scan::DEFAULT_BATCH_SIZE, FilterIterator, ProjectIterator, RowIter, ScanIterator};
use crate::sql::{CompiledPredicate, PlanDescriptor, Projection};

pub enum Plan {
    Scan {
        db: String,
        table: String,
        schema: TableSchema,
        batch_size: usize,
    },
    Filter {
        child: Box<Plan>,
        predicate: CompiledPredicate,
    },
    Project {
        child: Box<Plan>,
        indices: Vec<i64>,
    },
}

/// Translates a validated `PlanDescriptor` into an executable `Plan` (spec
/// §4.7 "Projection translation"): named columns resolve to their schema
/// position, wildcard resolves to the identity ordering, and an unresolved
/// name falls back to `-1` (dead code for an accepted query — the validator
/// already rejected unknown columns — kept for the Project iterator's
/// defensive contract).
pub fn build(descriptor: &PlanDescriptor, db: &str, schema: &TableSchema) -> Plan {
    let scan = Plan::Scan {
        db: db.to_string(),
        table: descriptor.table.clone(),
        schema: schema.clone(),
        batch_size: DEFAULT_BATCH_SIZE,
    };

    let filtered = match &descriptor.predicate {
        Some(predicate) => Plan::Filter {
            child: Box::new(scan),
            predicate: predicate.clone(),
        },
        None => scan,
    };

    let indices = match &descriptor.projection {
        Projection::Wildcard => (0..schema.columns.len() as i64).collect(),
        Projection::Columns(cols) => cols
            .iter()
            .map(|name| schema.index_of(name).map(|i| i as i64).unwrap_or(-1))
            .collect(),
    };

    Plan::Project {
        child: Box::new(filtered),
        indices,
    }
}

pub fn execute(plan: Plan) -> EngineResult<RowIter> {
    match plan {
        Plan::Scan { db, table, schema, batch_size } => {
            let scan = ScanIterator::new(&db, &table, &schema, batch_size)?;
            Ok(Box::new(scan))
        }
        Plan::Filter { child, predicate } => {
            let child_iter = execute(*child)?;
            Ok(Box::new(FilterIterator::new(child_iter, Some(predicate))))
        }
        Plan::Project { child, indices } => {
            let child_iter = execute(*child)?;
            Ok(Box::new(ProjectIterator::new(child_iter, indices)))
        }
    }
}
