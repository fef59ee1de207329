pub mod predicate;
pub mod validator;

pub use predicate::CompiledPredicate;
pub use validator::{extract_table_name, parse_and_validate, PlanDescriptor, Projection};
