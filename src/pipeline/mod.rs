//! Validation and parameter-normalization pipeline shared by every resource.

pub mod extract;
pub mod field;
pub mod found;
pub mod normalize;
pub mod schema;
pub mod wrapper;

pub use extract::{Filter, ParentIds, Paging, QueryMap, QueryParams};
pub use field::{Field, FieldMap};
pub use found::{check_entity_found, require_found};
pub use normalize::remove_undefined_values;
pub use schema::{Constraint, FieldViolation, Rule, Schema, ValidationFailure};
pub use wrapper::{Call, Guarded};
