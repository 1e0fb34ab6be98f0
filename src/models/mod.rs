//! Resource definitions: wire structures, list filters and per-operation
//! validation schemas.

pub mod doctor;
pub mod user;

pub use doctor::{Doctors, DoctorsWs, PracticeType};
pub use user::{Users, UsersWs};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use validator::Validate;

use crate::pipeline::field::into_json_object;
use crate::pipeline::{
    remove_undefined_values, Call, Constraint, FieldMap, Filter, Rule, Schema, ValidationFailure,
};

/// Columns the storage layer fills in itself.
pub const GENERATED_COLUMNS: &[&str] = &["id", "createdAt", "updatedAt", "deletedAt"];

/// One CRUD resource.
///
/// The service, controller and DAO layers are generic over this trait; a
/// resource only declares its shape and the schema for each operation.
pub trait Resource: Send + Sync + 'static {
    /// Name used in logs and not-found failures.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Every column exposed on the wire.
    const COLUMNS: &'static [&'static str];
    /// Columns a full update replaces; absent ones are cleared.
    const UPDATABLE: &'static [&'static str];
    /// Query keys the list endpoint turns into filters.
    const FILTERS: &'static [Filter];

    type Ws: Serialize
        + DeserializeOwned
        + Validate
        + Clone
        + fmt::Debug
        + Send
        + Sync
        + 'static;

    /// List filters are not restricted yet; resources override this to
    /// enforce per-filter rules.
    fn list_schema() -> Schema {
        Schema::permissive()
    }

    fn get_schema() -> Schema {
        Schema::object()
            .key("id", Rule::number().required())
            .key("join", Rule::object().optional())
    }

    fn create_schema() -> Schema;

    fn update_schema(path_id: i64, ws: &FieldMap) -> Schema;

    fn patch_schema(path_id: i64, ws: &FieldMap) -> Schema;

    fn delete_schema() -> Schema {
        Schema::object().key("id", Rule::number().required())
    }

    /// Parent ids a nested route may carry. No keys means none are accepted.
    fn parent_ids_schema() -> Schema {
        Schema::object()
    }

    /// Fills in server-side defaults before create validation runs.
    fn prepare_create(_call: &mut Call<FieldMap>) {}
}

/// Whether the incoming write structure carries an `id` key.
pub fn declares_id(ws: &FieldMap) -> bool {
    ws.get("id").map_or(false, |field| !field.is_undefined())
}

/// Converts a schema-checked write map into the resource's typed WS and
/// applies its content rules.
pub fn to_ws<R: Resource>(fields: &FieldMap, schema: &Schema) -> Result<R::Ws, ValidationFailure> {
    let mut fields = fields.clone();
    remove_undefined_values(&mut fields);
    schema.coerce(&mut fields);

    let object = Value::Object(into_json_object(fields));
    let ws: R::Ws = serde_json::from_value(object)
        .map_err(|e| ValidationFailure::single("body", Constraint::Type, e.to_string()))?;
    ws.validate()?;
    Ok(ws)
}
