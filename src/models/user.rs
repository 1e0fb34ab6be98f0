use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{declares_id, Resource};
use crate::pipeline::{Field, FieldMap, Filter, Rule, Schema};

/// Wire structure for a user.
///
/// Non-nullable columns are plain `Option`s: `None` means the key was not
/// sent. Nullable columns use `Field` so a patch can clear them with `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UsersWs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(email)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Field::is_undefined")]
    pub phone_number: Field<String>,
    #[validate(length(max = 255))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Field::is_undefined")]
    pub address2: Field<String>,
    #[validate(length(max = 50))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

pub struct Users;

impl Users {
    fn write_schema(id: Rule, presence: fn(Rule) -> Rule) -> Schema {
        Schema::object()
            .key("id", id)
            .key("email", presence(Rule::string()))
            .key("firstName", presence(Rule::string()))
            .key("lastName", presence(Rule::string()))
            .key("phoneNumber", Rule::string().optional().allow_null())
            .key("address1", presence(Rule::string()))
            .key("address2", Rule::string().optional().allow_null())
            .key("state", presence(Rule::string()))
            .key("postcode", presence(Rule::string()))
            .key("createdAt", Rule::date().forbidden())
            .key("updatedAt", Rule::date().forbidden())
            .key("deletedAt", Rule::date().forbidden())
    }
}

impl Resource for Users {
    const NAME: &'static str = "Users";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "firstName",
        "lastName",
        "phoneNumber",
        "address1",
        "address2",
        "state",
        "postcode",
        "createdAt",
        "updatedAt",
        "deletedAt",
    ];
    const UPDATABLE: &'static [&'static str] = &[
        "email",
        "firstName",
        "lastName",
        "phoneNumber",
        "address1",
        "address2",
        "state",
        "postcode",
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::number("id"),
        Filter::text("email"),
        Filter::text("firstName"),
        Filter::text("lastName"),
        Filter::text("phoneNumber"),
        Filter::text("address1"),
        Filter::text("address2"),
        Filter::text("state"),
        Filter::text("postcode"),
    ];

    type Ws = UsersWs;

    fn create_schema() -> Schema {
        Self::write_schema(Rule::number().forbidden(), Rule::required)
    }

    fn update_schema(path_id: i64, ws: &FieldMap) -> Schema {
        Self::write_schema(Rule::id_matching(path_id, declares_id(ws)), Rule::required)
    }

    fn patch_schema(path_id: i64, ws: &FieldMap) -> Schema {
        Self::write_schema(Rule::id_matching(path_id, declares_id(ws)), Rule::optional)
    }
}
