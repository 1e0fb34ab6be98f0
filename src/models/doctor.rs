use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{declares_id, Resource};
use crate::pipeline::schema::parse_date;
use crate::pipeline::{Call, Field, FieldMap, Filter, Rule, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PracticeType {
    Gp,
    Specialist,
    Dentist,
}

impl PracticeType {
    pub const ALL: [&'static str; 3] = ["GP", "SPECIALIST", "DENTIST"];
}

/// Wire structure for a doctor. Doctors belong to a user (`UserId`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DoctorsWs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "UserId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[validate(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Field::is_undefined")]
    pub phone_number: Field<String>,
    #[validate(length(min = 3, max = 32))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_no: Option<String>,
    #[serde(
        default,
        deserialize_with = "date_or_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_expiry: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_type: Option<PracticeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

// Accepts `2030-06-30` as well as a full RFC 3339 timestamp.
fn date_or_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) => parse_date(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date `{}`", text))),
    }
}

pub struct Doctors;

impl Doctors {
    fn write_schema(id: Rule, user_id: Rule, presence: fn(Rule) -> Rule) -> Schema {
        Schema::object()
            .key("id", id)
            .key("UserId", user_id)
            .key("firstName", presence(Rule::string()))
            .key("lastName", presence(Rule::string()))
            .key("phoneNumber", Rule::string().optional().allow_null())
            .key("licenseNo", presence(Rule::string()))
            .key("licenseExpiry", presence(Rule::date()))
            .key(
                "practiceType",
                presence(Rule::string().valid(PracticeType::ALL)),
            )
            .key("createdAt", Rule::date().forbidden())
            .key("updatedAt", Rule::date().forbidden())
            .key("deletedAt", Rule::date().forbidden())
    }
}

impl Resource for Doctors {
    const NAME: &'static str = "Doctors";
    const TABLE: &'static str = "doctors";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "UserId",
        "firstName",
        "lastName",
        "phoneNumber",
        "licenseNo",
        "licenseExpiry",
        "practiceType",
        "createdAt",
        "updatedAt",
        "deletedAt",
    ];
    const UPDATABLE: &'static [&'static str] = &[
        "firstName",
        "lastName",
        "phoneNumber",
        "licenseNo",
        "licenseExpiry",
        "practiceType",
    ];
    const FILTERS: &'static [Filter] = &[
        Filter::number("id"),
        Filter::number("UserId"),
        Filter::text("firstName"),
        Filter::text("lastName"),
        Filter::text("licenseNo"),
        Filter::text("practiceType"),
    ];

    type Ws = DoctorsWs;

    fn create_schema() -> Schema {
        Self::write_schema(
            Rule::number().forbidden(),
            Rule::number().required(),
            Rule::required,
        )
    }

    fn update_schema(path_id: i64, ws: &FieldMap) -> Schema {
        Self::write_schema(
            Rule::id_matching(path_id, declares_id(ws)),
            Rule::number().forbidden(),
            Rule::required,
        )
    }

    fn patch_schema(path_id: i64, ws: &FieldMap) -> Schema {
        Self::write_schema(
            Rule::id_matching(path_id, declares_id(ws)),
            Rule::number().forbidden(),
            Rule::optional,
        )
    }

    fn parent_ids_schema() -> Schema {
        Schema::object().key("UserId", Rule::number().required())
    }

    /// A doctor created under `/users/{UserId}/doctors` always belongs to
    /// that user, whatever the body says.
    fn prepare_create(call: &mut Call<FieldMap>) {
        let parent = call
            .parent_ids
            .as_ref()
            .and_then(|ids| ids.get("UserId"))
            .and_then(Field::as_value)
            .and_then(|v| match v {
                Value::String(s) => s.parse::<i64>().ok().map(Value::from),
                Value::Number(_) => Some(v.clone()),
                _ => None,
            });
        if let Some(user_id) = parent {
            call.args.insert("UserId".to_string(), Field::Value(user_id));
        }
    }
}
