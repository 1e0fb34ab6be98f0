//! Turns raw request pieces (query string, path segments, JSON body) into
//! the structures the service layer validates.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::field::{from_json_object, Field, FieldMap};
use super::schema::{Constraint, ValidationFailure};
use crate::error::AppError;

lazy_static! {
    // Column identifiers accepted for `orderBy`.
    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap();
}

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw query-string mapping as received by the controller.
pub type QueryMap = HashMap<String, String>;

/// Parent resource name to id, taken from nested route segments.
pub type ParentIds = FieldMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Pagination and sorting shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page: u32,
    pub page_size: u32,
    pub order_by: Option<String>,
    pub order_direction: OrderDirection,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: None,
            order_direction: OrderDirection::Asc,
        }
    }
}

impl Paging {
    pub fn from_query(query: &QueryMap) -> Self {
        let page = query
            .get("page")
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let page_size = query
            .get("pageSize")
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p > 0)
            .map_or(DEFAULT_PAGE_SIZE, |p| p.min(MAX_PAGE_SIZE));
        let order_by = query
            .get("orderBy")
            .filter(|o| IDENTIFIER_REGEX.is_match(o))
            .cloned();
        let order_direction = match query.get("orderDirection").map(|d| d.to_ascii_lowercase()) {
            Some(d) if d == "desc" => OrderDirection::Desc,
            _ => OrderDirection::Asc,
        };

        Self {
            page,
            page_size,
            order_by,
            order_direction,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Number,
    Text,
}

/// A query key a resource recognizes as a list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub name: &'static str,
    pub kind: FilterKind,
}

impl Filter {
    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: FilterKind::Number,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FilterKind::Text,
        }
    }

    // `?id=1,5,89` → [1, 5, 89]; entries that do not parse are dropped.
    fn parse(&self, raw: &str) -> Field<Value> {
        let items: Vec<Value> = raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .filter_map(|item| match self.kind {
                FilterKind::Number => item.parse::<i64>().ok().map(Value::from),
                FilterKind::Text => Some(Value::from(item)),
            })
            .collect();
        if items.is_empty() {
            Field::Undefined
        } else {
            Field::Value(Value::Array(items))
        }
    }
}

/// Read-side parameters: paging plus one entry per declared filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub paging: Paging,
    pub fields: FieldMap,
}

impl QueryParams {
    /// List shape. Only declared filters are read; other keys are ignored.
    pub fn from_query(query: &QueryMap, filters: &[Filter]) -> Self {
        let fields = filters
            .iter()
            .map(|filter| {
                let value = query
                    .get(filter.name)
                    .map_or(Field::Undefined, |raw| filter.parse(raw));
                (filter.name.to_string(), value)
            })
            .collect();

        Self {
            paging: Paging::from_query(query),
            fields,
        }
    }

    /// Get-one shape.
    pub fn by_id(id: i64) -> Self {
        let mut fields = FieldMap::new();
        fields.insert("id".to_string(), Field::Value(Value::from(id)));
        Self {
            paging: Paging::default(),
            fields,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.fields
            .get("id")
            .and_then(Field::as_value)
            .and_then(Value::as_i64)
    }
}

fn body_fields(body: Value) -> Result<FieldMap, AppError> {
    match body {
        Value::Object(object) => Ok(from_json_object(object)),
        _ => Err(AppError::BadRequest(
            "Request body must be a JSON object".into(),
        )),
    }
}

/// Create shape: the client id is always cleared so it can never override
/// a generated or path-derived id.
pub fn create_fields(body: Value) -> Result<FieldMap, AppError> {
    let mut fields = body_fields(body)?;
    fields.insert("id".to_string(), Field::Undefined);
    Ok(fields)
}

/// Update and patch shape. A client id is kept so validation can compare
/// it with the path id.
pub fn write_fields(body: Value) -> Result<FieldMap, AppError> {
    body_fields(body)
}

/// Parses the `{id}` path segment; a non-numeric id is a validation failure.
pub fn parse_path_id(raw: &str) -> Result<i64, AppError> {
    raw.trim().parse::<i64>().map_err(|_| {
        AppError::ValidationError(ValidationFailure::single(
            "id",
            Constraint::Type,
            "\"id\" must be a number",
        ))
    })
}

/// Collects every named path segment except `id` as a parent resource id.
/// Returns `None` when the route is not nested.
pub fn parent_ids<'a, I>(segments: I) -> Option<ParentIds>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let ids: ParentIds = segments
        .into_iter()
        .filter(|(name, _)| *name != "id")
        .map(|(name, value)| (name.to_string(), Field::Value(Value::from(value))))
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}
