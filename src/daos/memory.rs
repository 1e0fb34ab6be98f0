use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;

use super::{patchable, row_to_ws, ws_object, Dao, PagedResult};
use crate::auth::Token;
use crate::error::AppError;
use crate::logging::LogContext;
use crate::models::Resource;
use crate::pipeline::extract::OrderDirection;
use crate::pipeline::field::as_text;
use crate::pipeline::{Field, FieldMap, ParentIds, QueryParams};

type Row = Map<String, Value>;

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

/// In-process table with the same filtering rules as `PgDao`.
///
/// References between tables are not enforced: a doctor may name a missing
/// `UserId` here, where Postgres rejects it with a 422.
pub struct MemoryDao<R: Resource> {
    table: RwLock<Table>,
    log: LogContext,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for MemoryDao<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> MemoryDao<R> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            log: LogContext::new("dao", R::NAME),
            _resource: PhantomData,
        }
    }
}

fn matches(row: &Row, column: &str, filter: &Field<Value>) -> bool {
    let stored = row.get(column).unwrap_or(&Value::Null);
    match filter {
        Field::Undefined => true,
        Field::Null => stored.is_null(),
        Field::Value(Value::Array(items)) => {
            !stored.is_null() && items.iter().any(|item| as_text(item) == as_text(stored))
        }
        Field::Value(value) => !stored.is_null() && as_text(value) == as_text(stored),
    }
}

fn in_scope<R: Resource>(row: &Row, parent_ids: Option<&ParentIds>, fields: &FieldMap) -> bool {
    parent_ids
        .into_iter()
        .flat_map(|ids| ids.iter())
        .chain(fields.iter())
        .filter(|(column, _)| R::COLUMNS.contains(&column.as_str()))
        .all(|(column, filter)| matches(row, column, filter))
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

fn id_scope(id: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("id".to_string(), Field::Value(Value::from(id)));
    fields
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl<R: Resource> Dao<R> for MemoryDao<R> {
    async fn list(
        &self,
        _token: &Token,
        parent_ids: Option<&ParentIds>,
        params: &QueryParams,
    ) -> Result<PagedResult<R::Ws>, AppError> {
        let table = self.table.read().await;
        let mut rows: Vec<&Row> = table
            .rows
            .values()
            .filter(|row| in_scope::<R>(row, parent_ids, &params.fields))
            .collect();

        let paging = &params.paging;
        let order_by = paging
            .order_by
            .as_deref()
            .filter(|column| R::COLUMNS.contains(column))
            .unwrap_or("id");
        rows.sort_by(|a, b| {
            let ordering = compare(
                a.get(order_by).unwrap_or(&Value::Null),
                b.get(order_by).unwrap_or(&Value::Null),
            );
            match paging.order_direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            }
        });

        let count = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(paging.offset() as usize)
            .take(paging.page_size as usize)
            .map(|row| row_to_ws::<R>(Value::Object(row.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PagedResult {
            rows,
            count,
            page: paging.page,
            page_size: paging.page_size,
        })
    }

    async fn get(
        &self,
        _token: &Token,
        parent_ids: Option<&ParentIds>,
        params: &QueryParams,
    ) -> Result<Option<R::Ws>, AppError> {
        let table = self.table.read().await;
        table
            .rows
            .values()
            .find(|row| in_scope::<R>(row, parent_ids, &params.fields))
            .map(|row| row_to_ws::<R>(Value::Object(row.clone())))
            .transpose()
    }

    async fn create(
        &self,
        token: &Token,
        _parent_ids: Option<&ParentIds>,
        ws: &R::Ws,
    ) -> Result<R::Ws, AppError> {
        let mut row = ws_object::<R>(ws)?;
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = table.last_id;

        row.insert("id".to_string(), Value::from(id));
        row.insert("createdAt".to_string(), now());
        row.insert("updatedAt".to_string(), now());
        row.insert("deletedAt".to_string(), Value::Null);
        table.rows.insert(id, row.clone());

        self.log
            .info(format_args!("user {} created {} {}", token.sub, R::NAME, id));
        row_to_ws::<R>(Value::Object(row))
    }

    async fn update(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
        ws: &R::Ws,
    ) -> Result<u64, AppError> {
        let object = ws_object::<R>(ws)?;
        let mut table = self.table.write().await;
        let Some(row) = table
            .rows
            .get_mut(&id)
            .filter(|row| in_scope::<R>(row, parent_ids, &id_scope(id)))
        else {
            return Ok(0);
        };

        for column in R::UPDATABLE {
            let value = object.get(*column).cloned().unwrap_or(Value::Null);
            row.insert(column.to_string(), value);
        }
        row.insert("updatedAt".to_string(), now());

        self.log
            .info(format_args!("user {} updated {} {}", token.sub, R::NAME, id));
        Ok(1)
    }

    async fn patch(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
        ws: &R::Ws,
    ) -> Result<u64, AppError> {
        let object = patchable(ws_object::<R>(ws)?, R::UPDATABLE);
        let mut table = self.table.write().await;
        let Some(row) = table
            .rows
            .get_mut(&id)
            .filter(|row| in_scope::<R>(row, parent_ids, &id_scope(id)))
        else {
            return Ok(0);
        };

        row.extend(object);
        row.insert("updatedAt".to_string(), now());

        self.log
            .info(format_args!("user {} patched {} {}", token.sub, R::NAME, id));
        Ok(1)
    }

    async fn delete(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
    ) -> Result<u64, AppError> {
        let mut table = self.table.write().await;
        let scoped = table
            .rows
            .get(&id)
            .map_or(false, |row| in_scope::<R>(row, parent_ids, &id_scope(id)));
        if !scoped {
            return Ok(0);
        }
        table.rows.remove(&id);

        self.log
            .info(format_args!("user {} deleted {} {}", token.sub, R::NAME, id));
        Ok(1)
    }
}
