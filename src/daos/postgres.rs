use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;

use super::{patchable, row_to_ws, ws_object, Dao, PagedResult};
use crate::auth::Token;
use crate::error::AppError;
use crate::logging::LogContext;
use crate::models::Resource;
use crate::pipeline::extract::OrderDirection;
use crate::pipeline::field::as_text;
use crate::pipeline::{Field, FieldMap, ParentIds, QueryParams};

/// Postgres-backed DAO. Rows travel as JSONB so one implementation serves
/// every resource; column names are always taken from `Resource::COLUMNS`.
pub struct PgDao<R: Resource> {
    pool: PgPool,
    log: LogContext,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> PgDao<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            log: LogContext::new("dao", R::NAME),
            _resource: PhantomData,
        }
    }
}

fn quoted(column: &str) -> String {
    format!("\"{}\"", column)
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| quoted(column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Appends `AND ...` for every parent id and filter naming a known column.
fn push_conditions<R: Resource>(
    qb: &mut QueryBuilder<'_, Postgres>,
    parent_ids: Option<&ParentIds>,
    fields: &FieldMap,
) {
    let conditions = parent_ids
        .into_iter()
        .flat_map(|ids| ids.iter())
        .chain(fields.iter())
        .filter(|(column, _)| R::COLUMNS.contains(&column.as_str()));

    for (column, filter) in conditions {
        match filter {
            Field::Undefined => {}
            Field::Null => {
                qb.push(format!(" AND {} IS NULL", quoted(column)));
            }
            Field::Value(Value::Array(items)) => {
                let items: Vec<String> = items.iter().map(as_text).collect();
                qb.push(format!(" AND {}::text = ANY(", quoted(column)))
                    .push_bind(items)
                    .push(")");
            }
            Field::Value(value) => {
                qb.push(format!(" AND {}::text = ", quoted(column)))
                    .push_bind(as_text(value));
            }
        }
    }
}

fn id_scope(id: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("id".to_string(), Field::Value(Value::from(id)));
    fields
}

fn select_query<'a, R: Resource>(
    parent_ids: Option<&ParentIds>,
    params: &QueryParams,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT to_jsonb(t) AS doc FROM {} t WHERE TRUE",
        quoted(R::TABLE)
    ));
    push_conditions::<R>(&mut qb, parent_ids, &params.fields);

    let paging = &params.paging;
    let order_by = paging
        .order_by
        .as_deref()
        .filter(|column| R::COLUMNS.contains(column))
        .unwrap_or("id");
    let direction = match paging.order_direction {
        OrderDirection::Asc => "ASC",
        OrderDirection::Desc => "DESC",
    };
    qb.push(format!(" ORDER BY {} {}", quoted(order_by), direction))
        .push(" LIMIT ")
        .push_bind(i64::from(paging.page_size))
        .push(" OFFSET ")
        .push_bind(paging.offset() as i64);
    qb
}

fn count_query<'a, R: Resource>(
    parent_ids: Option<&ParentIds>,
    params: &QueryParams,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COUNT(*) FROM {} t WHERE TRUE",
        quoted(R::TABLE)
    ));
    push_conditions::<R>(&mut qb, parent_ids, &params.fields);
    qb
}

fn insert_query<'a, R: Resource>(row: Map<String, Value>) -> QueryBuilder<'a, Postgres> {
    let columns: Vec<&str> = R::COLUMNS
        .iter()
        .copied()
        .filter(|column| row.contains_key(*column))
        .collect();

    let mut qb = QueryBuilder::new("WITH ins AS (");
    if columns.is_empty() {
        qb.push(format!("INSERT INTO {} DEFAULT VALUES", quoted(R::TABLE)));
    } else {
        let columns = column_list(&columns);
        qb.push(format!(
            "INSERT INTO {table} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{table}, ",
            table = quoted(R::TABLE),
            columns = columns
        ))
        .push_bind(Value::Object(row))
        .push(")");
    }
    qb.push(" RETURNING *) SELECT to_jsonb(ins) FROM ins");
    qb
}

/// `columns` are overwritten from `row`; a column missing from `row`
/// becomes NULL.
fn update_query<'a, R: Resource>(
    parent_ids: Option<&ParentIds>,
    id: i64,
    columns: &[&str],
    row: Map<String, Value>,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} t SET ", quoted(R::TABLE)));
    if !columns.is_empty() {
        let columns = column_list(columns);
        qb.push(format!(
            "({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, ",
            columns = columns,
            table = quoted(R::TABLE)
        ))
        .push_bind(Value::Object(row))
        .push(")), ");
    }
    qb.push("\"updatedAt\" = NOW() WHERE TRUE");
    push_conditions::<R>(&mut qb, parent_ids, &id_scope(id));
    qb
}

fn delete_query<'a, R: Resource>(
    parent_ids: Option<&ParentIds>,
    id: i64,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {} t WHERE TRUE", quoted(R::TABLE)));
    push_conditions::<R>(&mut qb, parent_ids, &id_scope(id));
    qb
}

#[async_trait]
impl<R: Resource> Dao<R> for PgDao<R> {
    async fn list(
        &self,
        _token: &Token,
        parent_ids: Option<&ParentIds>,
        params: &QueryParams,
    ) -> Result<PagedResult<R::Ws>, AppError> {
        let count: i64 = count_query::<R>(parent_ids, params)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        let docs: Vec<Value> = select_query::<R>(parent_ids, params)
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;

        let rows = docs
            .into_iter()
            .map(row_to_ws::<R>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PagedResult {
            rows,
            count: count.max(0) as u64,
            page: params.paging.page,
            page_size: params.paging.page_size,
        })
    }

    async fn get(
        &self,
        _token: &Token,
        parent_ids: Option<&ParentIds>,
        params: &QueryParams,
    ) -> Result<Option<R::Ws>, AppError> {
        let doc: Option<Value> = select_query::<R>(parent_ids, params)
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;
        doc.map(row_to_ws::<R>).transpose()
    }

    async fn create(
        &self,
        token: &Token,
        _parent_ids: Option<&ParentIds>,
        ws: &R::Ws,
    ) -> Result<R::Ws, AppError> {
        let row = ws_object::<R>(ws)?;
        let doc: Value = insert_query::<R>(row)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        let created = row_to_ws::<R>(doc)?;

        self.log
            .info(format_args!("user {} created a {} row", token.sub, R::NAME));
        Ok(created)
    }

    async fn update(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
        ws: &R::Ws,
    ) -> Result<u64, AppError> {
        let row = ws_object::<R>(ws)?;
        let result = update_query::<R>(parent_ids, id, R::UPDATABLE, row)
            .build()
            .execute(&self.pool)
            .await?;

        self.log
            .info(format_args!("user {} updated {} {}", token.sub, R::NAME, id));
        Ok(result.rows_affected())
    }

    async fn patch(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
        ws: &R::Ws,
    ) -> Result<u64, AppError> {
        let row = patchable(ws_object::<R>(ws)?, R::UPDATABLE);
        let columns: Vec<&str> = R::UPDATABLE
            .iter()
            .copied()
            .filter(|column| row.contains_key(*column))
            .collect();
        let result = update_query::<R>(parent_ids, id, &columns, row)
            .build()
            .execute(&self.pool)
            .await?;

        self.log
            .info(format_args!("user {} patched {} {}", token.sub, R::NAME, id));
        Ok(result.rows_affected())
    }

    async fn delete(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
    ) -> Result<u64, AppError> {
        let result = delete_query::<R>(parent_ids, id)
            .build()
            .execute(&self.pool)
            .await?;

        self.log
            .info(format_args!("user {} deleted {} {}", token.sub, R::NAME, id));
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Doctors, Users};
    use crate::pipeline::{Paging, QueryMap};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_select_with_filters_and_paging() {
        let query: QueryMap = [("state", "NSW"), ("id", "1,2"), ("orderBy", "lastName")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut params = QueryParams::from_query(&query, Users::FILTERS);
        crate::pipeline::remove_undefined_values(&mut params.fields);

        let qb = select_query::<Users>(None, &params);
        assert_eq!(
            qb.sql(),
            "SELECT to_jsonb(t) AS doc FROM \"users\" t WHERE TRUE \
             AND \"id\"::text = ANY($1) AND \"state\"::text = $2 \
             ORDER BY \"lastName\" ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_unknown_order_column_falls_back_to_id() {
        let params = QueryParams {
            paging: Paging {
                order_by: Some("password".into()),
                ..Paging::default()
            },
            fields: FieldMap::new(),
        };
        let qb = select_query::<Users>(None, &params);
        assert!(qb.sql().contains("ORDER BY \"id\" ASC"));
    }

    #[test]
    fn test_parent_scope_and_null_filter() {
        let mut parent = FieldMap::new();
        parent.insert("UserId".into(), Field::Value(json!("3")));
        let qb = delete_query::<Doctors>(Some(&parent), 9);
        assert_eq!(
            qb.sql(),
            "DELETE FROM \"doctors\" t WHERE TRUE AND \"UserId\"::text = $1 AND \"id\"::text = $2"
        );

        let mut fields = FieldMap::new();
        fields.insert("phoneNumber".into(), Field::Null);
        let qb = count_query::<Doctors>(None, &QueryParams {
            paging: Paging::default(),
            fields,
        });
        assert!(qb.sql().ends_with("AND \"phoneNumber\" IS NULL"));
    }

    #[test]
    fn test_patch_only_sets_sent_columns() {
        let mut row = Map::new();
        row.insert("lastName".into(), json!("Lee"));
        let qb = update_query::<Users>(None, 5, &["lastName"], row);
        assert_eq!(
            qb.sql(),
            "UPDATE \"users\" t SET (\"lastName\") = (SELECT \"lastName\" FROM \
             jsonb_populate_record(NULL::\"users\", $1)), \"updatedAt\" = NOW() \
             WHERE TRUE AND \"id\"::text = $2"
        );
    }

    #[test]
    fn test_insert_uses_only_present_columns() {
        let mut row = Map::new();
        row.insert("email".into(), json!("a@b.com"));
        row.insert("firstName".into(), json!("A"));
        let qb = insert_query::<Users>(row);
        assert_eq!(
            qb.sql(),
            "WITH ins AS (INSERT INTO \"users\" (\"email\", \"firstName\") SELECT \"email\", \
             \"firstName\" FROM jsonb_populate_record(NULL::\"users\", $1) RETURNING *) \
             SELECT to_jsonb(ins) FROM ins"
        );
    }
}
