//! Generic CRUD service.
//!
//! Every operation runs the same way: the validation wrapper checks parent
//! ids and the operation schema, the arguments are normalized, the DAO is
//! called and a zero-row result becomes a not-found failure.

use std::sync::Arc;

use crate::auth::Token;
use crate::daos::{Dao, PagedResult};
use crate::error::AppError;
use crate::logging::LogContext;
use crate::models::{to_ws, Resource};
use crate::pipeline::{
    check_entity_found, remove_undefined_values, require_found, Call, FieldMap, Guarded,
    ParentIds, QueryParams,
};

/// Arguments of a by-id write (update or patch).
#[derive(Debug, Clone)]
pub struct WriteArgs {
    pub id: i64,
    pub fields: FieldMap,
}

pub struct CrudService<R: Resource> {
    dao: Arc<dyn Dao<R>>,
    log: LogContext,
}

fn check_parent_ids<R: Resource>(parent_ids: Option<&ParentIds>) -> Result<(), AppError> {
    match parent_ids {
        Some(ids) => Ok(R::parent_ids_schema().validate(ids)?),
        None => Ok(()),
    }
}

// Path segments arrive as text; numeric parents reach the DAO as numbers.
fn coerce_parent_ids<R: Resource>(parent_ids: &mut Option<ParentIds>) {
    if let Some(ids) = parent_ids.as_mut() {
        R::parent_ids_schema().coerce(ids);
    }
}

impl<R: Resource> CrudService<R> {
    pub fn new(dao: Arc<dyn Dao<R>>) -> Self {
        Self {
            dao,
            log: LogContext::new("service", R::NAME),
        }
    }

    pub fn validate_list(call: &Call<QueryParams>) -> Result<(), AppError> {
        check_parent_ids::<R>(call.parent_ids.as_ref())?;
        Ok(R::list_schema().validate(&call.args.fields)?)
    }

    pub fn validate_get(call: &Call<QueryParams>) -> Result<(), AppError> {
        check_parent_ids::<R>(call.parent_ids.as_ref())?;
        Ok(R::get_schema().validate(&call.args.fields)?)
    }

    pub fn validate_create(call: &Call<FieldMap>) -> Result<(), AppError> {
        check_parent_ids::<R>(call.parent_ids.as_ref())?;
        Ok(R::create_schema().validate(&call.args)?)
    }

    pub fn validate_update(call: &Call<WriteArgs>) -> Result<(), AppError> {
        check_parent_ids::<R>(call.parent_ids.as_ref())?;
        let WriteArgs { id, fields } = &call.args;
        Ok(R::update_schema(*id, fields).validate(fields)?)
    }

    pub fn validate_patch(call: &Call<WriteArgs>) -> Result<(), AppError> {
        check_parent_ids::<R>(call.parent_ids.as_ref())?;
        let WriteArgs { id, fields } = &call.args;
        Ok(R::patch_schema(*id, fields).validate(fields)?)
    }

    pub fn validate_delete(call: &Call<QueryParams>) -> Result<(), AppError> {
        check_parent_ids::<R>(call.parent_ids.as_ref())?;
        Ok(R::delete_schema().validate(&call.args.fields)?)
    }

    pub async fn list(
        &self,
        token: Token,
        parent_ids: Option<ParentIds>,
        params: QueryParams,
    ) -> Result<PagedResult<R::Ws>, AppError> {
        Guarded::new(Call::new(token, parent_ids, params))
            .validate(Self::validate_list)
            .run(|mut call| async move {
                coerce_parent_ids::<R>(&mut call.parent_ids);
                remove_undefined_values(&mut call.args.fields);
                self.log.debug(format_args!(
                    "list page {} filters {:?}",
                    call.args.paging.page, call.args.fields
                ));
                self.dao
                    .list(&call.token, call.parent_ids.as_ref(), &call.args)
                    .await
            })
            .await
    }

    pub async fn get(
        &self,
        token: Token,
        parent_ids: Option<ParentIds>,
        id: i64,
    ) -> Result<R::Ws, AppError> {
        Guarded::new(Call::new(token, parent_ids, QueryParams::by_id(id)))
            .validate(Self::validate_get)
            .run(|mut call| async move {
                coerce_parent_ids::<R>(&mut call.parent_ids);
                remove_undefined_values(&mut call.args.fields);
                self.log.debug(format_args!("get {}", id));
                let row = self
                    .dao
                    .get(&call.token, call.parent_ids.as_ref(), &call.args)
                    .await?;
                require_found(id, row, R::NAME)
            })
            .await
    }

    pub async fn create(
        &self,
        token: Token,
        parent_ids: Option<ParentIds>,
        fields: FieldMap,
    ) -> Result<R::Ws, AppError> {
        Guarded::new(Call::new(token, parent_ids, fields))
            .prepare(R::prepare_create)
            .validate(Self::validate_create)
            .run(|mut call| async move {
                coerce_parent_ids::<R>(&mut call.parent_ids);
                remove_undefined_values(&mut call.args);
                let ws = to_ws::<R>(&call.args, &R::create_schema())?;
                self.log.step("create");
                self.dao
                    .create(&call.token, call.parent_ids.as_ref(), &ws)
                    .await
            })
            .await
    }

    pub async fn update(
        &self,
        token: Token,
        parent_ids: Option<ParentIds>,
        id: i64,
        fields: FieldMap,
    ) -> Result<(), AppError> {
        Guarded::new(Call::new(token, parent_ids, WriteArgs { id, fields }))
            .validate(Self::validate_update)
            .run(|mut call| async move {
                coerce_parent_ids::<R>(&mut call.parent_ids);
                remove_undefined_values(&mut call.args.fields);
                let schema = R::update_schema(id, &call.args.fields);
                let ws = to_ws::<R>(&call.args.fields, &schema)?;
                self.log.debug(format_args!("update {}", id));
                let affected = self
                    .dao
                    .update(&call.token, call.parent_ids.as_ref(), id, &ws)
                    .await?;
                check_entity_found(id, affected, R::NAME)
            })
            .await
    }

    pub async fn patch(
        &self,
        token: Token,
        parent_ids: Option<ParentIds>,
        id: i64,
        fields: FieldMap,
    ) -> Result<(), AppError> {
        Guarded::new(Call::new(token, parent_ids, WriteArgs { id, fields }))
            .validate(Self::validate_patch)
            .run(|mut call| async move {
                coerce_parent_ids::<R>(&mut call.parent_ids);
                remove_undefined_values(&mut call.args.fields);
                let schema = R::patch_schema(id, &call.args.fields);
                let ws = to_ws::<R>(&call.args.fields, &schema)?;
                self.log.debug(format_args!("patch {}", id));
                let affected = self
                    .dao
                    .patch(&call.token, call.parent_ids.as_ref(), id, &ws)
                    .await?;
                check_entity_found(id, affected, R::NAME)
            })
            .await
    }

    pub async fn delete(
        &self,
        token: Token,
        parent_ids: Option<ParentIds>,
        id: i64,
    ) -> Result<(), AppError> {
        Guarded::new(Call::new(token, parent_ids, QueryParams::by_id(id)))
            .validate(Self::validate_delete)
            .run(|mut call| async move {
                coerce_parent_ids::<R>(&mut call.parent_ids);
                self.log.debug(format_args!("delete {}", id));
                let affected = self
                    .dao
                    .delete(&call.token, call.parent_ids.as_ref(), id)
                    .await?;
                check_entity_found(id, affected, R::NAME)
            })
            .await
    }
}
