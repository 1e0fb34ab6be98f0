//! Generic HTTP handlers, registered once per resource.
//!
//! Every handler takes the verified `Token` as its first argument, so an
//! unauthenticated request is rejected before the path, query or body is
//! even looked at.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::Token;
use crate::error::AppError;
use crate::logging::LogContext;
use crate::models::Resource;
use crate::pipeline::extract::{create_fields, parent_ids, parse_path_id, write_fields};
use crate::pipeline::{ParentIds, QueryMap, QueryParams};
use crate::services::CrudService;

/// Per-request logging scope, tagged with `x-request-id` when the caller
/// sent a valid one.
fn request_log<R: Resource>(req: &HttpRequest) -> LogContext {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .unwrap_or_else(Uuid::new_v4);
    LogContext::new("controller", R::NAME).for_request(request_id)
}

fn route_parent_ids(req: &HttpRequest) -> Option<ParentIds> {
    parent_ids(req.match_info().iter())
}

fn path_id(req: &HttpRequest) -> Result<i64, AppError> {
    parse_path_id(req.match_info().get("id").unwrap_or_default())
}

pub async fn list<R: Resource>(
    token: Token,
    req: HttpRequest,
    query: web::Query<QueryMap>,
    service: web::Data<CrudService<R>>,
) -> Result<HttpResponse, AppError> {
    let log = request_log::<R>(&req);
    log.info(format_args!("GET {}", req.path()));

    let params = QueryParams::from_query(&query, R::FILTERS);
    let page = service.list(token, route_parent_ids(&req), params).await?;

    log.debug(format_args!("{} of {} rows", page.rows.len(), page.count));
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get<R: Resource>(
    token: Token,
    req: HttpRequest,
    service: web::Data<CrudService<R>>,
) -> Result<HttpResponse, AppError> {
    let log = request_log::<R>(&req);
    log.info(format_args!("GET {}", req.path()));

    let id = path_id(&req)?;
    let row = service.get(token, route_parent_ids(&req), id).await?;
    Ok(HttpResponse::Ok().json(row))
}

pub async fn create<R: Resource>(
    token: Token,
    req: HttpRequest,
    body: web::Json<Value>,
    service: web::Data<CrudService<R>>,
) -> Result<HttpResponse, AppError> {
    let log = request_log::<R>(&req);
    log.info(format_args!("POST {}", req.path()));

    let fields = create_fields(body.into_inner())?;
    let created = service.create(token, route_parent_ids(&req), fields).await?;
    Ok(HttpResponse::Created().json(created))
}

pub async fn update<R: Resource>(
    token: Token,
    req: HttpRequest,
    body: web::Json<Value>,
    service: web::Data<CrudService<R>>,
) -> Result<HttpResponse, AppError> {
    let log = request_log::<R>(&req);
    log.info(format_args!("PUT {}", req.path()));

    let id = path_id(&req)?;
    let fields = write_fields(body.into_inner())?;
    service
        .update(token, route_parent_ids(&req), id, fields)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn patch<R: Resource>(
    token: Token,
    req: HttpRequest,
    body: web::Json<Value>,
    service: web::Data<CrudService<R>>,
) -> Result<HttpResponse, AppError> {
    let log = request_log::<R>(&req);
    log.info(format_args!("PATCH {}", req.path()));

    let id = path_id(&req)?;
    let fields = write_fields(body.into_inner())?;
    service
        .patch(token, route_parent_ids(&req), id, fields)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete<R: Resource>(
    token: Token,
    req: HttpRequest,
    service: web::Data<CrudService<R>>,
) -> Result<HttpResponse, AppError> {
    let log = request_log::<R>(&req);
    log.info(format_args!("DELETE {}", req.path()));

    let id = path_id(&req)?;
    service.delete(token, route_parent_ids(&req), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Registers the six CRUD routes of `R` inside the current scope.
pub fn resource<R: Resource>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list::<R>))
            .route(web::post().to(create::<R>)),
    )
    .service(
        web::resource("/{id}")
            .route(web::get().to(get::<R>))
            .route(web::put().to(update::<R>))
            .route(web::patch().to(patch::<R>))
            .route(web::delete().to(delete::<R>)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_request_log_uses_header_id() {
        let id = Uuid::new_v4();
        let req = test::TestRequest::default()
            .insert_header(("x-request-id", id.to_string()))
            .to_http_request();
        let log = request_log::<crate::models::Users>(&req);
        assert_eq!(log.request_id(), Some(id));
        assert_eq!(log.target(), "api::controller::users");
    }

    #[actix_rt::test]
    async fn test_request_log_generates_id() {
        let req = test::TestRequest::default()
            .insert_header(("x-request-id", "not-a-uuid"))
            .to_http_request();
        assert!(request_log::<crate::models::Users>(&req).request_id().is_some());
    }

    #[actix_rt::test]
    async fn test_missing_path_id_is_validation_error() {
        let req = test::TestRequest::default().to_http_request();
        assert!(matches!(path_id(&req), Err(AppError::ValidationError(_))));
    }
}
