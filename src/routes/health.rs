use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::config::Storage;
use crate::models::{Doctors, Resource, Users};

/// What `/health` reports about the running instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub storage: Storage,
    pub resources: Vec<&'static str>,
}

impl ServiceInfo {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            resources: vec![Users::NAME, Doctors::NAME],
        }
    }
}

/// Liveness probe. Public: it sits outside `/api` and takes no token.
#[get("/health")]
pub async fn health(info: web::Data<ServiceInfo>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "storage": info.storage,
        "resources": info.resources,
        "timestamp": Utc::now()
    }))
}
