use actix_web::{error::JsonPayloadError, web, HttpRequest};
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::config::Storage;
use crate::daos::{Dao, MemoryDao, PgDao};
use crate::error::AppError;
use crate::models::{Doctors, Users};
use crate::routes;
use crate::routes::health::ServiceInfo;
use crate::services::CrudService;

/// Everything the HTTP layer shares across workers.
#[derive(Clone)]
pub struct AppState {
    keys: web::Data<JwtKeys>,
    info: web::Data<ServiceInfo>,
    users: web::Data<CrudService<Users>>,
    doctors: web::Data<CrudService<Doctors>>,
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

impl AppState {
    pub fn new(
        keys: JwtKeys,
        storage: Storage,
        users: Arc<dyn Dao<Users>>,
        doctors: Arc<dyn Dao<Doctors>>,
    ) -> Self {
        Self {
            keys: web::Data::new(keys),
            info: web::Data::new(ServiceInfo::new(storage)),
            users: web::Data::new(CrudService::new(users)),
            doctors: web::Data::new(CrudService::new(doctors)),
        }
    }

    pub fn postgres(keys: JwtKeys, pool: PgPool) -> Self {
        Self::new(
            keys,
            Storage::Postgres,
            Arc::new(PgDao::<Users>::new(pool.clone())),
            Arc::new(PgDao::<Doctors>::new(pool)),
        )
    }

    pub fn in_memory(keys: JwtKeys) -> Self {
        Self::new(
            keys,
            Storage::Memory,
            Arc::new(MemoryDao::<Users>::new()),
            Arc::new(MemoryDao::<Doctors>::new()),
        )
    }

    /// Registers shared data, the health check and the `/api` routes.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.keys.clone())
            .app_data(self.info.clone())
            .app_data(self.users.clone())
            .app_data(self.doctors.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .service(routes::health::health)
            .service(web::scope("/api").configure(routes::config));
    }
}
