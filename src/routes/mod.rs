pub mod health;

use actix_web::web;

use crate::controllers;
use crate::models::{Doctors, Users};

/// API routes, mounted under `/api`.
///
/// The nested doctors scope is registered before `/users` so that
/// `/users/{UserId}/doctors` is not swallowed by the users `/{id}` route.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/users/{UserId}/doctors").configure(controllers::resource::<Doctors>))
        .service(web::scope("/users").configure(controllers::resource::<Users>))
        .service(web::scope("/doctors").configure(controllers::resource::<Doctors>));
}
