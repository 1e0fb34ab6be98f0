use actix_web::http::header;
use crud_scaffold::app::AppState;
use crud_scaffold::auth::{generate_token, JwtKeys};
use serde_json::{json, Value};

pub const SECRET: &str = "integration-test-secret";

pub fn state() -> AppState {
    AppState::in_memory(JwtKeys::from_secret(SECRET))
}

pub fn bearer() -> (header::HeaderName, String) {
    let token = generate_token(&JwtKeys::from_secret(SECRET), 1).unwrap();
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub fn user_body(first_name: &str, state: &str) -> Value {
    json!({
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "firstName": first_name,
        "lastName": "Tester",
        "address1": "1 Main St",
        "state": state,
        "postcode": "2000"
    })
}

#[allow(dead_code)]
pub fn doctor_body(license_no: &str, practice_type: &str) -> Value {
    json!({
        "firstName": "Gregory",
        "lastName": "House",
        "licenseNo": license_no,
        "licenseExpiry": "2030-06-30",
        "practiceType": practice_type
    })
}
