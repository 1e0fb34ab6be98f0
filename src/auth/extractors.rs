use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use super::token::{check_jwt, JwtKeys, Token};
use crate::error::AppError;

/// Extracts and verifies the bearer token before a handler body runs.
///
/// Every resource action takes a `Token` as its first argument, so a
/// missing or invalid token is rejected with 401 before any parameter
/// extraction or validation happens.
impl FromRequest for Token {
    type Error = ActixError; // AppError will be converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<JwtKeys>>() {
            Some(keys) => check_jwt(req.headers(), keys),
            None => Err(AppError::InternalServerError(
                "JWT keys are not configured".to_string(),
            )),
        };
        ready(result.map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::generate_token;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_token_extractor_success() {
        let keys = JwtKeys::from_secret("extractor-secret");
        let token = generate_token(&keys, 123).unwrap();
        let req = test::TestRequest::default()
            .app_data(web::Data::new(keys))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();

        let mut payload = Payload::None;
        let extracted = Token::from_request(&req, &mut payload).await;
        assert_eq!(extracted.unwrap().sub, 123);
    }

    #[actix_rt::test]
    async fn test_token_extractor_missing_header() {
        let req = test::TestRequest::default()
            .app_data(web::Data::new(JwtKeys::from_secret("extractor-secret")))
            .to_http_request();

        let mut payload = Payload::None;
        let err = Token::from_request(&req, &mut payload).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_token_extractor_without_keys() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = Token::from_request(&req, &mut payload).await.unwrap_err();
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
