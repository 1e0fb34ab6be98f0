mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use common::{bearer, state, user_body};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

macro_rules! app {
    () => {{
        let state = state();
        test::init_service(App::new().configure(|cfg| state.configure(cfg))).await
    }};
}

#[actix_rt::test]
async fn test_create_ignores_client_id() {
    let app = app!();

    let mut body = user_body("Ada", "NSW");
    body["id"] = json!(99);
    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let created: Value = test::read_body_json(resp).await;
    assert_ne!(created["id"], json!(99));
    assert_eq!(created["firstName"], "Ada");
    assert!(created["createdAt"].is_string());
}

#[actix_rt::test]
async fn test_create_rejects_unknown_field() {
    let app = app!();

    let mut body = user_body("Ada", "NSW");
    body["foo"] = json!(1);
    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["errorCode"], 422);
    assert_eq!(error["error"], "validation");
    assert_eq!(error["details"][0]["field"], "foo");
    assert_eq!(error["details"][0]["constraint"], "unknown");
}

#[actix_rt::test]
async fn test_create_requires_fields() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&json!({ "firstName": "Ada" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_patch_existing_and_missing() {
    let app = app!();

    for name in ["Ada", "Bob", "Cyd", "Dee", "Eve"] {
        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer())
            .set_json(&user_body(name, "NSW"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::patch()
        .uri("/api/users/5")
        .insert_header(bearer())
        .set_json(&json!({ "lastName": "Lee" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/users/5")
        .insert_header(bearer())
        .to_request();
    let row: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(row["lastName"], "Lee");
    assert_eq!(row["firstName"], "Eve");

    let req = test::TestRequest::patch()
        .uri("/api/users/50")
        .insert_header(bearer())
        .set_json(&json!({ "lastName": "Lee" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["message"], "Users with id 50 not found");
    assert_eq!(error["details"], json!({ "resource": "Users", "id": 50 }));
}

#[actix_rt::test]
async fn test_update_id_must_match_path() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&user_body("Ada", "NSW"))
        .to_request();
    test::call_service(&app, req).await;

    let mut body = user_body("Ada", "VIC");
    body["id"] = json!(2);
    let req = test::TestRequest::put()
        .uri("/api/users/1")
        .insert_header(bearer())
        .set_json(&body)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    body["id"] = json!(1);
    let req = test::TestRequest::put()
        .uri("/api/users/1")
        .insert_header(bearer())
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/users/1")
        .insert_header(bearer())
        .to_request();
    let row: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(row["state"], "VIC");
}

#[actix_rt::test]
async fn test_patch_id_must_match_path() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&user_body("Ada", "NSW"))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::patch()
        .uri("/api/users/1")
        .insert_header(bearer())
        .set_json(&json!({ "id": 2 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["details"][0]["field"], "id");
    assert_eq!(error["details"][0]["constraint"], "valid");
}

#[actix_rt::test]
async fn test_requests_without_token_are_rejected() {
    let app = app!();

    let req = test::TestRequest::get().uri("/api/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Auth runs before validation: an invalid body still yields 401.
    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .set_json(&json!({ "foo": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["errorCode"], 401);
}

#[actix_rt::test]
async fn test_list_filters_and_paging() {
    let app = app!();

    for (name, state) in [("Ada", "NSW"), ("Bob", "VIC"), ("Cyd", "NSW"), ("Dee", "QLD")] {
        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer())
            .set_json(&user_body(name, state))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/users?state=NSW,QLD&unknownKey=1")
        .insert_header(bearer())
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["page"], 1);

    let req = test::TestRequest::get()
        .uri("/api/users?pageSize=2&page=2&orderBy=firstName&orderDirection=desc")
        .insert_header(bearer())
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["count"], 4);
    assert_eq!(page["pageSize"], 2);
    let names: Vec<&str> = page["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["firstName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob", "Ada"]);
}

#[actix_rt::test]
async fn test_delete_then_get_is_not_found() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&user_body("Ada", "NSW"))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::delete()
        .uri("/api/users/1")
        .insert_header(bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/users/1")
        .insert_header(bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri("/api/users/1")
        .insert_header(bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_bad_path_id_and_malformed_body() {
    let app = app!();

    let req = test::TestRequest::get()
        .uri("/api/users/abc")
        .insert_header(bearer())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "bad_request");

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer())
        .set_json(&json!([1, 2]))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_health_is_public() {
    let app = app!();

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}
