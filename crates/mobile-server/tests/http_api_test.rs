// HTTP API tests for the bindable services endpoints
//
// Every test runs the real routes against an in-memory catalog seeded from
// the sample snapshot shipped in conf/catalog.yml.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use mobile_catalog::{CatalogOperation, InMemoryCatalog};
use mobile_server::api;
use mobile_server::model::common::{AppState, Configuration};
use mobile_server::startup::ShutdownSignal;
use mobile_services::{BindableServiceManager, BindingRequest};

const NS: &str = "myproject";
const CLIENT: &str = "myapp-android";

fn seeded_catalog() -> Arc<InMemoryCatalog> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/conf/catalog.yml");
    Arc::new(InMemoryCatalog::from_yaml_file(path).unwrap())
}

fn app_state(catalog: &Arc<InMemoryCatalog>) -> Arc<AppState> {
    Arc::new(AppState {
        configuration: Configuration::default(),
        bindable_services: Arc::new(BindableServiceManager::new(
            catalog.clone(),
            catalog.clone(),
            catalog.clone(),
        )),
        shutdown: ShutdownSignal::new(),
    })
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($state.clone()))
                .service(api::bindable::routes())
                .service(api::health::routes()),
        )
        .await
    };
}

async fn next_chunk<B: MessageBody>(body: &mut Pin<Box<B>>) -> Option<Bytes> {
    let poll = std::future::poll_fn(|cx| body.as_mut().poll_next(cx));
    match tokio::time::timeout(Duration::from_secs(2), poll).await {
        Ok(Some(Ok(bytes))) => Some(bytes),
        _ => None,
    }
}

#[actix_web::test]
async fn test_list_bindable_services() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices?namespace={}", CLIENT, NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    let services = body["data"].as_array().unwrap();
    assert_eq!(services.len(), 2, "postgresql is not mobile enabled");

    let keycloak = &services[0];
    assert_eq!(keycloak["name"], "Keycloak");
    assert_eq!(
        keycloak["imageUrl"],
        "https://www.keycloak.org/resources/images/keycloak_logo_480x108.png"
    );
    assert_eq!(keycloak["isBound"], true);
    assert_eq!(keycloak["serviceBinding"]["metadata"]["name"], "keycloak-x7k2p");
    assert_eq!(keycloak["mobileClient"]["metadata"]["name"], CLIENT);
    assert_eq!(keycloak["servicePlan"]["metadata"]["name"], "keycloak-default");
    assert_eq!(keycloak["configuration"].as_array().unwrap().len(), 1);

    let push = &services[1];
    assert_eq!(push["name"], "Mobile Push");
    assert_eq!(push["imageUrl"], "");
    assert_eq!(push["iconClass"], "font-icon icon-bell");
    assert_eq!(push["isBound"], false);
    assert!(push["serviceBinding"].is_null());
    assert_eq!(push["configuration"], json!([]));
}

#[actix_web::test]
async fn test_list_uses_default_namespace() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices", CLIENT))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn test_list_errors_are_mapped() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    catalog.fail_next(CatalogOperation::ListServiceInstances, "catalog is down");
    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices?namespace={}", CLIENT, NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 30001);
    assert_eq!(body["message"], "service unavailable: catalog is down");

    catalog.fail_next(CatalogOperation::ReadMobileClient, "gone");
    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices?namespace={}", CLIENT, NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_create_binding() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/api/mobileclients/{}/bindableservices", CLIENT))
        .set_json(json!({
            "namespace": NS,
            "serviceInstanceName": "ups",
            "parametersSecretName": "ups-bind-parameters-test",
            "formData": {"CLIENT_TYPE": "android", "googlekey": "k", "projectNumber": "1"}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let name = body["data"]["metadata"]["name"].as_str().unwrap().to_string();
    assert!(name.starts_with("ups-"));
    assert_eq!(
        body["data"]["metadata"]["annotations"]["binding.aerogear.org/consumer"],
        CLIENT
    );

    let secret = catalog.secret(NS, "ups-bind-parameters-test").unwrap();
    assert_eq!(
        secret.string_data.unwrap().get("parameters").map(String::as_str),
        Some(r#"{"CLIENT_TYPE":"android","googlekey":"k","projectNumber":"1"}"#)
    );

    // the new binding is attached but not ready yet
    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices?namespace={}", CLIENT, NS))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let push = &body["data"][1];
    assert_eq!(push["serviceBinding"]["metadata"]["name"], name.as_str());
    assert_eq!(push["isBound"], false);
}

#[actix_web::test]
async fn test_create_rejects_invalid_form() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/api/mobileclients/{}/bindableservices", CLIENT))
        .set_json(json!({
            "namespace": NS,
            "serviceInstanceName": "ups",
            "formData": {"googlekey": "k"}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 20002);
    assert_eq!(
        body["message"],
        "caused: FCM requires a Key field and Project Number."
    );
    assert_eq!(catalog.call_count(CatalogOperation::CreateServiceBinding), 0);
    assert_eq!(catalog.secret_count(), 0);
}

#[actix_web::test]
async fn test_create_requires_instance_name() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/api/mobileclients/{}/bindableservices", CLIENT))
        .set_json(json!({"namespace": NS}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(catalog.call_count(CatalogOperation::CreateServiceBinding), 0);
}

#[actix_web::test]
async fn test_create_keeps_binding_when_secret_fails() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    catalog.fail_next(CatalogOperation::CreateSecret, "secrets are read-only");
    let req = test::TestRequest::post()
        .uri(&format!("/api/mobileclients/{}/bindableservices", CLIENT))
        .set_json(json!({"namespace": NS, "serviceInstanceName": "keycloak"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    // the binding was accepted before the secret failed
    assert_eq!(catalog.service_bindings(NS).len(), 2);
}

#[actix_web::test]
async fn test_delete_binding() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/bindableservices/keycloak-x7k2p?namespace={}", NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"], true);
    assert!(catalog.service_bindings(NS).is_empty());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/bindableservices/keycloak-x7k2p?namespace={}", NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 20004);
}

#[actix_web::test]
async fn test_watch_streams_client_events() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices/watch?namespace={}", CLIENT, NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/x-ndjson"
    );
    assert_eq!(catalog.call_count(CatalogOperation::WatchServiceBindings), 1);

    for (client, instance) in [("otherapp", "keycloak"), (CLIENT, "ups")] {
        let request = BindingRequest {
            namespace: Some(NS.to_string()),
            service_instance_name: instance.to_string(),
            ..Default::default()
        };
        state
            .bindable_services
            .create(NS, &request.to_service_binding(client), &request.form_data)
            .await
            .unwrap();
    }

    let mut body = Box::pin(resp.into_body());
    let chunk = next_chunk(&mut body).await.unwrap();
    assert_eq!(chunk.last(), Some(&b'\n'));

    let event: Value = serde_json::from_slice(&chunk).unwrap();
    assert_eq!(event["type"], "APPLIED");
    assert_eq!(event["object"]["spec"]["instanceRef"]["name"], "ups");
    assert_eq!(
        event["object"]["metadata"]["annotations"]["binding.aerogear.org/consumer"],
        CLIENT
    );

    state.shutdown.shutdown();
    assert!(next_chunk(&mut body).await.is_none());
}

#[actix_web::test]
async fn test_watch_refused() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    catalog.fail_next(CatalogOperation::WatchServiceBindings, "watch refused");
    let req = test::TestRequest::get()
        .uri(&format!("/api/mobileclients/{}/bindableservices/watch?namespace={}", CLIENT, NS))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_health() {
    let catalog = seeded_catalog();
    let state = app_state(&catalog);
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "UP");
    assert_eq!(body["data"]["mode"], "kubernetes");
    assert_eq!(body["data"]["namespace"], "default");
}
