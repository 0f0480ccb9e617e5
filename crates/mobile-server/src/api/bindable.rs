//! Bindable mobile service API handlers
//!
//! - GET    /api/mobileclients/{client}/bindableservices
//! - POST   /api/mobileclients/{client}/bindableservices
//! - GET    /api/mobileclients/{client}/bindableservices/watch
//! - DELETE /api/bindableservices/{binding}

use actix_web::{HttpResponse, Scope, delete, get, post, web, web::Bytes};
use futures::{StreamExt, future};
use kube::ResourceExt;
use serde::Serialize;
use tracing::{info, warn};

use mobile_catalog::BindingEvent;
use mobile_services::BindingRequest;

use crate::{
    error::AppError,
    model::{common::AppState, response::Result},
};

use super::model::{NamespaceParam, WatchError};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// List the bindable services of a mobile client
///
/// GET /api/mobileclients/{client}/bindableservices?namespace=
#[get("/mobileclients/{client}/bindableservices")]
pub async fn list_bindable_services(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<NamespaceParam>,
) -> std::result::Result<HttpResponse, AppError> {
    let client = path.into_inner();
    let namespace = params.namespace_or_default();

    let services = data.bindable_services.list(namespace, &client).await?;

    Ok(Result::<()>::http_success(services))
}

/// Bind a mobile client to a service instance
///
/// POST /api/mobileclients/{client}/bindableservices
#[post("/mobileclients/{client}/bindableservices")]
pub async fn create_binding(
    data: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<BindingRequest>,
) -> std::result::Result<HttpResponse, AppError> {
    let client = path.into_inner();
    let request = request.into_inner();
    request.validate()?;

    let binding = request.to_service_binding(&client);
    let created = data
        .bindable_services
        .create(request.namespace_or_default(), &binding, &request.form_data)
        .await?;

    info!(
        client = %client,
        binding = %created.name_any(),
        instance = %request.service_instance_name,
        "Mobile client bound to service"
    );

    Ok(Result::<()>::http_response(
        201,
        mobile_common::error::SUCCESS.code,
        mobile_common::error::SUCCESS.message.to_string(),
        created,
    ))
}

/// Remove a service binding
///
/// DELETE /api/bindableservices/{binding}?namespace=
#[delete("/bindableservices/{binding}")]
pub async fn delete_binding(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<NamespaceParam>,
) -> std::result::Result<HttpResponse, AppError> {
    let binding = path.into_inner();

    data.bindable_services
        .delete(params.namespace_or_default(), &binding)
        .await?;

    Ok(Result::<()>::http_success(true))
}

/// Stream binding changes for a mobile client as newline-delimited JSON
///
/// GET /api/mobileclients/{client}/bindableservices/watch?namespace=
///
/// The watch is opened before the response starts, so a refused watch is
/// reported as an ordinary error response. Errors reported by an open watch
/// are sent as `ERROR` lines. The stream ends on server shutdown.
#[get("/mobileclients/{client}/bindableservices/watch")]
pub async fn watch_bindings(
    data: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<NamespaceParam>,
) -> std::result::Result<HttpResponse, AppError> {
    let client = path.into_inner();
    let namespace = params.namespace_or_default().to_string();

    let open_watch = data.bindable_services.watch(&namespace, &client);
    let events = open_watch().await?;
    info!(client = %client, namespace = %namespace, "Opened service binding watch");

    let body = events
        .take_until(data.shutdown.wait())
        .filter_map(move |item| {
            future::ready(match item {
                Ok(event) => is_for_client(&event, &client).then(|| ndjson_line(&event)),
                Err(e) => {
                    warn!(client = %client, namespace = %namespace, error = %e, "Service binding watch error");
                    Some(ndjson_line(&WatchError::new(e.to_string())))
                }
            })
        })
        .map(Ok::<_, std::io::Error>);

    Ok(HttpResponse::Ok()
        .content_type(NDJSON_CONTENT_TYPE)
        .streaming(body))
}

fn is_for_client(event: &BindingEvent, client: &str) -> bool {
    event.binding().consumer() == Some(client)
}

fn ndjson_line<T: Serialize>(value: &T) -> Bytes {
    let mut line = serde_json::to_vec(value).unwrap_or_else(|e| {
        serde_json::json!({"type": "ERROR", "message": e.to_string()})
            .to_string()
            .into_bytes()
    });
    line.push(b'\n');
    Bytes::from(line)
}

pub fn routes() -> Scope {
    web::scope("/api")
        .service(watch_bindings)
        .service(list_bindable_services)
        .service(create_binding)
        .service(delete_binding)
}
