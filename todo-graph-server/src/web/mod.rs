use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::graphql::{TodoSchema, build_schema};
use crate::todo::{MongoTodoStore, TodoService};

/// Creates the router serving `POST /graphql`.
pub fn create_graphql_router(schema: TodoSchema) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .with_state(schema)
}

/// Creates the application router with tracing and permissive CORS applied.
pub fn create_app(schema: TodoSchema) -> Router {
    Router::new().merge(create_graphql_router(schema)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

/// Handler for POST /graphql.
///
/// Responds with 200 when execution produced no errors and 400 otherwise,
/// including when the body is not a JSON GraphQL request.
#[tracing::instrument(skip(schema, payload))]
pub async fn graphql_handler(
    State(schema): State<TodoSchema>,
    payload: Result<Json<async_graphql::Request>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("Rejected GraphQL request body: {}", rejection);
            let body = serde_json::json!({
                "errors": [{ "message": rejection.body_text() }]
            });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let response = schema.execute(request).await;
    let status_code = if response.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status_code, Json(response)).into_response()
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let store = MongoTodoStore::connect(&config).await?;
    match store.ping().await {
        Ok(()) => tracing::info!("Pinged deployment, connected to MongoDB"),
        Err(err) => tracing::error!("Could not reach MongoDB, starting anyway: {}", err),
    }

    let schema = build_schema(TodoService::new(Arc::new(store.clone())));
    let app = create_app(schema);

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await;
    tracing::info!("MongoDB client closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
