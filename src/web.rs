mod biology;
mod health;

use crate::Result;
use crate::detect::Detector;
use crate::logging::*;
use crate::vision::ChatCompletion;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState<C> {
    pub detector: Detector<C>,
    pub port: u16,
}

pub fn router<C>(state: AppState<C>, body_limit: usize) -> Router
where
    C: ChatCompletion + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    add_routes(
        Router::<Arc<AppState<C>>>::new(),
        &[biology::add_route::<C>, health::add_route::<C>],
    )
    .with_state(Arc::new(state))
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(cors)
}

pub async fn run<C>(state: AppState<C>, body_limit: usize) -> Result<()>
where
    C: ChatCompletion + Send + Sync + 'static,
{
    let log = DEFAULT.new(o!("function" => "web::run"));
    let port = state.port;
    let app = router(state, body_limit);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(log, "listening"; "addr" => &addr);
    info!(log, "endpoints";
        "detect" => format!("POST http://localhost:{port}{}", biology::PATH),
        "health" => format!("GET http://localhost:{port}{}", health::PATH),
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn add_routes<T>(app: Router<T>, funcs: &[fn(Router<T>) -> Router<T>]) -> Router<T> {
    let mut app = app;
    for func in funcs {
        app = func(app);
    }
    app
}
