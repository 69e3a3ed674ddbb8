#![warn(clippy::pedantic)]

mod authoring;
mod cache;
mod config;
mod error;
mod extract;
mod feed;
mod follow;
mod model;
mod openapi;
mod pagination;
mod route;
mod session;
mod store;
#[cfg(test)]
mod test;
mod trace;

use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{Extension, Router};
use tower_http::{
	catch_panic::CatchPanicLayer,
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{
	cache::{MemoryPageCache, PageCache},
	config::Config,
	store::{MemoryStore, PgStore, Store},
};

pub type Database = Arc<dyn Store>;
pub type AppState = State;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as the store, the page cache or the configuration.
///
/// For dependencies only used by a single handler, you can combine states instead.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub cache: Arc<dyn PageCache>,
	pub config: Arc<Config>,
}

/// Builds the router with every route, the `OpenAPI` document and the
/// middleware stack.
pub fn app(state: State) -> Router {
	aide::gen::on_error(|error| tracing::warn!(%error, "failed to generate OpenAPI schema"));
	aide::gen::extract_schemas(true);

	let mut api = OpenApi::default();

	ApiRouter::new()
		.merge(route::feed::routes())
		.merge(route::follow::routes())
		.merge(route::post::routes())
		.nest_api_service("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.fallback(error::not_found)
		.layer(CompressionLayer::new())
		.layer(TraceLayer::new_for_http())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.layer(CatchPanicLayer::new())
		.with_state(state)
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = Config::from_env().expect("invalid configuration");
	let _guard = trace::init_tracing_subscriber(&config).expect("failed to initialize tracing");

	let database: Database = if let Some(url) = config.database_url.as_deref() {
		Arc::new(
			PgStore::connect(url)
				.await
				.expect("failed to connect to database"),
		)
	} else {
		tracing::warn!("DATABASE_URL is not set, data is kept in memory");
		Arc::new(MemoryStore::new())
	};

	let state = State {
		database,
		cache: Arc::new(MemoryPageCache::new().max_entries(config.page_cache_max_entries)),
		config: Arc::new(config),
	};

	let listener = tokio::net::TcpListener::bind((state.config.host, state.config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!(
		host = %state.config.host,
		port = state.config.port,
		"listening"
	);

	axum::serve(listener, app(state))
		.await
		.expect("server error");
}
