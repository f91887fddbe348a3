#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod media;
mod model;
mod openapi;
mod ratelimit;
mod route;
mod store;
#[cfg(test)]
mod test;
mod trace;

use std::{net::SocketAddr, sync::Arc};

use axum::{extract::Request, ServiceExt};
use tower::Layer;
use tower_governor::GovernorLayer;
use tower_http::normalize_path::NormalizePathLayer;

use crate::{
	config::Config,
	media::MediaStore,
	store::{MemoryStore, PgStore, SharedStore},
};

pub type AppState = State;

/// The shared application state.
///
/// Handlers pull out the parts they need through [`axum::extract::FromRef`].
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub store: SharedStore,
	pub media: MediaStore,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(config.otlp)?;

	let store: SharedStore = match &config.database_url {
		Some(url) => {
			let store = PgStore::connect(url).await?;

			store.migrate().await?;
			Arc::new(store)
		}
		None => {
			tracing::warn!("DATABASE_URL is not set, posts will only be kept in memory");

			Arc::new(MemoryStore::new())
		}
	};

	let state = State {
		store,
		media: MediaStore::new(config.media_root.clone()),
	};

	let governor = ratelimit::default();

	ratelimit::cleanup_old_limits(&[&governor]);

	let app = route::router(state).layer(GovernorLayer { config: governor });
	let app = NormalizePathLayer::trim_trailing_slash().layer(app);

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await?;

	Ok(())
}
