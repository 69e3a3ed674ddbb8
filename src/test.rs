//! Shared helpers for the HTTP tests.

use std::sync::Arc;

pub use axum::http::StatusCode;
pub use axum_test::TestServer;
pub use serde_json::{json, Value};
pub use uuid::Uuid;

pub use crate::store::Store;
use crate::{
	cache::{test::ManualClock, MemoryPageCache},
	config::Config,
	model::{Group, NewGroup, Post, PostForm, User},
	session, State,
};

fn state(cache: MemoryPageCache) -> State {
	State {
		database: Arc::new(crate::store::MemoryStore::new()),
		cache: Arc::new(cache),
		config: Arc::new(Config::default()),
	}
}

fn server(state: State) -> TestServer {
	TestServer::new(crate::app(state)).unwrap()
}

/// A server backed by an in-memory store, and its state.
pub fn app() -> (TestServer, State) {
	let state = state(MemoryPageCache::new());

	(server(state.clone()), state)
}

/// Like [`app`], with a page cache driven by a clock the test controls.
pub fn app_with_clock() -> (TestServer, State, Arc<ManualClock>) {
	let clock = Arc::new(ManualClock::default());
	let state = state(MemoryPageCache::with_clock(clock.clone()));

	(server(state.clone()), state, clock)
}

pub async fn user(state: &State, username: &str) -> User {
	state.database.create_user(username).await.unwrap()
}

pub async fn group(state: &State, slug: &str) -> Group {
	state
		.database
		.create_group(NewGroup {
			title: slug.to_uppercase(),
			slug: slug.into(),
			description: format!("All about {slug}"),
		})
		.await
		.unwrap()
}

pub async fn post(state: &State, author: &User, text: &str, group: Option<&Group>) -> Post {
	state
		.database
		.insert_post(
			author.id,
			&PostForm {
				text: text.into(),
				group_id: group.map(|group| group.id),
				image: None,
			},
		)
		.await
		.unwrap()
}

/// The cookie the identity service sets for a session.
pub fn session_cookie(session_id: Uuid) -> cookie::Cookie<'static> {
	cookie::Cookie::build((session::COOKIE_NAME, session_id.to_string()))
		.http_only(true)
		.path("/")
		.into()
}

/// Opens a session for `user` and sends its cookie with every later request.
pub async fn login(app: &mut TestServer, state: &State, user: &User) {
	let session = state.database.create_session(user.id).await.unwrap();

	app.add_cookie(session_cookie(session.id));
}
