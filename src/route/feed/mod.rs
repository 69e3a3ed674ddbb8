use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, feed::Error, AppState};

pub mod route;

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", get_with(global_feed, global_feed_docs))
		.api_route("/group/:slug/", get_with(group_feed, group_feed_docs))
		.api_route("/profile/:username/", get_with(profile_feed, profile_feed_docs))
		.api_route("/follow/", get_with(following_feed, following_feed_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownGroup(..) | Self::UnknownUser(..) => StatusCode::NOT_FOUND,
			Self::Unauthenticated => StatusCode::UNAUTHORIZED,
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		match self {
			Self::UnknownGroup(slug) => error::Message::new("unknown_group")
				.detail("slug", slug)
				.into_vec(),
			Self::UnknownUser(username) => error::Message::new("unknown_user")
				.detail("username", username)
				.into_vec(),
			Self::Unauthenticated => error::Message::new("login_required").into_vec(),
			Self::Store(..) => Vec::new(),
		}
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use crate::{cache::GLOBAL_FEED_TTL, test::*};

	#[tokio::test]
	async fn test_global_feed_pagination() {
		let (app, state) = app();
		let leo = user(&state, "leo").await;

		for i in 0..15 {
			post(&state, &leo, &format!("post {i}"), None).await;
		}

		let first = app.get("/").await.json::<Value>();
		let second = app.get("/").add_query_param("page", 2).await.json::<Value>();
		let past_end = app.get("/").add_query_param("page", 3).await.json::<Value>();
		let garbage = app
			.get("/")
			.add_query_param("page", "abc")
			.await
			.json::<Value>();

		assert_eq!(first["items"].as_array().unwrap().len(), 10);
		assert_eq!(first["items"][0]["text"], "post 14");
		assert_eq!(first["has_next"], true);
		assert_eq!(second["items"].as_array().unwrap().len(), 5);
		assert_eq!(past_end["number"], 2);
		assert_eq!(past_end["items"], second["items"]);
		assert_eq!(garbage["number"], 1);
	}

	#[tokio::test]
	async fn test_global_feed_is_cached_until_flushed() {
		let (app, state) = app();
		let leo = user(&state, "leo").await;

		let before = post(&state, &leo, "before", None).await;

		let cached = app.get("/").await;
		cached.assert_status_ok();

		post(&state, &leo, "after", None).await;
		state.database.delete_post(before.id).await.unwrap();

		let stale = app.get("/").await;
		assert_eq!(stale.as_bytes(), cached.as_bytes());
		assert_eq!(stale.json::<Value>()["items"][0]["text"], "before");

		// An explicit first page shares the cached entry.
		let page = app.get("/").add_query_param("page", 1).await;
		assert_eq!(page.as_bytes(), cached.as_bytes());

		state.cache.flush().await;

		let fresh = app.get("/").await.json::<Value>();
		assert_eq!(fresh["total"], 1);
		assert_eq!(fresh["items"][0]["text"], "after");
	}

	#[tokio::test]
	async fn test_malformed_pages_share_first_page_entry() {
		let (app, state) = app();
		let leo = user(&state, "leo").await;

		post(&state, &leo, "before", None).await;

		let cached = app.get("/").await;
		post(&state, &leo, "after", None).await;

		for page in ["abc", "0", "-1", ""] {
			let response = app.get("/").add_query_param("page", page).await;
			assert_eq!(response.as_bytes(), cached.as_bytes());
		}
	}

	#[tokio::test]
	async fn test_global_feed_cache_expires() {
		let (app, state, clock) = app_with_clock();
		let leo = user(&state, "leo").await;

		post(&state, &leo, "before", None).await;
		app.get("/").await.assert_status_ok();
		post(&state, &leo, "after", None).await;

		clock.advance(GLOBAL_FEED_TTL - Duration::from_secs(1));
		assert_eq!(app.get("/").await.json::<Value>()["total"], 1);

		clock.advance(Duration::from_secs(1));
		assert_eq!(app.get("/").await.json::<Value>()["total"], 2);
	}

	#[tokio::test]
	async fn test_group_feed_isolation() {
		let (app, state) = app();
		let leo = user(&state, "leo").await;
		let cats = group(&state, "cats").await;
		let dogs = group(&state, "dogs").await;

		post(&state, &leo, "meow", Some(&cats)).await;
		post(&state, &leo, "woof", Some(&dogs)).await;

		let response = app.get("/group/cats/").await;
		response.assert_status_ok();

		let body = response.json::<Value>();

		assert_eq!(body["group"]["slug"], "cats");
		assert_eq!(body["page"]["total"], 1);
		assert_eq!(body["page"]["items"][0]["text"], "meow");
		assert_eq!(body["page"]["items"][0]["group"]["slug"], "cats");
		assert_eq!(body["page"]["items"][0]["author"]["username"], "leo");
	}

	#[tokio::test]
	async fn test_unknown_group_and_profile() {
		let (app, _) = app();

		app.get("/group/nope/")
			.await
			.assert_status(StatusCode::NOT_FOUND);
		app.get("/profile/nobody/")
			.await
			.assert_status(StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_profile_feed() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;
		let tolstoy = user(&state, "tolstoy").await;

		post(&state, &tolstoy, "war and peace", None).await;
		post(&state, &leo, "hello", None).await;

		let anonymous = app.get("/profile/tolstoy/").await.json::<Value>();

		assert_eq!(anonymous["author"]["username"], "tolstoy");
		assert_eq!(anonymous["page"]["total"], 1);
		assert_eq!(anonymous["following"], false);

		login(&mut app, &state, &leo).await;
		app.post("/profile/tolstoy/follow/").await;

		let body = app.get("/profile/tolstoy/").await.json::<Value>();

		assert_eq!(body["following"], true);
		assert_eq!(body["counts"]["followers"], 1);
	}

	#[tokio::test]
	async fn test_following_feed_requires_login() {
		let (app, _) = app();

		let response = app.get("/follow/").add_query_param("page", 2).await;

		response.assert_status(StatusCode::SEE_OTHER);
		assert_eq!(
			response.header("location"),
			"/auth/login/?next=%2Ffollow%2F%3Fpage%3D2"
		);
	}

	#[tokio::test]
	async fn test_following_feed() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;
		let tolstoy = user(&state, "tolstoy").await;
		let pushkin = user(&state, "pushkin").await;

		post(&state, &tolstoy, "war and peace", None).await;
		post(&state, &pushkin, "onegin", None).await;

		login(&mut app, &state, &leo).await;

		let empty = app.get("/follow/").await.json::<Value>();
		assert_eq!(empty["total"], 0);
		assert_eq!(empty["num_pages"], 1);

		app.post("/profile/tolstoy/follow/").await;

		let body = app.get("/follow/").await.json::<Value>();
		assert_eq!(body["total"], 1);
		assert_eq!(body["items"][0]["text"], "war and peace");
	}
}
