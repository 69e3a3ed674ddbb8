use aide::axum::{routing::post_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, follow::Error, AppState};

pub mod route;

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/profile/:username/follow/",
			post_with(follow_author, follow_author_docs),
		)
		.api_route(
			"/profile/:username/unfollow/",
			post_with(unfollow_author, unfollow_author_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) | Self::NotFollowing(..) => StatusCode::NOT_FOUND,
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		match self {
			Self::UnknownUser(username) => error::Message::new("unknown_user")
				.detail("username", username)
				.into_vec(),
			Self::NotFollowing(username) => error::Message::new("not_following")
				.detail("username", username)
				.into_vec(),
			Self::Store(..) => Vec::new(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	async fn followers(app: &TestServer, username: &str) -> Value {
		app.get(&format!("/profile/{username}/"))
			.await
			.json::<Value>()["counts"]["followers"]
			.clone()
	}

	#[tokio::test]
	async fn test_follow_is_idempotent() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;
		user(&state, "tolstoy").await;

		login(&mut app, &state, &leo).await;

		for _ in 0..2 {
			let response = app.post("/profile/tolstoy/follow/").await;

			response.assert_status(StatusCode::SEE_OTHER);
			assert_eq!(response.header("location"), "/profile/tolstoy/");
		}

		assert_eq!(followers(&app, "tolstoy").await, 1);
	}

	#[tokio::test]
	async fn test_self_follow_is_noop() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;

		login(&mut app, &state, &leo).await;

		let response = app.post("/profile/leo/follow/").await;

		response.assert_status(StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/leo/");
		assert_eq!(followers(&app, "leo").await, 0);
	}

	#[tokio::test]
	async fn test_unfollow_non_edge_is_not_found() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;
		user(&state, "tolstoy").await;

		login(&mut app, &state, &leo).await;

		let response = app.post("/profile/tolstoy/unfollow/").await;

		response.assert_status(StatusCode::NOT_FOUND);
		assert_eq!(response.json::<Value>()["errors"][0]["content"], "not_following");
		assert_eq!(followers(&app, "tolstoy").await, 0);
	}

	#[tokio::test]
	async fn test_unfollow_removes_edge() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;
		user(&state, "tolstoy").await;

		login(&mut app, &state, &leo).await;

		app.post("/profile/tolstoy/follow/").await;
		assert_eq!(followers(&app, "tolstoy").await, 1);

		let response = app.post("/profile/tolstoy/unfollow/").await;

		response.assert_status(StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/tolstoy/");
		assert_eq!(followers(&app, "tolstoy").await, 0);
	}

	#[tokio::test]
	async fn test_follow_unknown_user() {
		let (mut app, state) = app();
		let leo = user(&state, "leo").await;

		login(&mut app, &state, &leo).await;

		app.post("/profile/nobody/follow/")
			.await
			.assert_status(StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_follow_requires_login() {
		let (app, state) = app();
		user(&state, "tolstoy").await;

		let response = app.post("/profile/tolstoy/follow/").await;

		response.assert_status(StatusCode::SEE_OTHER);
		assert_eq!(
			response.header("location"),
			"/auth/login/?next=%2Fprofile%2Ftolstoy%2Ffollow%2F"
		);
		assert_eq!(followers(&app, "tolstoy").await, 0);
	}
}
