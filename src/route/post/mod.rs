use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{authoring::Error, error, AppState};

pub mod route;

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/create/",
			get_with(create_form, create_form_docs).post_with(create_post, create_post_docs),
		)
		.api_route("/posts/:id/", get_with(get_post, get_post_docs))
		.api_route(
			"/posts/:id/edit/",
			get_with(edit_form, edit_form_docs).post_with(edit_post, edit_post_docs),
		)
		.api_route(
			"/posts/:id/comment/",
			post_with(add_comment, add_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		match self {
			Self::UnknownPost(post) => error::Message::new("unknown_post")
				.detail("post", post)
				.into_vec(),
			Self::Store(..) => Vec::new(),
		}
	}
}
