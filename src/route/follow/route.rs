use aide::axum::IntoApiResponse;
use axum::{
	extract::State,
	response::{IntoResponse, Redirect},
};
use macros::route;

use crate::{
	extract::{Path, Session},
	follow,
	openapi::tag,
	route::model,
	Database,
};

use super::RouteError;

/// Follow author
/// Subscribes you to an author's posts, then redirects to their profile. Following yourself or someone you already follow changes nothing.
#[route(tag = tag::FOLLOW, login_required, response(status = 303, description = "Redirects to the author's profile."))]
pub async fn follow_author(
	State(database): State<Database>,
	session: Session,
	Path(model::ProfilePath { username }): Path<model::ProfilePath>,
) -> Result<impl IntoApiResponse, RouteError> {
	let author = follow::follow_author(database.as_ref(), &session.user, &username).await?;

	Ok(Redirect::to(&model::profile_location(&author.username)).into_response())
}

/// Unfollow author
/// Removes your subscription to an author's posts, then redirects to their profile.
#[route(tag = tag::FOLLOW, login_required, response(status = 303, description = "Redirects to the author's profile."))]
pub async fn unfollow_author(
	State(database): State<Database>,
	session: Session,
	Path(model::ProfilePath { username }): Path<model::ProfilePath>,
) -> Result<impl IntoApiResponse, RouteError> {
	follow::unfollow_author(database.as_ref(), &session.user, &username).await?;

	Ok(Redirect::to(&model::profile_location(&username)).into_response())
}
