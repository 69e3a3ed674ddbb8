use aide::axum::IntoApiResponse;
use axum::{
	extract::State,
	response::{IntoResponse, Redirect},
};
use macros::route;

use crate::{
	authoring::{self, Access, FormState, PostDetail, Submission},
	extract::{Form, Json, Path, Session},
	model::{CommentForm, PostForm},
	openapi::tag,
	route::model,
	Database,
};

use super::RouteError;

/// Get single post
/// Returns a post together with its comments, newest first, and an empty comment form.
#[route(tag = tag::POST, response(status = 200, shape = "Json<PostDetail>"))]
pub async fn get_post(
	State(database): State<Database>,
	Path(model::PostPath { id }): Path<model::PostPath>,
) -> Result<Json<PostDetail>, RouteError> {
	Ok(Json(authoring::post_detail(database.as_ref(), id).await?))
}

/// New post form
/// Returns an empty post form and the groups a post can be assigned to.
#[route(tag = tag::POST, login_required, response(status = 200, shape = "Json<FormState>"))]
pub async fn create_form(
	State(database): State<Database>,
	_session: Session,
) -> Result<Json<FormState>, RouteError> {
	Ok(Json(authoring::open_create_form(database.as_ref()).await?))
}

/// Create post
/// Publishes a new post and redirects to your profile. An invalid form is returned again together with its errors.
#[route(
	tag = tag::POST,
	login_required,
	response(status = 200, description = "The form was rejected.", shape = "Json<FormState>"),
	response(status = 303, description = "Redirects to your profile.")
)]
pub async fn create_post(
	State(database): State<Database>,
	session: Session,
	Form(form): Form<PostForm>,
) -> Result<impl IntoApiResponse, RouteError> {
	Ok(
		match authoring::create_post(database.as_ref(), &session.user, form).await? {
			Submission::Saved(..) => {
				Redirect::to(&model::profile_location(&session.user.username)).into_response()
			}
			Submission::Rejected(state) => Json(state).into_response(),
		},
	)
}

/// Edit post form
/// Returns the edit form of one of your posts, filled with its current values. Anyone else is redirected to the post.
#[route(
	tag = tag::POST,
	login_required,
	response(status = 200, shape = "Json<FormState>"),
	response(status = 303, description = "Not the author, redirects to the post.")
)]
pub async fn edit_form(
	State(database): State<Database>,
	session: Session,
	Path(model::PostPath { id }): Path<model::PostPath>,
) -> Result<impl IntoApiResponse, RouteError> {
	Ok(
		match authoring::open_edit_form(database.as_ref(), &session.user, id).await? {
			Access::Granted(state) => Json(state).into_response(),
			Access::Deflected(location) => Redirect::to(&location).into_response(),
		},
	)
}

/// Edit post
/// Replaces the text, group and image of one of your posts and redirects to it. Anyone else is redirected to the post without changing it.
#[route(
	tag = tag::POST,
	login_required,
	response(status = 200, description = "The form was rejected.", shape = "Json<FormState>"),
	response(status = 303, description = "Redirects to the post.")
)]
pub async fn edit_post(
	State(database): State<Database>,
	session: Session,
	Path(model::PostPath { id }): Path<model::PostPath>,
	Form(form): Form<PostForm>,
) -> Result<impl IntoApiResponse, RouteError> {
	Ok(
		match authoring::edit_post(database.as_ref(), &session.user, id, form).await? {
			Access::Granted(Submission::Saved(post)) => {
				Redirect::to(&model::post_location(post.id)).into_response()
			}
			Access::Granted(Submission::Rejected(state)) => Json(state).into_response(),
			Access::Deflected(location) => Redirect::to(&location).into_response(),
		},
	)
}

/// Add comment
/// Leaves a comment on a post and redirects to it. A blank comment is ignored.
#[route(tag = tag::POST, login_required, response(status = 303, description = "Redirects to the post."))]
pub async fn add_comment(
	State(database): State<Database>,
	session: Session,
	Path(model::PostPath { id }): Path<model::PostPath>,
	Form(form): Form<CommentForm>,
) -> Result<impl IntoApiResponse, RouteError> {
	authoring::add_comment(database.as_ref(), &session.user, id, form).await?;

	Ok(Redirect::to(&model::post_location(id)).into_response())
}
