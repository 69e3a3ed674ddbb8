use aide::axum::IntoApiResponse;
use axum::{
	body::Bytes,
	extract::State,
	http::header,
	response::{IntoResponse, Response},
};
use macros::route;

use crate::{
	cache::{self, GLOBAL_FEED_TTL},
	extract::{Json, Path, Query, Session, Viewer},
	feed,
	model::PostView,
	openapi::tag,
	pagination::{Page, PageRequest},
	route::model,
	AppState, Database,
};

use super::RouteError;

fn json_body(body: Bytes) -> Response {
	([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Global feed
/// Returns a page of every post, newest first. A rendered page is served from the cache for 20 seconds, so new posts may appear late.
#[route(tag = tag::FEED, response(status = 200, shape = "Json<Page<PostView>>"))]
pub async fn global_feed(
	State(state): State<AppState>,
	Query(request): Query<PageRequest>,
) -> Result<impl IntoApiResponse, RouteError> {
	let key = cache::global_feed_key(&request);

	if let Some(body) = state.cache.get(&key).await {
		return Ok(json_body(body));
	}

	let page = feed::global_feed(state.database.as_ref(), &request).await?;
	let body = Bytes::from(serde_json::to_vec(&page)?);

	state.cache.set(&key, body.clone(), GLOBAL_FEED_TTL).await;

	Ok(json_body(body))
}

/// Group feed
/// Returns a group and a page of the posts assigned to it, newest first.
#[route(tag = tag::FEED, response(status = 200, shape = "Json<feed::GroupFeed>"))]
pub async fn group_feed(
	State(database): State<Database>,
	Path(model::GroupPath { slug }): Path<model::GroupPath>,
	Query(request): Query<PageRequest>,
) -> Result<Json<feed::GroupFeed>, RouteError> {
	Ok(Json(
		feed::group_feed(database.as_ref(), &slug, &request).await?,
	))
}

/// Profile
/// Returns an author, their follow counts and a page of their posts, newest first. When signed in, also tells whether you follow the author.
#[route(tag = tag::FEED, response(status = 200, shape = "Json<feed::ProfileFeed>"))]
pub async fn profile_feed(
	State(database): State<Database>,
	Viewer(viewer): Viewer,
	Path(model::ProfilePath { username }): Path<model::ProfilePath>,
	Query(request): Query<PageRequest>,
) -> Result<Json<feed::ProfileFeed>, RouteError> {
	Ok(Json(
		feed::profile_feed(database.as_ref(), &username, viewer.as_ref(), &request).await?,
	))
}

/// Following feed
/// Returns a page of the posts written by the authors you follow, newest first.
#[route(tag = tag::FEED, login_required, response(status = 200, shape = "Json<Page<PostView>>"))]
pub async fn following_feed(
	State(database): State<Database>,
	session: Session,
	Query(request): Query<PageRequest>,
) -> Result<Json<Page<PostView>>, RouteError> {
	Ok(Json(
		feed::following_feed(database.as_ref(), Some(&session.user), &request).await?,
	))
}
