mod session;

pub use session::{Session, Viewer};

use aide::OperationIo;
use axum::{
	body::Bytes,
	extract::{FromRequest, FromRequestParts, Request},
	http::request,
	response::{IntoResponse, Response},
};
use serde::de;

use crate::error::AppError;

/// A JSON response body, documented with the schema of `T`.
///
/// ```rust
/// async fn route() -> Json<Page<PostView>> {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(output_with = "axum::Json<T>", json_schema)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
	T: serde::Serialize,
{
	fn into_response(self) -> Response {
		axum::Json(self.0).into_response()
	}
}

/// Extractor that deserializes a submitted form without validating it.
///
/// The form is sent as a JSON document. Validation is left to the handler so
/// that a rejected form can be shown again together with its errors. An empty
/// or malformed body is read as an empty form, whatever its content type.
///
/// ```rust
/// async fn route(Form(form): Form<PostForm>) {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(input_with = "axum::Json<T>", json_schema)]
pub struct Form<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for Form<T>
where
	T: de::DeserializeOwned + Default,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let body = Bytes::from_request(req, state).await?;

		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Self(T::default()));
		}

		Ok(Self(serde_json::from_slice(&body).unwrap_or_else(|error| {
			tracing::debug!(%error, "malformed form body, reading it as empty");

			T::default()
		})))
	}
}

/// Extractor that deserializes a query string and validates it.
///
/// Unlike [`Form<T>`], this does not consume the body.
///
/// ```rust
/// async fn route(Query(params): Query<Params>) {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(input_with = "axum::extract::Query<T>", json_schema)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: de::DeserializeOwned + validator::Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Query::<T>::from_request_parts(parts, state)
			.await?
			.0;

		result.validate().map_err(Self::Rejection::Validation)?;
		Ok(Self(result))
	}
}

/// Extractor that deserializes path parameters.
///
/// Parameters that fail to parse (such as a malformed post id) reject
/// with a 404, as no resource can live at such a path.
#[derive(OperationIo)]
#[aide(input_with = "axum::extract::Path<T>", json_schema)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: de::DeserializeOwned + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		Ok(Self(
			axum::extract::Path::<T>::from_request_parts(parts, state)
				.await?
				.0,
		))
	}
}
