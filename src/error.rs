use std::{borrow::Cow, convert::Infallible};

use aide::OperationOutput;
use axum::{
	extract::rejection::{BytesRejection, PathRejection, QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Redirect, Response},
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::store::StoreError;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// Error type for routes that have no errors of their own.
pub type AppError = RouteError<Infallible>;

/// A single error message shown to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A machine-readable description of the error.
	pub content: Cow<'static, str>,
	/// The request field that caused the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'static, str>>,
	/// Additional context for the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<Cow<'static, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Serialize) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), serde_json::json!(value));
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<Message>,
}

/// How a route-specific error is presented to the client.
///
/// Messages are sent to the client, so they should not contain
/// sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn into_errors(self) -> Vec<Message>;

	/// Where the client is sent instead of receiving an error body.
	fn redirect(&self) -> Option<String> {
		None
	}
}

impl ErrorShape for Infallible {
	fn status(&self) -> StatusCode {
		match *self {}
	}

	fn into_errors(self) -> Vec<Message> {
		match self {}
	}
}

/// Error type for a route, wrapping its own errors together with the
/// rejections of the extractors and failures of the store.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<E: ErrorShape> {
	#[error(transparent)]
	Route(E),
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("body error: {0}")]
	Body(#[from] BytesRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("failed to render response: {0}")]
	Render(#[from] serde_json::Error),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E: ErrorShape> RouteError<E> {
	fn status(&self) -> StatusCode {
		match self {
			Self::Route(error) => error.status(),
			Self::Validation(..) | Self::Body(..) | Self::Query(..) => StatusCode::BAD_REQUEST,
			Self::Path(..) => StatusCode::NOT_FOUND,
			Self::Store(..) | Self::Render(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		match self {
			Self::Route(error) => error.into_errors(),
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					let field = field.to_string();

					errors.iter().map(move |error| {
						Message::new(
							error
								.message
								.clone()
								.unwrap_or_else(|| error.code.clone()),
						)
						.field(field.clone())
					})
				})
				.collect(),
			Self::Body(rejection) => Message::new(rejection.body_text()).into_vec(),
			Self::Query(rejection) => Message::new(rejection.body_text()).into_vec(),
			Self::Path(..) => Message::new("not_found").into_vec(),
			Self::Store(..) | Self::Render(..) => Vec::new(),
		}
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response {
		if let Self::Route(ref error) = self {
			if let Some(location) = error.redirect() {
				return Redirect::to(&location).into_response();
			}
		}

		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		(
			status,
			Json(ErrorResponse {
				success: false,
				errors: self.into_errors(),
			}),
		)
			.into_response()
	}
}

impl<E: ErrorShape> OperationOutput for RouteError<E> {
	type Inner = ErrorResponse;
}

/// The response for paths that match no route.
pub async fn not_found() -> impl IntoResponse {
	(
		StatusCode::NOT_FOUND,
		Json(ErrorResponse {
			success: false,
			errors: Message::new("not_found").into_vec(),
		}),
	)
}
