use std::sync::Arc;

use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts, OriginalUri},
	http::{header, request, HeaderMap},
};
use uuid::Uuid;

use crate::{
	config::Config,
	error::{AppError, RouteError},
	model::User,
	openapi::SECURITY_SCHEME_SESSION,
	session,
	store::StoreError,
	Database,
};

/// Reads the session id from the session cookie, if there is a well-formed one.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
	let cookie = headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME)?;

	Uuid::parse_str(cookie.value()).ok()
}

/// Resolves the user behind the session cookie.
///
/// A missing, malformed or unknown session is an anonymous request.
async fn current_user<S>(parts: &request::Parts, state: &S) -> Result<Option<User>, StoreError>
where
	Database: FromRef<S>,
	S: Sync,
{
	let Some(session_id) = session_id(&parts.headers) else {
		return Ok(None);
	};

	Database::from_ref(state).session_user(session_id).await
}

/// Extracts the authenticated user from the request.
///
/// If there is no valid session, the client is redirected to the login page
/// with the requested path and query as `next`.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub user: User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	Arc<Config>: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<session::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		if let Some(user) = current_user(parts, state).await? {
			return Ok(Session { user });
		}

		// Nested routers strip their prefix from the request uri.
		let uri = parts
			.extensions
			.get::<OriginalUri>()
			.map_or(&parts.uri, |original| &original.0);
		let next = uri.path_and_query().map_or("/", |path| path.as_str());
		let config = Arc::<Config>::from_ref(state);

		Err(session::Error::LoginRequired {
			location: session::login_redirect(&config.login_url, next),
		}
		.into())
	}
}

impl OperationInput for Session {
	/// This adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation
			.security
			.push([(SECURITY_SCHEME_SESSION.to_string(), Vec::new())].into_iter().collect());
	}
}

/// The user behind the request, or `None` for anonymous requests.
#[derive(Debug)]
pub struct Viewer(pub Option<User>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Viewer
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		Ok(Viewer(current_user(parts, state).await?))
	}
}

impl OperationInput for Viewer {
	/// The session cookie is optional: an empty requirement allows anonymous access.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.extend([
			Default::default(),
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		]);
	}
}
