use axum::http::StatusCode;

use crate::error::{self, ErrorShape};

/// The cookie holding the id of a session written by the identity service.
pub const COOKIE_NAME: &str = "session";

/// An error that can occur while resolving the current user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The route requires a session and there is none, the client is sent
	/// to the login page.
	#[error("login required")]
	LoginRequired { location: String },
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::LoginRequired { .. } => StatusCode::UNAUTHORIZED,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		error::Message::new("login_required").into_vec()
	}

	fn redirect(&self) -> Option<String> {
		match self {
			Self::LoginRequired { location } => Some(location.clone()),
		}
	}
}

/// The login page, with `next` set to the page the client asked for.
///
/// A login URL that already carries a query string keeps it.
pub fn login_redirect(login_url: &str, next: &str) -> String {
	let query = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("next", next)
		.finish();
	let separator = if !login_url.contains('?') {
		"?"
	} else if login_url.ends_with(['?', '&']) {
		""
	} else {
		"&"
	};

	format!("{login_url}{separator}{query}")
}
