use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json, session};

pub const SECURITY_SCHEME_SESSION: &str = "Session";

pub mod tag {
	pub const FEED: &str = "Feed";
	pub const POST: &str = "Post";
	pub const FOLLOW: &str = "Follow";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Blog Open API")
		.summary("Posts, groups, comments and the feeds built from them")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::FEED.into(),
			description: Some("Paginated post feeds".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Writing posts and comments".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::FOLLOW.into(),
			description: Some("Following authors".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("A session cookie issued by the identity service".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				success: false,
				errors: error::Message::new("unknown_post")
					.detail("post", "3f1c2b8e-5d4a-4b6f-9e2d-7a8c1b0d9e4f")
					.into_vec(),
			})
		})
}
