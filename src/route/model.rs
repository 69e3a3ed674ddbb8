use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, JsonSchema)]
pub struct PostPath {
	/// The unique identifier of the post.
	pub id: Uuid,
}

#[derive(Deserialize, JsonSchema)]
pub struct GroupPath {
	/// The unique URL fragment of the group.
	pub slug: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct ProfilePath {
	/// The username of the author.
	pub username: String,
}

/// The profile page of an author.
pub fn profile_location(username: &str) -> String {
	format!("/profile/{username}/")
}

/// The detail page of a post.
pub fn post_location(id: Uuid) -> String {
	format!("/posts/{id}/")
}
