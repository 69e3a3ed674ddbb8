use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Rejects text that is empty once surrounding whitespace is removed.
fn validate_text(text: &str) -> Result<(), ValidationError> {
	if text.trim().is_empty() {
		let mut error = ValidationError::new("required");
		error.message = Some("This field is required.".into());

		return Err(error);
	}

	Ok(())
}

/// A single user.
///
/// Users are owned by the external identity service, this service only
/// references them as authors and followers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct User {
	/// The unique identifier of the user.
	pub id: Uuid,
	/// The username that is displayed to the public.
	pub username: String,
	/// The creation time of the user.
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A login session written by the identity service.
#[derive(Debug, Clone)]
pub struct Session {
	pub id: Uuid,
	pub user_id: Uuid,
	#[allow(dead_code)]
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A topical group that posts can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Group {
	/// The unique identifier of the group.
	pub id: Uuid,
	/// The display title of the group.
	pub title: String,
	/// The unique URL fragment of the group.
	pub slug: String,
	/// A description of the group.
	pub description: String,
}

/// The fields of a group to insert.
#[derive(Debug, Clone)]
pub struct NewGroup {
	pub title: String,
	pub slug: String,
	pub description: String,
}

/// A single post, written by a user.
#[model]
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, Validate)]
pub struct Post {
	/// The unique identifier of the post.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The text of the post.
	#[serde(default)]
	#[validate(custom(function = "validate_text"))]
	pub text: String,
	/// The group the post belongs to, if any.
	#[serde(default, rename = "group")]
	pub group_id: Option<Uuid>,
	/// Path of the uploaded image, if any.
	#[serde(default)]
	#[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
	pub image: Option<String>,
	/// The user that wrote the post.
	#[serde(skip_deserializing)]
	pub author_id: Uuid,
	/// The creation time of the post.
	#[serde(skip_deserializing)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// The time of the last edit, if the post was ever edited.
	#[serde(skip_deserializing)]
	pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A comment left on a post.
#[model]
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, Validate)]
pub struct Comment {
	/// The unique identifier of the comment.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The post the comment belongs to.
	#[serde(skip_deserializing)]
	pub post_id: Uuid,
	/// The user that wrote the comment.
	#[serde(skip_deserializing)]
	pub author_id: Uuid,
	/// The text of the comment.
	#[serde(default)]
	#[validate(custom(function = "validate_text"))]
	pub text: String,
	/// The creation time of the comment.
	#[serde(skip_deserializing)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// The time of the last modification, equal to `created_at` until then.
	#[serde(skip_deserializing)]
	pub updated_at: chrono::DateTime<chrono::Utc>,
	/// Whether the comment is shown under its post.
	#[serde(skip_deserializing)]
	pub active: bool,
}

/// A directed edge: `user_id` follows `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Follow {
	pub id: Uuid,
	pub user_id: Uuid,
	pub author_id: Uuid,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The author of a post or comment, embedded in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct AuthorRef {
	pub id: Uuid,
	pub username: String,
}

/// The group of a post, embedded in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct GroupRef {
	pub id: Uuid,
	pub slug: String,
	pub title: String,
}

/// A post together with its author and group, fetched in one pass.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PostView {
	pub id: Uuid,
	pub text: String,
	pub image: Option<String>,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
	pub author: AuthorRef,
	pub group: Option<GroupRef>,
}

/// A comment together with its author.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CommentView {
	pub id: Uuid,
	pub text: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
	pub author: AuthorRef,
}

/// Number of edges on either side of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FollowCounts {
	pub followers: i64,
	pub following: i64,
}

impl From<&User> for AuthorRef {
	fn from(user: &User) -> Self {
		Self {
			id: user.id,
			username: user.username.clone(),
		}
	}
}

impl From<&Group> for GroupRef {
	fn from(group: &Group) -> Self {
		Self {
			id: group.id,
			slug: group.slug.clone(),
			title: group.title.clone(),
		}
	}
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::{CommentForm, Post, PostForm};

	#[test]
	fn test_post_form_requires_text() {
		let form = PostForm {
			text: "  \n ".into(),
			group_id: None,
			image: None,
		};

		let errors = form.validate().unwrap_err();

		assert!(errors.field_errors().contains_key("text"));
	}

	#[test]
	fn test_post_form_from_post() {
		let post = Post {
			text: "hello".into(),
			image: Some("posts/a.gif".into()),
			..Default::default()
		};

		let form = PostForm::from(&post);

		assert_eq!(form.text, "hello");
		assert_eq!(form.image.as_deref(), Some("posts/a.gif"));
		assert!(form.group_id.is_none());
	}

	#[test]
	fn test_post_form_group_field_name() {
		let form: PostForm = serde_json::from_value(serde_json::json!({
			"text": "hello",
			"group": "8d0d4b5e-7bc3-4c55-9d43-6f1c1f3c2a10",
		}))
		.unwrap();

		assert!(form.group_id.is_some());
		assert!(form.image.is_none());
	}

	#[test]
	fn test_comment_form_accepts_text() {
		let form = CommentForm {
			text: "nice".into(),
		};

		assert!(form.validate().is_ok());
	}
}
