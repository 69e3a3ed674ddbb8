//! Persistence boundary for users, groups, posts, comments and follows.
//!
//! The follow constraints (one edge per pair, no self-follow) are enforced by
//! every adapter, not by its callers: an insert that breaks them fails with
//! [`StoreError::Constraint`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use uuid::Uuid;

use crate::{
	model::{
		Comment, CommentView, Follow, FollowCounts, Group, NewGroup, Post, PostForm, PostView,
		Session, User,
	},
	pagination::Window,
};

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
	/// Every post.
	All,
	/// Posts assigned to a group.
	Group(Uuid),
	/// Posts written by a user.
	Author(Uuid),
	/// Posts written by anyone the user follows.
	FollowedBy(Uuid),
}

/// A storage-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Constraint {
	#[error("follow_user_author_unique")]
	DuplicateFollow,
	#[error("follow_prevent_self_follow")]
	SelfFollow,
	#[error("group_slug_key")]
	DuplicateSlug,
	#[error("user_username_key")]
	DuplicateUsername,
	#[error("foreign key")]
	MissingReference,
}

impl Constraint {
	/// Maps a PostgreSQL constraint name to the constraint it enforces.
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"follow_user_author_unique" => Self::DuplicateFollow,
			"follow_prevent_self_follow" => Self::SelfFollow,
			"group_slug_key" => Self::DuplicateSlug,
			"user_username_key" => Self::DuplicateUsername,
			name if name.ends_with("_fkey") => Self::MissingReference,
			_ => return None,
		})
	}
}

/// Error type for the persistence layer.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Database(sqlx::Error),
	#[error("constraint violated: {0}")]
	Constraint(Constraint),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
	fn from(error: sqlx::Error) -> Self {
		if let sqlx::Error::Database(ref database) = error {
			if let Some(constraint) = database.constraint().and_then(Constraint::from_name) {
				return Self::Constraint(constraint);
			}
		}

		Self::Database(error)
	}
}

#[axum::async_trait]
pub trait Store: Send + Sync {
	async fn create_user(&self, username: &str) -> Result<User, StoreError>;

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

	/// Deletes a user together with their posts, comments, sessions and follow edges.
	async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

	async fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError>;

	/// Resolves a session id to the user that owns it.
	async fn session_user(&self, session_id: Uuid) -> Result<Option<User>, StoreError>;

	async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError>;

	async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, StoreError>;

	async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, StoreError>;

	/// Lists every group, ordered by title.
	async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

	/// Deletes a group, leaving its posts without a group.
	async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError>;

	async fn count_posts(&self, filter: PostFilter) -> Result<i64, StoreError>;

	/// Lists posts newest first, with author and group joined in the same query.
	async fn list_posts(
		&self,
		filter: PostFilter,
		window: Window,
	) -> Result<Vec<PostView>, StoreError>;

	async fn post_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

	async fn post_view(&self, id: Uuid) -> Result<Option<PostView>, StoreError>;

	async fn insert_post(&self, author_id: Uuid, form: &PostForm) -> Result<Post, StoreError>;

	/// Replaces the editable fields of a post and sets `modified_at`.
	async fn update_post(&self, id: Uuid, form: &PostForm) -> Result<Option<Post>, StoreError>;

	/// Deletes a post together with its comments.
	async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError>;

	async fn insert_comment(
		&self,
		post_id: Uuid,
		author_id: Uuid,
		text: &str,
	) -> Result<Comment, StoreError>;

	/// Lists the active comments of a post, newest first.
	async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, StoreError>;

	async fn find_follow(
		&self,
		user_id: Uuid,
		author_id: Uuid,
	) -> Result<Option<Follow>, StoreError>;

	async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<Follow, StoreError>;

	async fn delete_follow(&self, id: Uuid) -> Result<bool, StoreError>;

	async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts, StoreError>;
}

#[cfg(test)]
mod test {
	use super::Constraint;

	#[test]
	fn test_constraint_from_name() {
		assert_eq!(
			Constraint::from_name("follow_user_author_unique"),
			Some(Constraint::DuplicateFollow)
		);
		assert_eq!(
			Constraint::from_name("follow_prevent_self_follow"),
			Some(Constraint::SelfFollow)
		);
		assert_eq!(
			Constraint::from_name("post_author_id_fkey"),
			Some(Constraint::MissingReference)
		);
		assert_eq!(Constraint::from_name("something_else"), None);
	}
}
