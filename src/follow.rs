//! The directed follow graph between users.

use uuid::Uuid;

use crate::{
	model::{Follow, FollowCounts, User},
	store::{Constraint, Store, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown user {0}")]
	UnknownUser(String),
	#[error("not following {0}")]
	NotFollowing(String),
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Records that `follower_id` follows `target_id`.
///
/// Following yourself is a no-op and returns `None`. Following someone twice
/// returns the existing edge. When a concurrent call inserts the same edge
/// first, the unique constraint rejects ours and the winner's edge is returned.
#[tracing::instrument(skip(store))]
pub async fn follow(
	store: &dyn Store,
	follower_id: Uuid,
	target_id: Uuid,
) -> Result<Option<Follow>, StoreError> {
	if follower_id == target_id {
		return Ok(None);
	}

	if let Some(existing) = store.find_follow(follower_id, target_id).await? {
		return Ok(Some(existing));
	}

	match store.insert_follow(follower_id, target_id).await {
		Ok(follow) => {
			tracing::info!(monotonic_counter.follows = 1_u64, "follow edge created");

			Ok(Some(follow))
		}
		Err(StoreError::Constraint(Constraint::DuplicateFollow)) => {
			store.find_follow(follower_id, target_id).await
		}
		Err(error) => Err(error),
	}
}

/// Removes the edge from `follower_id` to `author`.
///
/// Fails with [`Error::NotFollowing`] when there is no such edge.
#[tracing::instrument(skip(store, author), fields(author = %author.username))]
pub async fn unfollow(store: &dyn Store, follower_id: Uuid, author: &User) -> Result<(), Error> {
	let edge = store
		.find_follow(follower_id, author.id)
		.await?
		.ok_or_else(|| Error::NotFollowing(author.username.clone()))?;

	// A concurrent unfollow may have removed the edge in between.
	if !store.delete_follow(edge.id).await? {
		return Err(Error::NotFollowing(author.username.clone()));
	}

	tracing::info!(monotonic_counter.unfollows = 1_u64, "follow edge removed");

	Ok(())
}

pub async fn is_following(
	store: &dyn Store,
	follower_id: Uuid,
	target_id: Uuid,
) -> Result<bool, StoreError> {
	Ok(store.find_follow(follower_id, target_id).await?.is_some())
}

pub async fn counts(store: &dyn Store, user_id: Uuid) -> Result<FollowCounts, StoreError> {
	store.follow_counts(user_id).await
}

/// Resolves a username, failing with [`Error::UnknownUser`].
pub async fn resolve_author(store: &dyn Store, username: &str) -> Result<User, Error> {
	store
		.user_by_username(username)
		.await?
		.ok_or_else(|| Error::UnknownUser(username.to_owned()))
}

/// Follows the user named `username`, returning them.
pub async fn follow_author(store: &dyn Store, follower: &User, username: &str) -> Result<User, Error> {
	let author = resolve_author(store, username).await?;

	follow(store, follower.id, author.id).await?;

	Ok(author)
}

/// Unfollows the user named `username`.
pub async fn unfollow_author(store: &dyn Store, follower: &User, username: &str) -> Result<(), Error> {
	let author = store
		.user_by_username(username)
		.await?
		.ok_or_else(|| Error::NotFollowing(username.to_owned()))?;

	unfollow(store, follower.id, &author).await
}
