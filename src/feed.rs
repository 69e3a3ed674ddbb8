//! Composes the four post feeds: global, group, profile and following.
//!
//! Every feed is ordered newest first and sliced into pages of
//! [`PAGE_SIZE`] posts. The feeds know nothing about caching, the global feed
//! is cached by its route.

use schemars::JsonSchema;
use serde::Serialize;

use crate::{
	follow,
	model::{FollowCounts, Group, PostView, User},
	pagination::{Page, PageRequest, Paginator, PAGE_SIZE},
	store::{PostFilter, Store, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown group {0}")]
	UnknownGroup(String),
	#[error("unknown user {0}")]
	UnknownUser(String),
	#[error("authentication required")]
	Unauthenticated,
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// A group and one page of its posts.
#[derive(Debug, Serialize, JsonSchema)]
pub struct GroupFeed {
	pub group: Group,
	pub page: Page<PostView>,
}

/// An author, their follow counts and one page of their posts.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileFeed {
	pub author: User,
	pub counts: FollowCounts,
	/// Whether the viewer follows the author, always false for anonymous viewers.
	pub following: bool,
	pub page: Page<PostView>,
}

/// Counts the posts of a filter, resolves the requested page and fetches it.
async fn page_of(
	store: &dyn Store,
	filter: PostFilter,
	request: &PageRequest,
) -> Result<Page<PostView>, StoreError> {
	let total = store.count_posts(filter).await?;
	let window = Paginator::new(total, PAGE_SIZE).window(request);
	let posts = store.list_posts(filter, window).await?;

	Ok(Page::new(posts, window))
}

/// Every post, regardless of the viewer.
#[tracing::instrument(skip(store))]
pub async fn global_feed(
	store: &dyn Store,
	request: &PageRequest,
) -> Result<Page<PostView>, Error> {
	Ok(page_of(store, PostFilter::All, request).await?)
}

/// The posts assigned to the group with the given slug.
#[tracing::instrument(skip(store))]
pub async fn group_feed(
	store: &dyn Store,
	slug: &str,
	request: &PageRequest,
) -> Result<GroupFeed, Error> {
	let group = store
		.group_by_slug(slug)
		.await?
		.ok_or_else(|| Error::UnknownGroup(slug.to_owned()))?;
	let page = page_of(store, PostFilter::Group(group.id), request).await?;

	Ok(GroupFeed { group, page })
}

/// The posts written by the user with the given username.
#[tracing::instrument(skip(store, viewer))]
pub async fn profile_feed(
	store: &dyn Store,
	username: &str,
	viewer: Option<&User>,
	request: &PageRequest,
) -> Result<ProfileFeed, Error> {
	let author = store
		.user_by_username(username)
		.await?
		.ok_or_else(|| Error::UnknownUser(username.to_owned()))?;

	let page = page_of(store, PostFilter::Author(author.id), request).await?;
	let counts = follow::counts(store, author.id).await?;
	let following = match viewer {
		Some(viewer) => follow::is_following(store, viewer.id, author.id).await?,
		None => false,
	};

	Ok(ProfileFeed {
		author,
		counts,
		following,
		page,
	})
}

/// The posts written by anyone the viewer follows.
#[tracing::instrument(skip(store, viewer))]
pub async fn following_feed(
	store: &dyn Store,
	viewer: Option<&User>,
	request: &PageRequest,
) -> Result<Page<PostView>, Error> {
	let viewer = viewer.ok_or(Error::Unauthenticated)?;

	Ok(page_of(store, PostFilter::FollowedBy(viewer.id), request).await?)
}

#[cfg(test)]
mod test {
	use super::{following_feed, global_feed, group_feed, profile_feed, Error};
	use crate::{
		follow,
		model::{Group, NewGroup, PostForm, User},
		pagination::PageRequest,
		store::{MemoryStore, Store},
	};

	async fn group(store: &MemoryStore, slug: &str) -> Group {
		store
			.create_group(NewGroup {
				title: slug.to_uppercase(),
				slug: slug.into(),
				description: String::new(),
			})
			.await
			.unwrap()
	}

	async fn post(store: &MemoryStore, author: &User, text: &str, group: Option<&Group>) {
		store
			.insert_post(
				author.id,
				&PostForm {
					text: text.into(),
					group_id: group.map(|group| group.id),
					image: None,
				},
			)
			.await
			.unwrap();
	}

	fn texts(posts: &[crate::model::PostView]) -> Vec<&str> {
		posts.iter().map(|post| post.text.as_str()).collect()
	}

	#[tokio::test]
	async fn test_pagination_boundary() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();

		for i in 0..15 {
			post(&store, &leo, &format!("post {i}"), None).await;
		}

		let first = global_feed(&store, &PageRequest::number(1)).await.unwrap();
		let second = global_feed(&store, &PageRequest::number(2)).await.unwrap();
		let third = global_feed(&store, &PageRequest::number(3)).await.unwrap();

		assert_eq!(first.items.len(), 10);
		assert_eq!(second.items.len(), 5);
		assert_eq!(third.number, 2);
		assert_eq!(texts(&third.items), texts(&second.items));
		assert_eq!(first.items[0].text, "post 14");
		assert_eq!(second.items[4].text, "post 0");
	}

	#[tokio::test]
	async fn test_feed_isolation() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let cats = group(&store, "cats").await;
		let dogs = group(&store, "dogs").await;

		post(&store, &leo, "meow", Some(&cats)).await;
		post(&store, &leo, "woof", Some(&dogs)).await;

		let cats_feed = group_feed(&store, "cats", &PageRequest::default())
			.await
			.unwrap();
		let profile = profile_feed(&store, "leo", None, &PageRequest::default())
			.await
			.unwrap();
		let global = global_feed(&store, &PageRequest::default()).await.unwrap();

		assert_eq!(cats_feed.group.slug, "cats");
		assert_eq!(texts(&cats_feed.page.items), ["meow"]);
		assert_eq!(texts(&profile.page.items), ["woof", "meow"]);
		assert_eq!(texts(&global.items), ["woof", "meow"]);
		assert_eq!(
			cats_feed.page.items[0].group.as_ref().unwrap().slug,
			"cats"
		);
	}

	#[tokio::test]
	async fn test_unknown_group_and_user() {
		let store = MemoryStore::new();

		assert!(matches!(
			group_feed(&store, "nope", &PageRequest::default()).await,
			Err(Error::UnknownGroup(_))
		));
		assert!(matches!(
			profile_feed(&store, "nobody", None, &PageRequest::default()).await,
			Err(Error::UnknownUser(_))
		));
	}

	#[tokio::test]
	async fn test_following_feed() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let tolstoy = store.create_user("tolstoy").await.unwrap();
		let pushkin = store.create_user("pushkin").await.unwrap();

		post(&store, &tolstoy, "war and peace", None).await;
		post(&store, &pushkin, "onegin", None).await;

		let empty = following_feed(&store, Some(&leo), &PageRequest::default())
			.await
			.unwrap();
		assert!(empty.items.is_empty());
		assert_eq!(empty.num_pages, 1);

		follow::follow(&store, leo.id, tolstoy.id).await.unwrap();

		let feed = following_feed(&store, Some(&leo), &PageRequest::default())
			.await
			.unwrap();
		assert_eq!(texts(&feed.items), ["war and peace"]);

		// Edges are directed: tolstoy does not see leo's subscriptions.
		let feed = following_feed(&store, Some(&tolstoy), &PageRequest::default())
			.await
			.unwrap();
		assert!(feed.items.is_empty());
	}

	#[tokio::test]
	async fn test_following_feed_requires_viewer() {
		let store = MemoryStore::new();

		assert!(matches!(
			following_feed(&store, None, &PageRequest::default()).await,
			Err(Error::Unauthenticated)
		));
	}

	#[tokio::test]
	async fn test_profile_following_flag() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let tolstoy = store.create_user("tolstoy").await.unwrap();

		follow::follow(&store, leo.id, tolstoy.id).await.unwrap();

		let seen_by_leo = profile_feed(&store, "tolstoy", Some(&leo), &PageRequest::default())
			.await
			.unwrap();
		let anonymous = profile_feed(&store, "tolstoy", None, &PageRequest::default())
			.await
			.unwrap();

		assert!(seen_by_leo.following);
		assert!(!anonymous.following);
		assert_eq!(seen_by_leo.counts.followers, 1);
		assert_eq!(seen_by_leo.counts.following, 0);
	}
}
