//! Creating and editing posts, and commenting on them.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
	model::{Comment, CommentForm, CommentView, Group, Post, PostForm, PostView, User},
	store::{Store, StoreError},
};

/// Field name to the messages describing why its value was rejected.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const UNKNOWN_GROUP_MESSAGE: &str =
	"Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown post {0}")]
	UnknownPost(Uuid),
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// A post form as shown to its author, with the groups it can be assigned to.
#[derive(Debug, Serialize, JsonSchema)]
pub struct FormState {
	pub form: PostForm,
	/// Empty unless a submission was rejected.
	pub errors: FieldErrors,
	pub is_edit: bool,
	pub groups: Vec<Group>,
}

/// The outcome of submitting a post form.
#[derive(Debug)]
pub enum Submission {
	Saved(Post),
	/// Nothing was written, the form is shown again with its errors.
	Rejected(FormState),
}

/// Whether the actor may touch a post.
#[derive(Debug)]
pub enum Access<T> {
	Granted(T),
	/// The actor is sent elsewhere instead of being refused.
	Deflected(String),
}

/// A post with its visible comments and an empty comment form.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PostDetail {
	pub post: PostView,
	pub comments: Vec<CommentView>,
	pub form: CommentForm,
}

/// The location a non-author is sent to when opening or submitting the edit
/// form of someone else's post: the post's detail view.
pub fn deflect_unauthorized_edit(post_id: Uuid) -> String {
	format!("/posts/{post_id}/")
}

/// Trims the text and turns a blank image path into no image.
fn normalize(mut form: PostForm) -> PostForm {
	form.text = form.text.trim().to_owned();
	form.image = form
		.image
		.map(|image| image.trim().to_owned())
		.filter(|image| !image.is_empty());

	form
}

fn describe(error: &ValidationError) -> String {
	error
		.message
		.as_ref()
		.map_or_else(|| error.code.to_string(), ToString::to_string)
}

/// Validates the form fields, then checks that the chosen group exists.
async fn validate(store: &dyn Store, form: &PostForm) -> Result<FieldErrors, StoreError> {
	let mut errors = FieldErrors::new();

	if let Err(invalid) = form.validate() {
		for (field, field_errors) in invalid.field_errors() {
			errors
				.entry(field.to_string())
				.or_default()
				.extend(field_errors.iter().map(describe));
		}
	}

	if let Some(group_id) = form.group_id {
		if store.group_by_id(group_id).await?.is_none() {
			errors
				.entry("group".into())
				.or_default()
				.push(UNKNOWN_GROUP_MESSAGE.into());
		}
	}

	Ok(errors)
}

/// An empty post form for a new post.
pub async fn open_create_form(store: &dyn Store) -> Result<FormState, Error> {
	Ok(FormState {
		form: PostForm::default(),
		errors: FieldErrors::new(),
		is_edit: false,
		groups: store.list_groups().await?,
	})
}

/// Publishes a new post written by `author`.
#[tracing::instrument(skip(store, author, form), fields(author = %author.username))]
pub async fn create_post(
	store: &dyn Store,
	author: &User,
	form: PostForm,
) -> Result<Submission, Error> {
	let form = normalize(form);
	let errors = validate(store, &form).await?;

	if !errors.is_empty() {
		tracing::debug!(?errors, "post form rejected");

		return Ok(Submission::Rejected(FormState {
			form,
			errors,
			is_edit: false,
			groups: store.list_groups().await?,
		}));
	}

	let post = store.insert_post(author.id, &form).await?;

	tracing::info!(post = %post.id, monotonic_counter.posts_created = 1_u64, "post created");

	Ok(Submission::Saved(post))
}

/// The edit form of a post, pre-filled with its current values.
pub async fn open_edit_form(
	store: &dyn Store,
	actor: &User,
	post_id: Uuid,
) -> Result<Access<FormState>, Error> {
	let post = store
		.post_by_id(post_id)
		.await?
		.ok_or(Error::UnknownPost(post_id))?;

	if post.author_id != actor.id {
		return Ok(Access::Deflected(deflect_unauthorized_edit(post_id)));
	}

	Ok(Access::Granted(FormState {
		form: PostForm::from(&post),
		errors: FieldErrors::new(),
		is_edit: true,
		groups: store.list_groups().await?,
	}))
}

/// Replaces the text, group and image of a post.
///
/// Only the author may edit a post, anyone else is deflected to the post
/// and the post is left untouched.
#[tracing::instrument(skip(store, actor, form), fields(actor = %actor.username))]
pub async fn edit_post(
	store: &dyn Store,
	actor: &User,
	post_id: Uuid,
	form: PostForm,
) -> Result<Access<Submission>, Error> {
	let post = store
		.post_by_id(post_id)
		.await?
		.ok_or(Error::UnknownPost(post_id))?;

	if post.author_id != actor.id {
		tracing::warn!(author = %post.author_id, "edit by non-author deflected");

		return Ok(Access::Deflected(deflect_unauthorized_edit(post_id)));
	}

	let form = normalize(form);
	let errors = validate(store, &form).await?;

	if !errors.is_empty() {
		return Ok(Access::Granted(Submission::Rejected(FormState {
			form,
			errors,
			is_edit: true,
			groups: store.list_groups().await?,
		})));
	}

	// The post may have been deleted since it was read.
	let post = store
		.update_post(post_id, &form)
		.await?
		.ok_or(Error::UnknownPost(post_id))?;

	tracing::info!("post updated");

	Ok(Access::Granted(Submission::Saved(post)))
}

/// Leaves a comment on a post.
///
/// A blank comment is dropped without an error and `None` is returned.
#[tracing::instrument(skip(store, actor, form), fields(actor = %actor.username))]
pub async fn add_comment(
	store: &dyn Store,
	actor: &User,
	post_id: Uuid,
	form: CommentForm,
) -> Result<Option<Comment>, Error> {
	if store.post_by_id(post_id).await?.is_none() {
		return Err(Error::UnknownPost(post_id));
	}

	if form.validate().is_err() {
		return Ok(None);
	}

	let comment = store
		.insert_comment(post_id, actor.id, form.text.trim())
		.await?;

	tracing::info!(comment = %comment.id, "comment added");

	Ok(Some(comment))
}

/// A single post with its active comments, newest first.
pub async fn post_detail(store: &dyn Store, post_id: Uuid) -> Result<PostDetail, Error> {
	let post = store
		.post_view(post_id)
		.await?
		.ok_or(Error::UnknownPost(post_id))?;
	let comments = store.list_comments(post_id).await?;

	Ok(PostDetail {
		post,
		comments,
		form: CommentForm::default(),
	})
}

#[cfg(test)]
mod test {
	use uuid::Uuid;

	use super::{
		add_comment, create_post, deflect_unauthorized_edit, edit_post, open_edit_form,
		post_detail, Access, Error, Submission,
	};
	use crate::{
		model::{CommentForm, NewGroup, Post, PostForm},
		store::{MemoryStore, Store},
	};

	fn form(text: &str) -> PostForm {
		PostForm {
			text: text.into(),
			group_id: None,
			image: None,
		}
	}

	fn saved(submission: Submission) -> Post {
		match submission {
			Submission::Saved(post) => post,
			Submission::Rejected(state) => panic!("rejected: {:?}", state.errors),
		}
	}

	#[tokio::test]
	async fn test_create_post_assigns_author() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();

		let post = saved(create_post(&store, &leo, form("  hello  ")).await.unwrap());

		assert_eq!(post.author_id, leo.id);
		assert_eq!(post.text, "hello");
		assert!(post.modified_at.is_none());
	}

	#[tokio::test]
	async fn test_create_post_rejects_blank_text() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();

		let Submission::Rejected(state) = create_post(&store, &leo, form(" \n ")).await.unwrap()
		else {
			panic!("blank post was saved");
		};

		assert_eq!(state.errors["text"], ["This field is required."]);
		assert!(!state.is_edit);
		assert_eq!(store.count_posts(crate::store::PostFilter::All).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_create_post_rejects_unknown_group() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();

		let mut input = form("hello");
		input.group_id = Some(Uuid::new_v4());

		let Submission::Rejected(state) = create_post(&store, &leo, input).await.unwrap() else {
			panic!("post with unknown group was saved");
		};

		assert!(state.errors.contains_key("group"));
	}

	#[tokio::test]
	async fn test_create_post_in_group() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let cats = store
			.create_group(NewGroup {
				title: "Cats".into(),
				slug: "cats".into(),
				description: String::new(),
			})
			.await
			.unwrap();

		let mut input = form("meow");
		input.group_id = Some(cats.id);
		input.image = Some("   ".into());

		let post = saved(create_post(&store, &leo, input).await.unwrap());

		assert_eq!(post.group_id, Some(cats.id));
		assert!(post.image.is_none());
	}

	#[tokio::test]
	async fn test_author_edits_post() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let post = saved(create_post(&store, &leo, form("draft")).await.unwrap());

		let Access::Granted(submission) = edit_post(&store, &leo, post.id, form("final"))
			.await
			.unwrap()
		else {
			panic!("author was deflected");
		};
		let edited = saved(submission);

		assert_eq!(edited.text, "final");
		assert_eq!(edited.created_at, post.created_at);
		assert!(edited.modified_at.is_some());
	}

	#[tokio::test]
	async fn test_non_author_edit_is_deflected() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let mallory = store.create_user("mallory").await.unwrap();
		let post = saved(create_post(&store, &leo, form("mine")).await.unwrap());

		let result = edit_post(&store, &mallory, post.id, form("yours"))
			.await
			.unwrap();

		assert!(
			matches!(result, Access::Deflected(ref location) if *location == deflect_unauthorized_edit(post.id))
		);

		let unchanged = store.post_by_id(post.id).await.unwrap().unwrap();

		assert_eq!(unchanged.text, "mine");
		assert!(unchanged.modified_at.is_none());

		assert!(matches!(
			open_edit_form(&store, &mallory, post.id).await.unwrap(),
			Access::Deflected(_)
		));
	}

	#[tokio::test]
	async fn test_edit_form_is_prefilled() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let post = saved(create_post(&store, &leo, form("draft")).await.unwrap());

		let Access::Granted(state) = open_edit_form(&store, &leo, post.id).await.unwrap() else {
			panic!("author was deflected");
		};

		assert!(state.is_edit);
		assert_eq!(state.form.text, "draft");
	}

	#[tokio::test]
	async fn test_edit_unknown_post() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();

		assert!(matches!(
			edit_post(&store, &leo, Uuid::new_v4(), form("text")).await,
			Err(Error::UnknownPost(_))
		));
	}

	#[tokio::test]
	async fn test_comments() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();
		let tolstoy = store.create_user("tolstoy").await.unwrap();
		let post = saved(create_post(&store, &leo, form("hello")).await.unwrap());

		let blank = add_comment(
			&store,
			&tolstoy,
			post.id,
			CommentForm { text: "   ".into() },
		)
		.await
		.unwrap();
		assert!(blank.is_none());

		add_comment(&store, &tolstoy, post.id, CommentForm { text: "first".into() })
			.await
			.unwrap()
			.unwrap();
		add_comment(&store, &leo, post.id, CommentForm { text: "second".into() })
			.await
			.unwrap()
			.unwrap();

		let detail = post_detail(&store, post.id).await.unwrap();
		let texts = detail
			.comments
			.iter()
			.map(|comment| comment.text.as_str())
			.collect::<Vec<_>>();

		assert_eq!(texts, ["second", "first"]);
		assert_eq!(detail.comments[1].author.username, "tolstoy");
		assert!(detail.form.text.is_empty());
	}

	#[tokio::test]
	async fn test_comment_on_unknown_post() {
		let store = MemoryStore::new();
		let leo = store.create_user("leo").await.unwrap();

		assert!(matches!(
			add_comment(&store, &leo, Uuid::new_v4(), CommentForm { text: "hi".into() }).await,
			Err(Error::UnknownPost(_))
		));
	}
}
