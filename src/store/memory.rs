use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Constraint, PostFilter, Store, StoreError};
use crate::{
	model::{
		AuthorRef, Comment, CommentView, Follow, FollowCounts, Group, GroupRef, NewGroup, Post,
		PostForm, PostView, Session, User,
	},
	pagination::Window,
};

#[derive(Default)]
struct Tables {
	/// Insertion counter, breaks ties between equal timestamps.
	sequence: u64,
	users: Vec<User>,
	sessions: Vec<Session>,
	groups: Vec<Group>,
	posts: Vec<(u64, Post)>,
	comments: Vec<(u64, Comment)>,
	follows: Vec<Follow>,
}

impl Tables {
	fn next_sequence(&mut self) -> u64 {
		self.sequence += 1;
		self.sequence
	}

	fn user(&self, id: Uuid) -> Option<&User> {
		self.users.iter().find(|user| user.id == id)
	}

	fn matches(&self, post: &Post, filter: PostFilter) -> bool {
		match filter {
			PostFilter::All => true,
			PostFilter::Group(group_id) => post.group_id == Some(group_id),
			PostFilter::Author(author_id) => post.author_id == author_id,
			PostFilter::FollowedBy(user_id) => self
				.follows
				.iter()
				.any(|follow| follow.user_id == user_id && follow.author_id == post.author_id),
		}
	}

	/// Posts matching the filter, newest first.
	fn filtered(&self, filter: PostFilter) -> Vec<&(u64, Post)> {
		let mut posts = self
			.posts
			.iter()
			.filter(|(_, post)| self.matches(post, filter))
			.collect::<Vec<_>>();

		posts.sort_by(|(a_seq, a), (b_seq, b)| {
			b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
		});

		posts
	}

	fn view(&self, post: &Post) -> Option<PostView> {
		let author = self.user(post.author_id)?;
		let group = post
			.group_id
			.and_then(|id| self.groups.iter().find(|group| group.id == id));

		Some(PostView {
			id: post.id,
			text: post.text.clone(),
			image: post.image.clone(),
			created_at: post.created_at,
			modified_at: post.modified_at,
			author: AuthorRef::from(author),
			group: group.map(GroupRef::from),
		})
	}

	fn check_post_references(&self, author_id: Uuid, form: &PostForm) -> Result<(), StoreError> {
		let author_exists = self.user(author_id).is_some();
		let group_exists = form
			.group_id
			.map_or(true, |id| self.groups.iter().any(|group| group.id == id));

		if author_exists && group_exists {
			Ok(())
		} else {
			Err(StoreError::Constraint(Constraint::MissingReference))
		}
	}
}

/// An in-process store with the same constraints and cascades as the
/// PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[axum::async_trait]
impl Store for MemoryStore {
	async fn create_user(&self, username: &str) -> Result<User, StoreError> {
		let mut tables = self.tables.write();

		if tables.users.iter().any(|user| user.username == username) {
			return Err(StoreError::Constraint(Constraint::DuplicateUsername));
		}

		let user = User {
			id: Uuid::new_v4(),
			username: username.to_owned(),
			created_at: Utc::now(),
		};

		tables.users.push(user.clone());

		Ok(user)
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		let tables = self.tables.read();

		Ok(tables
			.users
			.iter()
			.find(|user| user.username == username)
			.cloned())
	}

	async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
		let mut tables = self.tables.write();
		let before = tables.users.len();

		tables.users.retain(|user| user.id != id);

		if tables.users.len() == before {
			return Ok(false);
		}

		let removed_posts = tables
			.posts
			.iter()
			.filter(|(_, post)| post.author_id == id)
			.map(|(_, post)| post.id)
			.collect::<Vec<_>>();

		tables.sessions.retain(|session| session.user_id != id);
		tables.posts.retain(|(_, post)| post.author_id != id);
		tables.comments.retain(|(_, comment)| {
			comment.author_id != id && !removed_posts.contains(&comment.post_id)
		});
		tables
			.follows
			.retain(|follow| follow.user_id != id && follow.author_id != id);

		Ok(true)
	}

	async fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
		let mut tables = self.tables.write();

		if tables.user(user_id).is_none() {
			return Err(StoreError::Constraint(Constraint::MissingReference));
		}

		let session = Session {
			id: Uuid::new_v4(),
			user_id,
			created_at: Utc::now(),
		};

		tables.sessions.push(session.clone());

		Ok(session)
	}

	async fn session_user(&self, session_id: Uuid) -> Result<Option<User>, StoreError> {
		let tables = self.tables.read();

		Ok(tables
			.sessions
			.iter()
			.find(|session| session.id == session_id)
			.and_then(|session| tables.user(session.user_id))
			.cloned())
	}

	async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError> {
		let mut tables = self.tables.write();

		if tables.groups.iter().any(|other| other.slug == group.slug) {
			return Err(StoreError::Constraint(Constraint::DuplicateSlug));
		}

		let group = Group {
			id: Uuid::new_v4(),
			title: group.title,
			slug: group.slug,
			description: group.description,
		};

		tables.groups.push(group.clone());

		Ok(group)
	}

	async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, StoreError> {
		let tables = self.tables.read();

		Ok(tables.groups.iter().find(|group| group.slug == slug).cloned())
	}

	async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
		let tables = self.tables.read();

		Ok(tables.groups.iter().find(|group| group.id == id).cloned())
	}

	async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
		let tables = self.tables.read();
		let mut groups = tables.groups.clone();

		groups.sort_by(|a, b| a.title.cmp(&b.title));

		Ok(groups)
	}

	async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError> {
		let mut tables = self.tables.write();
		let before = tables.groups.len();

		tables.groups.retain(|group| group.id != id);

		if tables.groups.len() == before {
			return Ok(false);
		}

		for (_, post) in &mut tables.posts {
			if post.group_id == Some(id) {
				post.group_id = None;
			}
		}

		Ok(true)
	}

	async fn count_posts(&self, filter: PostFilter) -> Result<i64, StoreError> {
		let tables = self.tables.read();
		let count = tables
			.posts
			.iter()
			.filter(|(_, post)| tables.matches(post, filter))
			.count();

		Ok(i64::try_from(count).unwrap_or(i64::MAX))
	}

	async fn list_posts(
		&self,
		filter: PostFilter,
		window: Window,
	) -> Result<Vec<PostView>, StoreError> {
		let tables = self.tables.read();
		let offset = usize::try_from(window.offset()).unwrap_or(0);
		let limit = usize::try_from(window.limit()).unwrap_or(0);

		Ok(tables
			.filtered(filter)
			.into_iter()
			.skip(offset)
			.take(limit)
			.filter_map(|(_, post)| tables.view(post))
			.collect())
	}

	async fn post_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
		let tables = self.tables.read();

		Ok(tables
			.posts
			.iter()
			.find(|(_, post)| post.id == id)
			.map(|(_, post)| post.clone()))
	}

	async fn post_view(&self, id: Uuid) -> Result<Option<PostView>, StoreError> {
		let tables = self.tables.read();

		Ok(tables
			.posts
			.iter()
			.find(|(_, post)| post.id == id)
			.and_then(|(_, post)| tables.view(post)))
	}

	async fn insert_post(&self, author_id: Uuid, form: &PostForm) -> Result<Post, StoreError> {
		let mut tables = self.tables.write();

		tables.check_post_references(author_id, form)?;

		let post = Post {
			id: Uuid::new_v4(),
			text: form.text.clone(),
			group_id: form.group_id,
			image: form.image.clone(),
			author_id,
			created_at: Utc::now(),
			modified_at: None,
		};

		let sequence = tables.next_sequence();
		tables.posts.push((sequence, post.clone()));

		Ok(post)
	}

	async fn update_post(&self, id: Uuid, form: &PostForm) -> Result<Option<Post>, StoreError> {
		let mut tables = self.tables.write();

		let Some(author_id) = tables
			.posts
			.iter()
			.find(|(_, post)| post.id == id)
			.map(|(_, post)| post.author_id)
		else {
			return Ok(None);
		};

		tables.check_post_references(author_id, form)?;

		let post = tables
			.posts
			.iter_mut()
			.map(|(_, post)| post)
			.find(|post| post.id == id);

		Ok(post.map(|post| {
			post.text.clone_from(&form.text);
			post.group_id = form.group_id;
			post.image.clone_from(&form.image);
			post.modified_at = Some(Utc::now());

			post.clone()
		}))
	}

	async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
		let mut tables = self.tables.write();
		let before = tables.posts.len();

		tables.posts.retain(|(_, post)| post.id != id);

		if tables.posts.len() == before {
			return Ok(false);
		}

		tables.comments.retain(|(_, comment)| comment.post_id != id);

		Ok(true)
	}

	async fn insert_comment(
		&self,
		post_id: Uuid,
		author_id: Uuid,
		text: &str,
	) -> Result<Comment, StoreError> {
		let mut tables = self.tables.write();

		let post_exists = tables.posts.iter().any(|(_, post)| post.id == post_id);
		if !post_exists || tables.user(author_id).is_none() {
			return Err(StoreError::Constraint(Constraint::MissingReference));
		}

		let now = Utc::now();
		let comment = Comment {
			id: Uuid::new_v4(),
			post_id,
			author_id,
			text: text.to_owned(),
			created_at: now,
			updated_at: now,
			active: true,
		};

		let sequence = tables.next_sequence();
		tables.comments.push((sequence, comment.clone()));

		Ok(comment)
	}

	async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, StoreError> {
		let tables = self.tables.read();

		let mut comments = tables
			.comments
			.iter()
			.filter(|(_, comment)| comment.post_id == post_id && comment.active)
			.collect::<Vec<_>>();

		comments.sort_by(|(a_seq, a), (b_seq, b)| {
			b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
		});

		Ok(comments
			.into_iter()
			.filter_map(|(_, comment)| {
				let author = tables.user(comment.author_id)?;

				Some(CommentView {
					id: comment.id,
					text: comment.text.clone(),
					created_at: comment.created_at,
					updated_at: comment.updated_at,
					author: AuthorRef::from(author),
				})
			})
			.collect())
	}

	async fn find_follow(
		&self,
		user_id: Uuid,
		author_id: Uuid,
	) -> Result<Option<Follow>, StoreError> {
		let tables = self.tables.read();

		Ok(tables
			.follows
			.iter()
			.find(|follow| follow.user_id == user_id && follow.author_id == author_id)
			.cloned())
	}

	async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<Follow, StoreError> {
		let mut tables = self.tables.write();

		if user_id == author_id {
			return Err(StoreError::Constraint(Constraint::SelfFollow));
		}

		if tables.user(user_id).is_none() || tables.user(author_id).is_none() {
			return Err(StoreError::Constraint(Constraint::MissingReference));
		}

		if tables
			.follows
			.iter()
			.any(|follow| follow.user_id == user_id && follow.author_id == author_id)
		{
			return Err(StoreError::Constraint(Constraint::DuplicateFollow));
		}

		let follow = Follow {
			id: Uuid::new_v4(),
			user_id,
			author_id,
			created_at: Utc::now(),
		};

		tables.follows.push(follow.clone());

		Ok(follow)
	}

	async fn delete_follow(&self, id: Uuid) -> Result<bool, StoreError> {
		let mut tables = self.tables.write();
		let before = tables.follows.len();

		tables.follows.retain(|follow| follow.id != id);

		Ok(tables.follows.len() != before)
	}

	async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts, StoreError> {
		let tables = self.tables.read();
		let (followers, following) =
			tables
				.follows
				.iter()
				.fold((0, 0), |(followers, following), follow| {
					(
						followers + i64::from(follow.author_id == user_id),
						following + i64::from(follow.user_id == user_id),
					)
				});

		Ok(FollowCounts {
			followers,
			following,
		})
	}
}
