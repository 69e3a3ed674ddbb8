use sqlx::{
	postgres::{PgPoolOptions, PgRow},
	FromRow, Postgres, QueryBuilder, Row,
};
use uuid::Uuid;

use super::{PostFilter, Store, StoreError};
use crate::{
	model::{
		AuthorRef, Comment, CommentView, Follow, FollowCounts, Group, GroupRef, NewGroup, Post,
		PostForm, PostView, Session, User,
	},
	pagination::Window,
};

/// Columns of a post joined with its author and group.
const POST_VIEW_COLUMNS: &str = r#"
	SELECT
		p.id, p.text, p.image, p.created_at, p.modified_at,
		u.id AS author_id, u.username AS author_username,
		g.id AS group_id, g.slug AS group_slug, g.title AS group_title
	FROM post p
	JOIN "user" u ON u.id = p.author_id
	LEFT JOIN "group" g ON g.id = p.group_id
"#;

/// Appends the `WHERE` clause selecting the posts of a listing.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
	match filter {
		PostFilter::All => {}
		PostFilter::Group(group_id) => {
			builder.push(" WHERE p.group_id = ").push_bind(group_id);
		}
		PostFilter::Author(author_id) => {
			builder.push(" WHERE p.author_id = ").push_bind(author_id);
		}
		PostFilter::FollowedBy(user_id) => {
			builder
				.push(" WHERE p.author_id IN (SELECT author_id FROM follow WHERE user_id = ")
				.push_bind(user_id)
				.push(")");
		}
	}
}

/// Row of [`POST_VIEW_COLUMNS`].
struct PostViewRow(PostView);

impl<'r> FromRow<'r, PgRow> for PostViewRow {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		let group_id: Option<Uuid> = row.try_get("group_id")?;
		let group = match group_id {
			Some(id) => Some(GroupRef {
				id,
				slug: row.try_get("group_slug")?,
				title: row.try_get("group_title")?,
			}),
			None => None,
		};

		Ok(Self(PostView {
			id: row.try_get("id")?,
			text: row.try_get("text")?,
			image: row.try_get("image")?,
			created_at: row.try_get("created_at")?,
			modified_at: row.try_get("modified_at")?,
			author: AuthorRef {
				id: row.try_get("author_id")?,
				username: row.try_get("author_username")?,
			},
			group,
		}))
	}
}

struct CommentViewRow(CommentView);

impl<'r> FromRow<'r, PgRow> for CommentViewRow {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self(CommentView {
			id: row.try_get("id")?,
			text: row.try_get("text")?,
			created_at: row.try_get("created_at")?,
			updated_at: row.try_get("updated_at")?,
			author: AuthorRef {
				id: row.try_get("author_id")?,
				username: row.try_get("author_username")?,
			},
		}))
	}
}

impl<'r> FromRow<'r, PgRow> for User {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			username: row.try_get("username")?,
			created_at: row.try_get("created_at")?,
		})
	}
}

impl<'r> FromRow<'r, PgRow> for Session {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			user_id: row.try_get("user_id")?,
			created_at: row.try_get("created_at")?,
		})
	}
}

impl<'r> FromRow<'r, PgRow> for Group {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			title: row.try_get("title")?,
			slug: row.try_get("slug")?,
			description: row.try_get("description")?,
		})
	}
}

impl<'r> FromRow<'r, PgRow> for Post {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			text: row.try_get("text")?,
			group_id: row.try_get("group_id")?,
			image: row.try_get("image")?,
			author_id: row.try_get("author_id")?,
			created_at: row.try_get("created_at")?,
			modified_at: row.try_get("modified_at")?,
		})
	}
}

impl<'r> FromRow<'r, PgRow> for Comment {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			post_id: row.try_get("post_id")?,
			author_id: row.try_get("author_id")?,
			text: row.try_get("text")?,
			created_at: row.try_get("created_at")?,
			updated_at: row.try_get("updated_at")?,
			active: row.try_get("active")?,
		})
	}
}

impl<'r> FromRow<'r, PgRow> for Follow {
	fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			id: row.try_get("id")?,
			user_id: row.try_get("user_id")?,
			author_id: row.try_get("author_id")?,
			created_at: row.try_get("created_at")?,
		})
	}
}

/// A store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
	pool: sqlx::PgPool,
}

impl PgStore {
	pub fn new(pool: sqlx::PgPool) -> Self {
		Self { pool }
	}

	/// Connects to the database and applies any pending migrations.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let pool = PgPoolOptions::new().connect(url).await?;

		sqlx::migrate!("./migrations").run(&pool).await?;

		Ok(Self::new(pool))
	}
}

#[axum::async_trait]
impl Store for PgStore {
	async fn create_user(&self, username: &str) -> Result<User, StoreError> {
		let user = sqlx::query_as::<_, User>(
			r#"
				INSERT INTO "user" (username) VALUES ($1)
				RETURNING *
			"#,
		)
		.bind(username)
		.fetch_one(&self.pool)
		.await?;

		Ok(user)
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE username = $1"#)
			.bind(username)
			.fetch_optional(&self.pool)
			.await?;

		Ok(user)
	}

	async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
		let status = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
		let session = sqlx::query_as::<_, Session>(
			"INSERT INTO session (user_id) VALUES ($1) RETURNING *",
		)
		.bind(user_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(session)
	}

	async fn session_user(&self, session_id: Uuid) -> Result<Option<User>, StoreError> {
		let user = sqlx::query_as::<_, User>(
			r#"
				SELECT * FROM "user" WHERE id = (
					SELECT user_id FROM session WHERE id = $1
				)
			"#,
		)
		.bind(session_id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(user)
	}

	async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError> {
		let group = sqlx::query_as::<_, Group>(
			r#"
				INSERT INTO "group" (title, slug, description) VALUES ($1, $2, $3)
				RETURNING *
			"#,
		)
		.bind(group.title)
		.bind(group.slug)
		.bind(group.description)
		.fetch_one(&self.pool)
		.await?;

		Ok(group)
	}

	async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, StoreError> {
		let group = sqlx::query_as::<_, Group>(r#"SELECT * FROM "group" WHERE slug = $1"#)
			.bind(slug)
			.fetch_optional(&self.pool)
			.await?;

		Ok(group)
	}

	async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, StoreError> {
		let group = sqlx::query_as::<_, Group>(r#"SELECT * FROM "group" WHERE id = $1"#)
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(group)
	}

	async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
		let groups = sqlx::query_as::<_, Group>(r#"SELECT * FROM "group" ORDER BY title"#)
			.fetch_all(&self.pool)
			.await?;

		Ok(groups)
	}

	async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError> {
		let status = sqlx::query(r#"DELETE FROM "group" WHERE id = $1"#)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn count_posts(&self, filter: PostFilter) -> Result<i64, StoreError> {
		let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM post p");
		push_filter(&mut builder, filter);

		let count = builder
			.build_query_scalar::<i64>()
			.fetch_one(&self.pool)
			.await?;

		Ok(count)
	}

	async fn list_posts(
		&self,
		filter: PostFilter,
		window: Window,
	) -> Result<Vec<PostView>, StoreError> {
		let mut builder = QueryBuilder::<Postgres>::new(POST_VIEW_COLUMNS);
		push_filter(&mut builder, filter);

		builder
			.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
			.push_bind(window.limit())
			.push(" OFFSET ")
			.push_bind(window.offset());

		let rows = builder
			.build_query_as::<PostViewRow>()
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.into_iter().map(|PostViewRow(post)| post).collect())
	}

	async fn post_by_id(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
		let post = sqlx::query_as::<_, Post>("SELECT * FROM post WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(post)
	}

	async fn post_view(&self, id: Uuid) -> Result<Option<PostView>, StoreError> {
		let mut builder = QueryBuilder::<Postgres>::new(POST_VIEW_COLUMNS);
		builder.push(" WHERE p.id = ").push_bind(id);

		let row = builder
			.build_query_as::<PostViewRow>()
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.map(|PostViewRow(post)| post))
	}

	async fn insert_post(&self, author_id: Uuid, form: &PostForm) -> Result<Post, StoreError> {
		let post = sqlx::query_as::<_, Post>(
			r#"
				INSERT INTO post (text, group_id, image, author_id)
				VALUES ($1, $2, $3, $4)
				RETURNING *
			"#,
		)
		.bind(&form.text)
		.bind(form.group_id)
		.bind(&form.image)
		.bind(author_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(post)
	}

	async fn update_post(&self, id: Uuid, form: &PostForm) -> Result<Option<Post>, StoreError> {
		let post = sqlx::query_as::<_, Post>(
			r#"
				UPDATE post
				SET text = $1, group_id = $2, image = $3, modified_at = clock_timestamp()
				WHERE id = $4
				RETURNING *
			"#,
		)
		.bind(&form.text)
		.bind(form.group_id)
		.bind(&form.image)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(post)
	}

	async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
		let status = sqlx::query("DELETE FROM post WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn insert_comment(
		&self,
		post_id: Uuid,
		author_id: Uuid,
		text: &str,
	) -> Result<Comment, StoreError> {
		let comment = sqlx::query_as::<_, Comment>(
			r#"
				INSERT INTO comment (post_id, author_id, text) VALUES ($1, $2, $3)
				RETURNING *
			"#,
		)
		.bind(post_id)
		.bind(author_id)
		.bind(text)
		.fetch_one(&self.pool)
		.await?;

		Ok(comment)
	}

	async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, StoreError> {
		let rows = sqlx::query_as::<_, CommentViewRow>(
			r#"
				SELECT
					c.id, c.text, c.created_at, c.updated_at,
					u.id AS author_id, u.username AS author_username
				FROM comment c
				JOIN "user" u ON u.id = c.author_id
				WHERE c.post_id = $1 AND c.active
				ORDER BY c.created_at DESC, c.id DESC
			"#,
		)
		.bind(post_id)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows.into_iter().map(|CommentViewRow(comment)| comment).collect())
	}

	async fn find_follow(
		&self,
		user_id: Uuid,
		author_id: Uuid,
	) -> Result<Option<Follow>, StoreError> {
		let follow = sqlx::query_as::<_, Follow>(
			"SELECT * FROM follow WHERE user_id = $1 AND author_id = $2",
		)
		.bind(user_id)
		.bind(author_id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(follow)
	}

	async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<Follow, StoreError> {
		let follow = sqlx::query_as::<_, Follow>(
			"INSERT INTO follow (user_id, author_id) VALUES ($1, $2) RETURNING *",
		)
		.bind(user_id)
		.bind(author_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(follow)
	}

	async fn delete_follow(&self, id: Uuid) -> Result<bool, StoreError> {
		let status = sqlx::query("DELETE FROM follow WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts, StoreError> {
		let row = sqlx::query(
			r#"
				SELECT
					(SELECT COUNT(*) FROM follow WHERE author_id = $1) AS followers,
					(SELECT COUNT(*) FROM follow WHERE user_id = $1) AS following
			"#,
		)
		.bind(user_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(FollowCounts {
			followers: row.try_get("followers")?,
			following: row.try_get("following")?,
		})
	}
}

#[cfg(test)]
mod test {
	use super::PgStore;
	use crate::{
		model::PostForm,
		store::{Constraint, PostFilter, Store, StoreError},
	};

	fn form(text: &str) -> PostForm {
		PostForm {
			text: text.into(),
			group_id: None,
			image: None,
		}
	}

	#[sqlx::test(migrations = "./migrations")]
	#[ignore = "requires a PostgreSQL DATABASE_URL"]
	async fn test_follow_constraints(pool: sqlx::PgPool) {
		let store = PgStore::new(pool);
		let leo = store.create_user("leo").await.unwrap();
		let tolstoy = store.create_user("tolstoy").await.unwrap();

		assert!(matches!(
			store.insert_follow(leo.id, leo.id).await,
			Err(StoreError::Constraint(Constraint::SelfFollow))
		));

		store.insert_follow(leo.id, tolstoy.id).await.unwrap();

		assert!(matches!(
			store.insert_follow(leo.id, tolstoy.id).await,
			Err(StoreError::Constraint(Constraint::DuplicateFollow))
		));
		assert_eq!(store.follow_counts(tolstoy.id).await.unwrap().followers, 1);
	}

	#[sqlx::test(migrations = "./migrations")]
	#[ignore = "requires a PostgreSQL DATABASE_URL"]
	async fn test_following_filter(pool: sqlx::PgPool) {
		let store = PgStore::new(pool);
		let leo = store.create_user("leo").await.unwrap();
		let tolstoy = store.create_user("tolstoy").await.unwrap();
		let pushkin = store.create_user("pushkin").await.unwrap();

		store.insert_post(tolstoy.id, &form("war")).await.unwrap();
		store.insert_post(pushkin.id, &form("poem")).await.unwrap();
		store.insert_follow(leo.id, tolstoy.id).await.unwrap();

		assert_eq!(
			store
				.count_posts(PostFilter::FollowedBy(leo.id))
				.await
				.unwrap(),
			1
		);
		assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 2);
	}

	#[sqlx::test(migrations = "./migrations")]
	#[ignore = "requires a PostgreSQL DATABASE_URL"]
	async fn test_delete_post_cascades_comments(pool: sqlx::PgPool) {
		let store = PgStore::new(pool);
		let leo = store.create_user("leo").await.unwrap();
		let post = store.insert_post(leo.id, &form("text")).await.unwrap();

		store.insert_comment(post.id, leo.id, "hi").await.unwrap();
		assert!(store.delete_post(post.id).await.unwrap());
		assert!(store.list_comments(post.id).await.unwrap().is_empty());
	}
}
