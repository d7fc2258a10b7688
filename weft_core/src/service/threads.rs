use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::prelude::DateTimeUtc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    entity::prelude::*,
    ids::{CommunityId, ThreadId, UserId},
    revalidate::Revalidator,
};

/// Reply levels resolved by [`ThreadsService::fetch_thread_by_id`]. Deeper
/// replies are loaded when the reader opens the reply as its own thread.
const REPLY_TREE_DEPTH: u32 = 2;

#[derive(Debug, Error)]
pub enum ThreadsServiceError {
    #[error("fatal database error")]
    Db(#[from] DbErr),

    #[error("thread not found")]
    ThreadNotFound,

    #[error("author not found")]
    AuthorNotFound,

    #[error("thread text must not be empty")]
    EmptyText,
}

/// What reply rows carry about their author: enough to render a byline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: UserId,
    pub name: String,
    pub image: Option<String>,
}

impl From<&UserModel> for AuthorView {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyNode {
    pub id: ThreadId,
    pub parent_id: Option<ThreadId>,
    pub text: String,
    pub author: AuthorView,
    pub created_at: DateTimeUtc,
    /// Empty past the requested depth, not necessarily empty in the store.
    pub replies: Vec<ReplyNode>,
}

/// A feed entry: the post, its full author record, its community (if any),
/// and its direct replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedThread {
    pub id: ThreadId,
    pub text: String,
    pub author: UserModel,
    pub community: Option<CommunityModel>,
    pub created_at: DateTimeUtc,
    pub replies: Vec<ReplyNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub threads: Vec<FeedThread>,
    pub has_next_page: bool,
}

/// A single thread opened as a page, with two levels of replies resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadView {
    pub id: ThreadId,
    pub parent_id: Option<ThreadId>,
    pub text: String,
    pub author: AuthorView,
    pub created_at: DateTimeUtc,
    pub replies: Vec<ReplyNode>,
}

#[derive(Clone)]
pub struct ThreadsService {
    db: DatabaseConnection,
    revalidator: Arc<dyn Revalidator>,
}

impl ThreadsService {
    pub fn new(db: DatabaseConnection, revalidator: Arc<dyn Revalidator>) -> Self {
        Self { db, revalidator }
    }

    /// Create a top-level post, optionally attached to a community.
    ///
    /// An unresolvable `community_slug` is tolerated: the thread is posted
    /// without a community. Inherited behavior, kept on purpose.
    pub async fn create_thread(
        &self,
        text: String,
        author_id: UserId,
        community_slug: Option<&str>,
        path: &str,
    ) -> Result<ThreadModel, ThreadsServiceError> {
        if text.trim().is_empty() {
            return Err(ThreadsServiceError::EmptyText);
        }

        let author_exists = User::find_by_id(author_id).one(&self.db).await?.is_some();
        if !author_exists {
            return Err(ThreadsServiceError::AuthorNotFound);
        }

        let community_id = match community_slug {
            Some(slug) => {
                let community = Community::find()
                    .filter(CommunityColumn::Slug.eq(slug))
                    .one(&self.db)
                    .await?;
                if community.is_none() {
                    warn!(slug, "unknown community, posting thread without one");
                }
                community.map(|c| c.id)
            }
            None => None,
        };

        let thread = ThreadActiveModel {
            id: Set(ThreadId::new()),
            author_id: Set(author_id),
            community_id: Set(community_id),
            parent_id: Set(None),
            text: Set(text),
            created_at: Set(Utc::now()),
        };

        let created = Thread::insert(thread).exec_with_returning(&self.db).await?;

        info!(thread_id = %created.id, "thread created");
        self.revalidator.revalidate(path).await;

        Ok(created)
    }

    /// One page of the top-level feed, newest first, with direct replies.
    pub async fn fetch_feed(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<FeedPage, ThreadsServiceError> {
        let offset = page_number.saturating_sub(1) * page_size;

        let total = Thread::find()
            .filter(ThreadColumn::ParentId.is_null())
            .count(&self.db)
            .await?;

        let page = Thread::find()
            .filter(ThreadColumn::ParentId.is_null())
            .order_by_desc(ThreadColumn::CreatedAt)
            .offset(offset)
            .limit(page_size)
            .all(&self.db)
            .await?;

        let authors = self.authors_for(&page).await?;
        let communities = self.communities_for(&page).await?;

        let ids: Vec<ThreadId> = page.iter().map(|t| t.id).collect();
        let mut replies = self.load_replies(&ids, 1).await?;

        let mut threads = Vec::with_capacity(page.len());
        for thread in page {
            let author = authors
                .get(&thread.author_id)
                .cloned()
                .ok_or(ThreadsServiceError::AuthorNotFound)?;
            let community = thread
                .community_id
                .and_then(|id| communities.get(&id).cloned());

            threads.push(FeedThread {
                id: thread.id,
                text: thread.text,
                author,
                community,
                created_at: thread.created_at,
                replies: replies.remove(&thread.id).unwrap_or_default(),
            });
        }

        let has_next_page = total > offset + threads.len() as u64;

        Ok(FeedPage {
            threads,
            has_next_page,
        })
    }

    /// Fetch one thread with two levels of replies. `Ok(None)` when the id
    /// does not resolve; the caller decides how to react.
    pub async fn fetch_thread_by_id(
        &self,
        id: ThreadId,
    ) -> Result<Option<ThreadView>, ThreadsServiceError> {
        let Some(thread) = Thread::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let author = User::find_by_id(thread.author_id)
            .one(&self.db)
            .await?
            .map(|u| AuthorView::from(&u))
            .ok_or(ThreadsServiceError::AuthorNotFound)?;

        let mut replies = self.load_replies(&[thread.id], REPLY_TREE_DEPTH).await?;

        Ok(Some(ThreadView {
            id: thread.id,
            parent_id: thread.parent_id,
            text: thread.text,
            author,
            created_at: thread.created_at,
            replies: replies.remove(&thread.id).unwrap_or_default(),
        }))
    }

    /// Append a reply to an existing thread.
    ///
    /// The parent linkage travels with the insert itself, so no reader can
    /// observe a reply reference before the reply row exists.
    pub async fn add_comment(
        &self,
        thread_id: ThreadId,
        text: String,
        author_id: UserId,
        path: &str,
    ) -> Result<ThreadModel, ThreadsServiceError> {
        if text.trim().is_empty() {
            return Err(ThreadsServiceError::EmptyText);
        }

        let parent = Thread::find_by_id(thread_id)
            .one(&self.db)
            .await?
            .ok_or(ThreadsServiceError::ThreadNotFound)?;

        let author_exists = User::find_by_id(author_id).one(&self.db).await?.is_some();
        if !author_exists {
            return Err(ThreadsServiceError::AuthorNotFound);
        }

        let comment = ThreadActiveModel {
            id: Set(ThreadId::new()),
            author_id: Set(author_id),
            community_id: Set(None),
            parent_id: Set(Some(parent.id)),
            text: Set(text),
            created_at: Set(Utc::now()),
        };

        let created = Thread::insert(comment).exec_with_returning(&self.db).await?;

        info!(parent_id = %parent.id, comment_id = %created.id, "comment added");
        self.revalidator.revalidate(path).await;

        Ok(created)
    }

    async fn authors_for(
        &self,
        threads: &[ThreadModel],
    ) -> Result<HashMap<UserId, UserModel>, ThreadsServiceError> {
        let ids: Vec<UserId> = threads.iter().map(|t| t.author_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = User::find()
            .filter(UserColumn::Id.is_in(ids))
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn communities_for(
        &self,
        threads: &[ThreadModel],
    ) -> Result<HashMap<CommunityId, CommunityModel>, ThreadsServiceError> {
        let ids: Vec<CommunityId> = threads.iter().filter_map(|t| t.community_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let communities = Community::find()
            .filter(CommunityColumn::Id.is_in(ids))
            .all(&self.db)
            .await?;

        Ok(communities.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Load the reply tree under `roots`, breadth-first, one query per level.
    ///
    /// `depth` is the number of levels resolved. It is a parameter rather
    /// than recursion so callers state exactly how deep their view goes.
    /// Replies within a level keep creation order.
    async fn load_replies(
        &self,
        roots: &[ThreadId],
        depth: u32,
    ) -> Result<HashMap<ThreadId, Vec<ReplyNode>>, ThreadsServiceError> {
        let mut levels: Vec<Vec<ThreadModel>> = Vec::new();
        let mut frontier: Vec<ThreadId> = roots.to_vec();

        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let level = Thread::find()
                .filter(ThreadColumn::ParentId.is_in(frontier))
                .order_by_asc(ThreadColumn::CreatedAt)
                .all(&self.db)
                .await?;
            frontier = level.iter().map(|t| t.id).collect();
            levels.push(level);
        }

        let author_ids: Vec<UserId> = levels
            .iter()
            .flatten()
            .map(|t| t.author_id)
            .collect();
        let authors: HashMap<UserId, AuthorView> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(UserColumn::Id.is_in(author_ids))
                .all(&self.db)
                .await?
                .iter()
                .map(|u| (u.id, AuthorView::from(u)))
                .collect()
        };

        // Stitch bottom-up: a node already owns its children by the time its
        // parent's level collects it.
        let mut children: HashMap<ThreadId, Vec<ReplyNode>> = HashMap::new();
        for level in levels.into_iter().rev() {
            for thread in level {
                let parent_id = thread.parent_id;
                let author = authors
                    .get(&thread.author_id)
                    .cloned()
                    .ok_or(ThreadsServiceError::AuthorNotFound)?;

                let node = ReplyNode {
                    id: thread.id,
                    parent_id,
                    author,
                    created_at: thread.created_at,
                    replies: children.remove(&thread.id).unwrap_or_default(),
                    text: thread.text,
                };

                if let Some(parent_id) = parent_id {
                    children.entry(parent_id).or_default().push(node);
                }
            }
        }

        Ok(children)
    }
}
