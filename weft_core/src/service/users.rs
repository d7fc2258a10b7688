use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::prelude::DateTimeUtc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    entity::prelude::*,
    ids::{CommunityId, ThreadId, UserId},
    revalidate::{Revalidator, PROFILE_EDIT_PATH},
    service::threads::{AuthorView, ReplyNode},
};

#[derive(Debug, Error)]
pub enum UsersServiceError {
    #[error("fatal database error")]
    Db(#[from] DbErr),

    #[error("author not found")]
    AuthorNotFound,
}

/// A profile plus the communities it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub user: UserModel,
    pub communities: Vec<CommunityModel>,
}

/// One authored top-level thread with its direct replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthoredThread {
    pub id: ThreadId,
    pub text: String,
    pub created_at: DateTimeUtc,
    pub replies: Vec<ReplyNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserThreadsView {
    pub user: UserModel,
    pub threads: Vec<AuthoredThread>,
}

#[derive(Clone)]
pub struct UsersService {
    db: DatabaseConnection,
    revalidator: Arc<dyn Revalidator>,
}

impl UsersService {
    pub fn new(db: DatabaseConnection, revalidator: Arc<dyn Revalidator>) -> Self {
        Self { db, revalidator }
    }

    /// Upsert a profile, keyed on the identity-provider id. Completing the
    /// form is what flips `onboarded`, so both branches set it.
    pub async fn update_user(
        &self,
        auth_id: &str,
        username: String,
        name: String,
        bio: Option<String>,
        image: Option<String>,
        path: &str,
    ) -> Result<UserModel, UsersServiceError> {
        let username = username.to_lowercase();

        let existing = User::find()
            .filter(UserColumn::AuthId.eq(auth_id))
            .one(&self.db)
            .await?;

        let saved = match existing {
            Some(user) => {
                let mut user: UserActiveModel = user.into();
                user.username = Set(username);
                user.name = Set(name);
                user.bio = Set(bio);
                user.image = Set(image);
                user.onboarded = Set(true);
                user.update(&self.db).await?
            }
            None => {
                let user = UserActiveModel {
                    id: Set(UserId::new()),
                    auth_id: Set(auth_id.to_string()),
                    username: Set(username),
                    name: Set(name),
                    bio: Set(bio),
                    image: Set(image),
                    onboarded: Set(true),
                };
                User::insert(user).exec_with_returning(&self.db).await?
            }
        };

        info!(auth_id, "user profile saved");

        // Every onboarding flow calls this op; only the profile editor's own
        // page needs its cache pushed out.
        if path == PROFILE_EDIT_PATH {
            self.revalidator.revalidate(path).await;
        }

        Ok(saved)
    }

    /// Fetch a profile with its communities resolved.
    pub async fn fetch_user(&self, auth_id: &str) -> Result<Option<UserView>, UsersServiceError> {
        let Some(user) = User::find()
            .filter(UserColumn::AuthId.eq(auth_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let memberships = CommunityMember::find()
            .filter(CommunityMemberColumn::UserId.eq(user.id))
            .all(&self.db)
            .await?;

        let community_ids: Vec<CommunityId> =
            memberships.iter().map(|m| m.community_id).collect();
        let communities = if community_ids.is_empty() {
            Vec::new()
        } else {
            Community::find()
                .filter(CommunityColumn::Id.is_in(community_ids))
                .all(&self.db)
                .await?
        };

        Ok(Some(UserView { user, communities }))
    }

    /// Fetch a profile with its authored top-level threads, newest first,
    /// each with its direct replies and their byline authors.
    pub async fn fetch_user_posts(
        &self,
        auth_id: &str,
    ) -> Result<Option<UserThreadsView>, UsersServiceError> {
        let Some(user) = User::find()
            .filter(UserColumn::AuthId.eq(auth_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let authored = Thread::find()
            .filter(ThreadColumn::AuthorId.eq(user.id))
            .filter(ThreadColumn::ParentId.is_null())
            .order_by_desc(ThreadColumn::CreatedAt)
            .all(&self.db)
            .await?;

        let ids: Vec<ThreadId> = authored.iter().map(|t| t.id).collect();
        let reply_rows = if ids.is_empty() {
            Vec::new()
        } else {
            Thread::find()
                .filter(ThreadColumn::ParentId.is_in(ids))
                .order_by_asc(ThreadColumn::CreatedAt)
                .all(&self.db)
                .await?
        };

        let author_ids: Vec<UserId> = reply_rows.iter().map(|t| t.author_id).collect();
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

        let mut replies_by_parent: HashMap<ThreadId, Vec<ReplyNode>> = HashMap::new();
        for reply in reply_rows {
            let author = authors
                .get(&reply.author_id)
                .cloned()
                .ok_or(UsersServiceError::AuthorNotFound)?;
            if let Some(parent_id) = reply.parent_id {
                replies_by_parent.entry(parent_id).or_default().push(ReplyNode {
                    id: reply.id,
                    parent_id: reply.parent_id,
                    author,
                    created_at: reply.created_at,
                    replies: Vec::new(),
                    text: reply.text,
                });
            }
        }

        let threads = authored
            .into_iter()
            .map(|thread| AuthoredThread {
                id: thread.id,
                replies: replies_by_parent.remove(&thread.id).unwrap_or_default(),
                created_at: thread.created_at,
                text: thread.text,
            })
            .collect();

        Ok(Some(UserThreadsView { user, threads }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::threads::ThreadsService;
    use crate::test_utils::{self, RecordingRevalidator};

    async fn setup_test_service() -> (UsersService, Arc<RecordingRevalidator>) {
        let db = test_utils::setup_test_db().await;
        let revalidator = RecordingRevalidator::new();
        (UsersService::new(db, revalidator.clone()), revalidator)
    }

    #[tokio::test]
    async fn update_user_inserts_then_updates_in_place() {
        let (service, _) = setup_test_service().await;

        let created = service
            .update_user(
                "auth|1",
                "Alice99".to_string(),
                "Alice".to_string(),
                Some("first bio".to_string()),
                None,
                "/onboarding",
            )
            .await
            .unwrap();

        // Normalized on write
        assert_eq!(created.username, "alice99");
        assert!(created.onboarded);

        let updated = service
            .update_user(
                "auth|1",
                "Alice99".to_string(),
                "Alice".to_string(),
                Some("second bio".to_string()),
                Some("https://img.example/alice.png".to_string()),
                "/onboarding",
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id, "upsert must not mint a new user");
        assert_eq!(updated.bio.as_deref(), Some("second bio"));

        let all = User::find().all(&service.db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].bio.as_deref(), Some("second bio"));
    }

    #[tokio::test]
    async fn update_user_revalidates_only_the_profile_edit_path() {
        let (service, revalidator) = setup_test_service().await;

        service
            .update_user(
                "auth|1",
                "alice".to_string(),
                "Alice".to_string(),
                None,
                None,
                "/onboarding",
            )
            .await
            .unwrap();
        assert!(
            revalidator.paths().is_empty(),
            "unrelated callers must not trigger invalidation"
        );

        service
            .update_user(
                "auth|1",
                "alice".to_string(),
                "Alice".to_string(),
                None,
                None,
                PROFILE_EDIT_PATH,
            )
            .await
            .unwrap();
        assert_eq!(revalidator.paths(), vec![PROFILE_EDIT_PATH.to_string()]);
    }

    #[tokio::test]
    async fn fetch_user_missing_is_none() {
        let (service, _) = setup_test_service().await;

        let view = service.fetch_user("auth|nobody").await.unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn fetch_user_resolves_communities() {
        let (service, _) = setup_test_service().await;

        let user = service
            .update_user(
                "auth|1",
                "alice".to_string(),
                "Alice".to_string(),
                None,
                None,
                "/onboarding",
            )
            .await
            .unwrap();

        for slug in ["rustaceans", "gophers"] {
            let community = CommunityActiveModel {
                id: Set(CommunityId::new()),
                slug: Set(slug.to_string()),
                name: Set(slug.to_string()),
                image: Set(None),
            };
            let community = Community::insert(community)
                .exec_with_returning(&service.db)
                .await
                .unwrap();

            let membership = CommunityMemberActiveModel {
                community_id: Set(community.id),
                user_id: Set(user.id),
            };
            CommunityMember::insert(membership)
                .exec(&service.db)
                .await
                .unwrap();
        }

        let view = service.fetch_user("auth|1").await.unwrap().unwrap();
        assert_eq!(view.user.id, user.id);
        assert_eq!(view.communities.len(), 2);
        assert!(view.communities.iter().any(|c| c.slug == "rustaceans"));
        assert!(view.communities.iter().any(|c| c.slug == "gophers"));
    }

    #[tokio::test]
    async fn fetch_user_posts_builds_authored_tree() {
        let (service, revalidator) = setup_test_service().await;
        let threads = ThreadsService::new(service.db.clone(), revalidator.clone());

        let alice = service
            .update_user(
                "auth|alice",
                "alice".to_string(),
                "Alice".to_string(),
                None,
                None,
                "/onboarding",
            )
            .await
            .unwrap();
        let bob = service
            .update_user(
                "auth|bob",
                "bob".to_string(),
                "Bob".to_string(),
                None,
                Some("https://img.example/bob.png".to_string()),
                "/onboarding",
            )
            .await
            .unwrap();

        let post = threads
            .create_thread("alice's post".to_string(), alice.id, None, "/")
            .await
            .unwrap();
        let reply = threads
            .add_comment(post.id, "bob's reply".to_string(), bob.id, "/")
            .await
            .unwrap();
        // Replies authored elsewhere never show up as the user's own posts
        threads
            .add_comment(post.id, "alice replying".to_string(), alice.id, "/")
            .await
            .unwrap();

        let view = service
            .fetch_user_posts("auth|alice")
            .await
            .unwrap()
            .expect("alice exists");

        assert_eq!(view.user.id, alice.id);
        assert_eq!(view.threads.len(), 1, "only top-level threads are listed");

        let authored = &view.threads[0];
        assert_eq!(authored.id, post.id);
        assert_eq!(authored.replies.len(), 2);

        let bobs = authored
            .replies
            .iter()
            .find(|r| r.id == reply.id)
            .expect("bob's reply present");
        assert_eq!(bobs.author.id, bob.id);
        assert_eq!(bobs.author.name, "Bob");
        assert_eq!(
            bobs.author.image.as_deref(),
            Some("https://img.example/bob.png")
        );
        assert!(
            bobs.replies.is_empty(),
            "the authored view resolves one reply level"
        );
    }

    #[tokio::test]
    async fn fetch_user_posts_missing_is_none() {
        let (service, _) = setup_test_service().await;

        let view = service.fetch_user_posts("auth|nobody").await.unwrap();
        assert!(view.is_none());
    }
}
