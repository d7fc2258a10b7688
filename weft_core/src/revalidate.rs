use async_trait::async_trait;

/// The one path whose revalidation `update_user` is allowed to trigger.
/// Other callers of the upsert reach it from pages that revalidate themselves.
pub const PROFILE_EDIT_PATH: &str = "/profile/edit";

/// Notifies the hosting layer that cached renders of a logical path are
/// stale. Fire-and-forget: implementations must not surface failures.
#[async_trait]
pub trait Revalidator: Send + Sync {
    async fn revalidate(&self, path: &str);
}

/// Default notifier used when no hosting layer is wired in.
#[derive(Debug, Default)]
pub struct LogRevalidator;

#[async_trait]
impl Revalidator for LogRevalidator {
    async fn revalidate(&self, path: &str) {
        tracing::info!(path, "revalidate");
    }
}
