use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::mailer::Mailer;
use crate::models::{InteractionKind, Match};
use crate::store::{AccountStore, InteractionLedger, MatchRegistry, ProfileStore, Stores};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResult {
    pub is_match: bool,
}

/// Like/dislike control logic and mutual-match detection.
///
/// The interaction write commits before the reciprocal lookup, and match
/// creation is conditional on the pair having no match yet. A retried `like`
/// therefore completes a match whose first attempt failed after the
/// interaction was stored, and concurrent reciprocal likes notify once.
pub struct MatchingEngine {
    accounts: Arc<dyn AccountStore>,
    profiles: Arc<dyn ProfileStore>,
    interactions: Arc<dyn InteractionLedger>,
    matches: Arc<dyn MatchRegistry>,
    mailer: Arc<dyn Mailer>,
}

impl MatchingEngine {
    pub fn new(stores: &Stores, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            accounts: stores.accounts.clone(),
            profiles: stores.profiles.clone(),
            interactions: stores.interactions.clone(),
            matches: stores.matches.clone(),
            mailer,
        }
    }

    pub async fn like(&self, from: Uuid, to: Uuid) -> AppResult<LikeResult> {
        self.ensure_target(from, to, "you cannot like yourself").await?;

        self.interactions.upsert_interaction(from, to, InteractionKind::Like).await?;
        counter!("maxdate_interactions_total", "kind" => "like").increment(1);
        tracing::info!(from = %from, to = %to, "like recorded");

        let reciprocal = self
            .interactions
            .find_interaction(to, from)
            .await?
            .is_some_and(|i| i.kind == InteractionKind::Like);
        if !reciprocal {
            return Ok(LikeResult { is_match: false });
        }

        if let Some(created) = self.matches.create_match_if_absent(from, to).await? {
            counter!("maxdate_matches_created_total").increment(1);
            tracing::info!(match_id = %created.id, user1 = %from, user2 = %to, "match created");
            self.notify(&created).await;
        }

        Ok(LikeResult { is_match: true })
    }

    /// Records a dislike. An existing match is left untouched.
    pub async fn dislike(&self, from: Uuid, to: Uuid) -> AppResult<()> {
        self.ensure_target(from, to, "you cannot dislike yourself").await?;

        self.interactions.upsert_interaction(from, to, InteractionKind::Dislike).await?;
        counter!("maxdate_interactions_total", "kind" => "dislike").increment(1);
        tracing::info!(from = %from, to = %to, "dislike recorded");
        Ok(())
    }

    async fn ensure_target(&self, from: Uuid, to: Uuid, self_message: &str) -> AppResult<()> {
        if from == to {
            return Err(AppError::new(ErrorCode::CannotLikeSelf, self_message));
        }
        if !self.accounts.account_exists(to).await? {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }
        Ok(())
    }

    /// Tells each side about the other. Failures are logged and counted, never
    /// propagated.
    async fn notify(&self, created: &Match) {
        let (initiator, target) = (created.user1_id, created.user2_id);
        self.notify_side(target, initiator, created.id).await;
        self.notify_side(initiator, target, created.id).await;
    }

    async fn notify_side(&self, recipient: Uuid, about: Uuid, match_id: Uuid) {
        if let Err(e) = self.try_notify_side(recipient, about).await {
            counter!("maxdate_match_notifications_failed_total").increment(1);
            tracing::error!(
                match_id = %match_id,
                recipient = %recipient,
                error = %e,
                "failed to send match notification"
            );
        }
    }

    async fn try_notify_side(&self, recipient: Uuid, about: Uuid) -> anyhow::Result<()> {
        let Some(account) = self.accounts.find_account(recipient).await? else {
            return Ok(());
        };
        let Some(other) = self.profiles.find_profile_by_user(about).await? else {
            return Ok(());
        };

        self.mailer
            .send_match_notification(&account.email, &other.profile.display_name())
            .await?;
        Ok(())
    }
}
