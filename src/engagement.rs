//! Engagement persistence and throttled session telemetry.
//!
//! Every qualifying settle bumps a durable counter; the remote collaborator
//! only hears about it in batches of four. Promoted impressions go out
//! per-card, gated upstream by the cache's one-time `view_stat_sent`
//! transition.

use crate::feed::fetcher::NewsController;
use crate::storage::{Database, CARDS_VIEWED_KEY};
use crate::viewport::SettleOutcome;
use anyhow::Result;
use std::sync::Arc;

/// Batch size for `on_session_card_views_count_changed`.
const SESSION_BATCH_INTERVAL: i64 = 4;

pub struct EngagementReporter {
    db: Database,
    controller: Arc<dyn NewsController>,
}

impl EngagementReporter {
    pub fn new(db: Database, controller: Arc<dyn NewsController>) -> Self {
        Self { db, controller }
    }

    /// Apply one settle outcome: report first-time promoted impressions,
    /// persist the view counter, and emit the throttled batch signal on
    /// every 4th view.
    ///
    /// Returns the (possibly unchanged) persisted view count.
    pub async fn record_settle(&self, outcome: &SettleOutcome) -> Result<i64> {
        for view in &outcome.promoted_views {
            tracing::info!(
                uuid = %view.uuid,
                creative_instance_id = %view.creative_instance_id,
                "Reporting promoted item view"
            );
            self.controller
                .on_promoted_item_view(&view.uuid.to_string(), &view.creative_instance_id);
        }

        if !outcome.card_viewed {
            return self.db.read_counter(CARDS_VIEWED_KEY).await;
        }

        let count = self.db.increment_counter(CARDS_VIEWED_KEY).await?;
        if count > 0 && count % SESSION_BATCH_INTERVAL == 0 {
            tracing::debug!(count, "Emitting session card views batch signal");
            self.controller
                .on_session_card_views_count_changed(count as i16);
        }

        Ok(count)
    }

    /// Forward the session-start signal. Called once per panel activation;
    /// idempotence across repeated calls within a session is the caller's
    /// responsibility.
    pub fn session_started(&self) {
        self.controller.on_interaction_session_started();
    }

    /// Current persisted view count.
    pub async fn viewed_count(&self) -> Result<i64> {
        self.db.read_counter(CARDS_VIEWED_KEY).await
    }

    /// Explicit external clear of the persisted count (feature toggled off).
    pub async fn reset(&self) -> Result<()> {
        self.db.reset_counter(CARDS_VIEWED_KEY).await
    }
}

// ============================================================================
// Tests
// ============================================================================
