//! Best-effort per-user quota bookkeeping.
//!
//! Runs after a transcript was produced and never surfaces to the caller: a
//! missing user record or a store failure is logged and the response that is
//! already being sent stays untouched.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::storage::{DocumentStore, UpdateSpec, collections};
use crate::utils::now_rfc3339;

/// Fixed decrement per successful transcription, in minutes.
pub const QUOTA_DECREMENT_MINUTES: f64 = 1.0;

/// Decrement the user's remaining minutes, clamped at zero. The user record
/// is never created here; it must already exist.
pub async fn decrement_remaining_minutes(store: Arc<dyn DocumentStore>, uid: String) {
    let filter = json!({ "uid": uid });

    let user = match store.find_one(collections::USERS, &filter).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!(%uid, "quota update skipped: no user record");
            return;
        }
        Err(e) => {
            warn!(%uid, "quota lookup failed: {e}");
            return;
        }
    };

    let remaining = user
        .get("remainingMinutes")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    let next = (remaining - QUOTA_DECREMENT_MINUTES).max(0.0);

    let update = UpdateSpec::default()
        .set("remainingMinutes", json!(next))
        .set("lastUpdated", json!(now_rfc3339()));

    match store
        .update_one(collections::USERS, &filter, update, false)
        .await
    {
        Ok(outcome) if outcome.matched == 1 => {
            debug!(%uid, remaining = next, "quota decremented");
        }
        Ok(_) => debug!(%uid, "quota update skipped: user record disappeared"),
        Err(e) => warn!(%uid, "quota update failed: {e}"),
    }
}
