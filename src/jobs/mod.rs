use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, warn};

use crate::config::LimitSettings;
use crate::db::{interview_repository::InterviewRepository, profile_repository::ProfileRepository};

const STALE_BATCH_SIZE: i64 = 500;

/// Expires interviews that never left `started` and gives back the credit the
/// ones started on a credit took. Returns how many credits were refunded.
pub async fn refund_stale_interviews(
    profiles: &dyn ProfileRepository,
    interviews: &dyn InterviewRepository,
    settings: &LimitSettings,
    now: OffsetDateTime,
) -> Result<u64, sqlx::Error> {
    let cutoff = now - Duration::minutes(settings.credit_refund_minutes);
    let stale = interviews
        .list_stale_started(cutoff, STALE_BATCH_SIZE)
        .await?;

    let mut refunded = 0u64;
    for interview in stale {
        match interviews.expire_if_started(&interview.id).await {
            Ok(true) => {}
            // Completed or expired by someone else in the meantime.
            Ok(false) => continue,
            Err(err) => {
                error!(interview_id = %interview.id, ?err, "failed to expire stale interview");
                continue;
            }
        }

        if !interview.credit_consumed {
            debug!(interview_id = %interview.id, "expired interview did not use a credit");
            continue;
        }
        let Some(owner) = interview.owner.as_deref() else {
            warn!(
                interview_id = %interview.id,
                "expired interview has no owner; nothing to refund"
            );
            continue;
        };
        match profiles.add_credits(owner, 1).await {
            Ok(()) => refunded += 1,
            Err(err) => {
                error!(
                    interview_id = %interview.id,
                    %owner,
                    ?err,
                    "failed to refund interview credit"
                )
            }
        }
    }

    if refunded > 0 {
        info!(refunded, "refunded credits for abandoned interviews");
    }
    Ok(refunded)
}

/// Clears the Pro flag on profiles whose expiry has passed.
pub async fn expire_lapsed_entitlements(
    profiles: &dyn ProfileRepository,
    now: OffsetDateTime,
) -> Result<u64, sqlx::Error> {
    let expired = profiles.expire_lapsed_pro(now).await?;
    if expired > 0 {
        info!(expired, "expired lapsed pro entitlements");
    }
    Ok(expired)
}
