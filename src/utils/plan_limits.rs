use serde::Serialize;
use time::{Duration, OffsetDateTime, Time, UtcOffset};

use crate::config::LimitSettings;
use crate::db::{
    billing_repository::BillingRepository, interview_repository::InterviewRepository,
    profile_repository::ProfileRepository,
};
use crate::models::{profile::Profile, subscription::Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaTier {
    Subscribed,
    Credits,
    Free,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewLimits {
    pub anonymous: bool,
    pub is_subscribed: bool,
    pub remaining: i64,
    pub limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_this_month: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub pro_expires_at: Option<OffsetDateTime>,
    #[serde(skip)]
    pub tier: QuotaTier,
}

impl InterviewLimits {
    /// Signed-out visitors see the free allowance without any usage applied.
    pub fn anonymous(settings: &LimitSettings) -> Self {
        Self {
            anonymous: true,
            is_subscribed: false,
            remaining: settings.max_interviews_free,
            limit: settings.max_interviews_free,
            used_this_month: None,
            used_total: None,
            credits: None,
            pro_expires_at: None,
            tier: QuotaTier::Free,
        }
    }

    pub fn can_start(&self) -> bool {
        self.remaining > 0
    }
}

/// First instant of the current calendar month, in UTC.
pub fn month_start(now: OffsetDateTime) -> OffsetDateTime {
    let now = now.to_offset(UtcOffset::UTC);
    (now - Duration::days(i64::from(now.day()) - 1)).replace_time(Time::MIDNIGHT)
}

/// Which quota applies, in priority order: a current subscription or unexpired
/// Pro flag, then purchased credits, then the free allowance.
pub fn quota_tier(
    profile: Option<&Profile>,
    subscription: Option<&Subscription>,
    now: OffsetDateTime,
) -> QuotaTier {
    let subscribed = subscription.map(|s| s.is_current(now)).unwrap_or(false)
        || profile.map(|p| p.has_active_pro(now)).unwrap_or(false);
    if subscribed {
        QuotaTier::Subscribed
    } else if profile.map(|p| p.credits > 0).unwrap_or(false) {
        QuotaTier::Credits
    } else {
        QuotaTier::Free
    }
}

pub fn compute_limits(
    tier: QuotaTier,
    profile: Option<&Profile>,
    used: i64,
    settings: &LimitSettings,
) -> InterviewLimits {
    let credits = profile.map(|p| i64::from(p.credits)).unwrap_or(0);
    let pro_expires_at = profile.and_then(|p| p.pro_expires_at);
    match tier {
        QuotaTier::Subscribed => {
            let limit = settings.max_interviews_subscribed_monthly;
            InterviewLimits {
                anonymous: false,
                is_subscribed: true,
                remaining: (limit - used).max(0),
                limit,
                used_this_month: Some(used),
                used_total: None,
                credits: None,
                pro_expires_at,
                tier,
            }
        }
        QuotaTier::Credits => InterviewLimits {
            anonymous: false,
            is_subscribed: false,
            remaining: credits,
            limit: credits,
            used_this_month: None,
            used_total: None,
            credits: Some(credits),
            pro_expires_at: None,
            tier,
        },
        QuotaTier::Free => {
            let limit = settings.max_interviews_free;
            InterviewLimits {
                anonymous: false,
                is_subscribed: false,
                remaining: (limit - used).max(0),
                limit,
                used_this_month: None,
                used_total: Some(used),
                credits: Some(credits),
                pro_expires_at: None,
                tier,
            }
        }
    }
}

/// Reads the profile, subscription and usage counts for `user_id` and works
/// out the remaining quota. A missing profile row means no credits and no Pro.
pub async fn load_limits(
    profiles: &dyn ProfileRepository,
    billing: &dyn BillingRepository,
    interviews: &dyn InterviewRepository,
    user_id: &str,
    settings: &LimitSettings,
    now: OffsetDateTime,
) -> Result<InterviewLimits, sqlx::Error> {
    let profile = profiles.find_profile(user_id).await?;
    let subscription = billing.find_active_subscription_for_user(user_id).await?;
    let tier = quota_tier(profile.as_ref(), subscription.as_ref(), now);

    let used = match tier {
        QuotaTier::Subscribed => {
            interviews
                .count_interviews_since(user_id, month_start(now))
                .await?
        }
        QuotaTier::Credits => 0,
        QuotaTier::Free => interviews.count_interviews(user_id).await?,
    };

    Ok(compute_limits(tier, profile.as_ref(), used, settings))
}
