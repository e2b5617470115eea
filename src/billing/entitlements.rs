use time::{Duration, OffsetDateTime};

use super::event::{EventKind, LineItem, NormalizedEvent};
use crate::config::{EntitlementSettings, ProductCatalog};
use crate::models::profile::{ProUpdate, Profile};
use crate::models::subscription::SubscriptionStatus;

/// The single profile write an event results in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementChange {
    Unchanged,
    SetPro(ProUpdate),
    AddCredits(i32),
}

/// What a one-off transaction bought, looked up from its line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Pro,
    Credits(i32),
}

/// Credit packs add up across lines; a Pro product only counts when nothing
/// else on the transaction is a pack. `None` when no line is in the catalog.
pub fn purchase_for(items: &[LineItem], catalog: &ProductCatalog) -> Option<Purchase> {
    let mut credits: i32 = 0;
    let mut pro = false;
    for item in items {
        if let Some(per_unit) = item.ids.iter().find_map(|id| catalog.credits_for(id)) {
            credits = credits.saturating_add(per_unit.saturating_mul(item.quantity));
        } else if item.ids.iter().any(|id| catalog.is_pro(id)) {
            pro = true;
        }
    }
    if credits > 0 {
        Some(Purchase::Credits(credits))
    } else if pro {
        Some(Purchase::Pro)
    } else {
        None
    }
}

/// Stored state the resolver needs besides the event itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntitlementContext<'a> {
    pub profile: Option<&'a Profile>,
    /// Ledger status of the event's subscription before this event.
    pub previous_status: Option<&'a SubscriptionStatus>,
}

pub fn resolve(
    event: &NormalizedEvent,
    ctx: EntitlementContext<'_>,
    settings: &EntitlementSettings,
    now: OffsetDateTime,
) -> EntitlementChange {
    match event.kind {
        EventKind::SubscriptionChanged => match &event.subscription_status {
            Some(status) => subscription_change(
                status,
                event.next_bill_date,
                event.cancel_at,
                ctx,
                settings,
                now,
            ),
            None => EntitlementChange::Unchanged,
        },
        EventKind::TransactionCompleted => transaction_completed(event, ctx, settings, now),
        EventKind::Refunded => refund(event, settings, now),
        EventKind::TransactionPaid | EventKind::PaymentFailed | EventKind::Unhandled => {
            EntitlementChange::Unchanged
        }
    }
}

pub fn subscription_change(
    status: &SubscriptionStatus,
    next_bill_date: Option<OffsetDateTime>,
    cancel_at: Option<OffsetDateTime>,
    ctx: EntitlementContext<'_>,
    settings: &EntitlementSettings,
    now: OffsetDateTime,
) -> EntitlementChange {
    // A canceled subscription id never grants again.
    if ctx.previous_status.map(SubscriptionStatus::is_terminal).unwrap_or(false)
        && !status.is_terminal()
    {
        return EntitlementChange::Unchanged;
    }

    match status {
        SubscriptionStatus::Active | SubscriptionStatus::Trialing => {
            let floor = now + Duration::days(settings.pro_duration_days);
            EntitlementChange::SetPro(ProUpdate {
                pro: true,
                pro_expires_at: Some(next_bill_date.map_or(floor, |d| d.max(floor))),
            })
        }
        SubscriptionStatus::PastDue => {
            // Flag untouched; access lapses once the grace window passes.
            let Some(profile) = ctx.profile else {
                return EntitlementChange::Unchanged;
            };
            let grace_end = now + Duration::days(settings.past_due_grace_days);
            let capped = profile.pro_expires_at.map_or(grace_end, |e| e.min(grace_end));
            EntitlementChange::SetPro(ProUpdate {
                pro: profile.pro,
                pro_expires_at: Some(capped),
            })
        }
        SubscriptionStatus::Canceled => match cancel_at.filter(|at| *at > now) {
            Some(at) => EntitlementChange::SetPro(ProUpdate {
                pro: true,
                pro_expires_at: Some(at),
            }),
            None => revoke(now),
        },
        SubscriptionStatus::Paused => revoke(now),
        SubscriptionStatus::Other(_) => EntitlementChange::Unchanged,
    }
}

fn transaction_completed(
    event: &NormalizedEvent,
    ctx: EntitlementContext<'_>,
    settings: &EntitlementSettings,
    now: OffsetDateTime,
) -> EntitlementChange {
    let floor = now + Duration::days(settings.pro_duration_days);

    if event.subscription_id.is_some() {
        if ctx.previous_status.map(SubscriptionStatus::is_terminal).unwrap_or(false) {
            return EntitlementChange::Unchanged;
        }
        let period_end = event.billing_period_end.or(event.next_bill_date);
        return EntitlementChange::SetPro(ProUpdate {
            pro: true,
            pro_expires_at: Some(period_end.map_or(floor, |end| end.max(floor))),
        });
    }

    match purchase_for(&event.items, &settings.catalog) {
        Some(Purchase::Credits(n)) => EntitlementChange::AddCredits(n),
        Some(Purchase::Pro) => EntitlementChange::SetPro(ProUpdate {
            pro: true,
            pro_expires_at: Some(floor),
        }),
        None => EntitlementChange::Unchanged,
    }
}

/// Only one-off purchases are reversed here; a refunded subscription is
/// revoked through its own cancellation event.
fn refund(
    event: &NormalizedEvent,
    settings: &EntitlementSettings,
    now: OffsetDateTime,
) -> EntitlementChange {
    if event.subscription_id.is_some() {
        return EntitlementChange::Unchanged;
    }
    match purchase_for(&event.items, &settings.catalog) {
        Some(Purchase::Credits(n)) => EntitlementChange::AddCredits(-n),
        Some(Purchase::Pro) => revoke(now),
        None => EntitlementChange::Unchanged,
    }
}

fn revoke(now: OffsetDateTime) -> EntitlementChange {
    EntitlementChange::SetPro(ProUpdate {
        pro: false,
        pro_expires_at: Some(now),
    })
}
