use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use super::entitlements::{self, EntitlementChange, EntitlementContext};
use super::event::{EventKind, NormalizedEvent, PaymentEvent};
use crate::config::EntitlementSettings;
use crate::db::{billing_repository::BillingRepository, profile_repository::ProfileRepository};
use crate::models::{
    payment::{Payment, PaymentStatus, PaymentUpsert, PAYMENT_PROVIDER_PADDLE},
    subscription::{SubscriptionStatus, SubscriptionUpsert},
    subscription_event::NewSubscriptionEvent,
};
use crate::services::paddle::{PaddleService, PaddleServiceError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: ReconcileError,
}

/// Outcome of processing one verified webhook delivery.
#[derive(Debug)]
pub struct ReconcileReport {
    pub event_id: String,
    pub event_type: String,
    pub kind: EventKind,
    pub user_id: Option<String>,
    /// The payment already had this event's terminal status; nothing was written.
    pub duplicate: bool,
    pub change: EntitlementChange,
    /// Successful writes.
    pub persisted: usize,
    pub failures: Vec<StepFailure>,
    /// Processing stopped before the payment reached its terminal status, either
    /// because idempotency could not be established or because the entitlement
    /// write failed. The provider must deliver the event again.
    pub aborted: bool,
}

impl ReconcileReport {
    fn new(event_id: String, normalized: &NormalizedEvent) -> Self {
        Self {
            event_id,
            event_type: normalized.event_type.clone(),
            kind: normalized.kind,
            user_id: normalized.user_id.clone(),
            duplicate: false,
            change: EntitlementChange::Unchanged,
            persisted: 0,
            failures: Vec::new(),
            aborted: false,
        }
    }

    fn fail(&mut self, step: &'static str, err: impl Into<ReconcileError>) {
        let err = err.into();
        error!(event_id = %self.event_id, step, ?err, "webhook reconcile step failed");
        self.failures.push(StepFailure { step, error: err });
    }

    /// Whether the provider should deliver the event again.
    pub fn needs_redelivery(&self) -> bool {
        if self.duplicate {
            return false;
        }
        self.aborted || (self.persisted == 0 && !self.failures.is_empty())
    }
}

/// Raw event id: the provider's id, or a digest of the body when it has none.
pub fn event_id_for(normalized: &NormalizedEvent, raw_body: &[u8]) -> String {
    normalized
        .event_id
        .clone()
        .unwrap_or_else(|| format!("sha256:{}", hex::encode(Sha256::digest(raw_body))))
}

fn terminal_payment_status(kind: EventKind) -> Option<PaymentStatus> {
    match kind {
        EventKind::TransactionCompleted => Some(PaymentStatus::Completed),
        EventKind::Refunded => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

fn ledger_payment_status(kind: EventKind) -> Option<PaymentStatus> {
    match kind {
        EventKind::TransactionCompleted => Some(PaymentStatus::Completed),
        EventKind::TransactionPaid => Some(PaymentStatus::Paid),
        EventKind::PaymentFailed => Some(PaymentStatus::Failed),
        EventKind::Refunded => Some(PaymentStatus::Refunded),
        EventKind::SubscriptionChanged | EventKind::Unhandled => None,
    }
}

/// True when the stored payment is already at or past `status`.
fn already_reached(existing: Option<&Payment>, status: PaymentStatus) -> bool {
    existing
        .and_then(Payment::payment_status)
        .is_some_and(|stored| stored.rank() >= status.rank())
}

pub struct Reconciler<'a> {
    pub profiles: &'a dyn ProfileRepository,
    pub billing: &'a dyn BillingRepository,
    pub paddle: &'a dyn PaddleService,
    pub settings: &'a EntitlementSettings,
}

impl Reconciler<'_> {
    /// Applies one delivery, then records it in the event log under the user
    /// it resolved to.
    pub async fn reconcile(
        &self,
        event: &PaymentEvent,
        raw_body: &[u8],
        now: OffsetDateTime,
    ) -> ReconcileReport {
        let mut normalized = event.normalize();
        let event_id = event_id_for(&normalized, raw_body);
        let mut report = ReconcileReport::new(event_id, &normalized);

        self.process(&mut normalized, raw_body, now, &mut report).await;
        self.record_event(&normalized, raw_body, &mut report).await;

        report
    }

    async fn record_event(
        &self,
        normalized: &NormalizedEvent,
        raw_body: &[u8],
        report: &mut ReconcileReport,
    ) {
        let recorded = self
            .billing
            .record_event(NewSubscriptionEvent {
                id: report.event_id.clone(),
                event_type: normalized.event_type.clone(),
                user_id: report.user_id.clone(),
                raw: String::from_utf8_lossy(raw_body).into_owned(),
            })
            .await;
        match recorded {
            Ok(inserted) => {
                report.persisted += 1;
                if !inserted {
                    debug!(event_id = %report.event_id, "event already recorded");
                }
            }
            Err(err) => report.fail("record_event", err),
        }
    }

    async fn process(
        &self,
        normalized: &mut NormalizedEvent,
        raw_body: &[u8],
        now: OffsetDateTime,
        report: &mut ReconcileReport,
    ) {
        let event_id = report.event_id.clone();

        if normalized.kind == EventKind::Unhandled {
            info!(%event_id, event_type = %normalized.event_type, "unhandled paddle event");
            return;
        }

        let terminal = terminal_payment_status(normalized.kind);
        let existing_payment = match normalized.transaction_id.as_deref() {
            Some(txn_id) => match self.billing.find_payment(txn_id).await {
                Ok(payment) => payment,
                Err(err) => {
                    report.fail("find_payment", err);
                    // Without the stored status a redelivery could be applied twice.
                    if terminal.is_some() {
                        report.aborted = true;
                        return;
                    }
                    None
                }
            },
            None => None,
        };

        if let (Some(terminal), Some(existing)) = (terminal, existing_payment.as_ref()) {
            // A completion arriving after the refund is as stale as a repeat.
            if already_reached(Some(existing), terminal) {
                info!(
                    %event_id,
                    transaction_id = %existing.id,
                    status = %existing.status,
                    "payment already processed; skipping"
                );
                report.duplicate = true;
                if report.user_id.is_none() {
                    report.user_id = existing.user_id.clone();
                }
                return;
            }
        }

        if normalized.kind == EventKind::Refunded {
            if let Some(original) = existing_payment.as_ref() {
                inherit_from_original(normalized, original);
            }
        }

        let previous_subscription = match normalized.subscription_id.as_deref() {
            Some(sub_id) => match self.billing.find_subscription(sub_id).await {
                Ok(sub) => sub,
                Err(err) => {
                    report.fail("find_subscription", err);
                    None
                }
            },
            None => None,
        };

        if normalized.user_id.is_none() {
            normalized.user_id = previous_subscription
                .as_ref()
                .and_then(|s| s.user_id.clone())
                .or_else(|| existing_payment.as_ref().and_then(|p| p.user_id.clone()));
        }
        if normalized.user_id.is_none() {
            if let Some(customer_id) = normalized.customer_id.clone() {
                normalized.user_id = self.user_for_customer(&customer_id, report).await;
            }
        }
        report.user_id = normalized.user_id.clone();

        let previous_status = previous_subscription.as_ref().map(|s| s.status());
        self.write_ledger(
            normalized,
            existing_payment.as_ref(),
            previous_status.as_ref(),
            raw_body,
            report,
        )
        .await;

        let Some(user_id) = normalized.user_id.clone() else {
            warn!(
                %event_id,
                event_type = %normalized.event_type,
                customer_id = ?normalized.customer_id,
                "paddle event has no resolvable user; entitlements unchanged"
            );
            self.settle_payment(normalized, raw_body, report).await;
            return;
        };

        let profile = match self.profiles.find_profile(&user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                report.fail("find_profile", err);
                None
            }
        };
        let change = entitlements::resolve(
            normalized,
            EntitlementContext {
                profile: profile.as_ref(),
                previous_status: previous_status.as_ref(),
            },
            self.settings,
            now,
        );
        report.change = change;
        if change == EntitlementChange::Unchanged && buys_nothing(normalized, self.settings) {
            warn!(
                %event_id,
                transaction_id = ?normalized.transaction_id,
                product_id = ?normalized.product_id,
                "one-off transaction has no catalog product; entitlements unchanged"
            );
        }

        let applied = match change {
            EntitlementChange::Unchanged => Ok(()),
            EntitlementChange::SetPro(update) => self.profiles.set_pro(&user_id, update).await,
            EntitlementChange::AddCredits(delta) => {
                self.profiles.add_credits(&user_id, delta).await
            }
        };
        match applied {
            Ok(()) => {
                if change != EntitlementChange::Unchanged {
                    report.persisted += 1;
                    info!(%event_id, %user_id, ?change, "entitlement updated");
                }
            }
            Err(err) => {
                report.fail("apply_entitlement", err);
                if terminal.is_some() {
                    // Leave the payment short of its terminal status so the
                    // redelivery is not mistaken for a duplicate.
                    report.aborted = true;
                    return;
                }
            }
        }

        self.settle_payment(normalized, raw_body, report).await;
    }

    /// Ledger mapping first, then the Paddle customer's email matched against
    /// profiles. Upstream failures degrade to no user.
    async fn user_for_customer(
        &self,
        customer_id: &str,
        report: &mut ReconcileReport,
    ) -> Option<String> {
        match self.billing.find_user_id_by_customer_id(customer_id).await {
            Ok(Some(user_id)) => return Some(user_id),
            Ok(None) => {}
            Err(err) => report.fail("resolve_user", err),
        }

        let email = match self.paddle.customer_email(customer_id).await {
            Ok(Some(email)) => email,
            Ok(None) => return None,
            Err(PaddleServiceError::NotConfigured) => {
                debug!(%customer_id, "paddle api key not configured; skipping customer lookup");
                return None;
            }
            Err(err) => {
                warn!(%customer_id, ?err, "paddle customer lookup failed");
                return None;
            }
        };

        match self.profiles.find_profile_by_email(&email).await {
            Ok(profile) => profile.map(|p| p.id),
            Err(err) => {
                report.fail("resolve_user", err);
                None
            }
        }
    }

    /// Non-terminal payment statuses, subscriptions and checkout sessions. The
    /// terminal payment status is written by [`Self::settle_payment`] once the
    /// entitlement is in place.
    async fn write_ledger(
        &self,
        normalized: &NormalizedEvent,
        existing_payment: Option<&Payment>,
        previous_status: Option<&SubscriptionStatus>,
        raw_body: &[u8],
        report: &mut ReconcileReport,
    ) {
        if let Some(status) = ledger_payment_status(normalized.kind)
            .filter(|_| terminal_payment_status(normalized.kind).is_none())
        {
            if already_reached(existing_payment, status) {
                debug!(
                    event_id = %report.event_id,
                    status = status.as_str(),
                    "payment already past this status; ledger unchanged"
                );
            } else {
                self.upsert_payment(normalized, status, raw_body, report).await;
            }
        }

        if normalized.kind == EventKind::SubscriptionChanged {
            if let (Some(sub_id), Some(status)) = (
                normalized.subscription_id.as_ref(),
                normalized.subscription_status.clone(),
            ) {
                let status = match previous_status {
                    Some(prev) if prev.is_terminal() => prev.clone(),
                    _ => status,
                };
                let upsert = SubscriptionUpsert {
                    id: sub_id.clone(),
                    user_id: normalized.user_id.clone(),
                    customer_id: normalized.customer_id.clone(),
                    provider: PAYMENT_PROVIDER_PADDLE,
                    product_id: normalized.product_id.clone(),
                    status,
                    next_bill_date: normalized.next_bill_date,
                    cancel_at: normalized.cancel_at,
                };
                match self.billing.upsert_subscription(upsert).await {
                    Ok(()) => report.persisted += 1,
                    Err(err) => report.fail("upsert_subscription", err),
                }
            }
        }

        if normalized.kind == EventKind::TransactionCompleted {
            if let Some(session_id) = normalized.checkout_session_id.as_deref() {
                match self.billing.complete_checkout_session(session_id).await {
                    Ok(true) => report.persisted += 1,
                    Ok(false) => debug!(%session_id, "checkout session not found"),
                    Err(err) => report.fail("complete_checkout_session", err),
                }
            }
        }
    }

    async fn settle_payment(
        &self,
        normalized: &NormalizedEvent,
        raw_body: &[u8],
        report: &mut ReconcileReport,
    ) {
        if let Some(status) = terminal_payment_status(normalized.kind) {
            self.upsert_payment(normalized, status, raw_body, report).await;
        }
    }

    async fn upsert_payment(
        &self,
        normalized: &NormalizedEvent,
        status: PaymentStatus,
        raw_body: &[u8],
        report: &mut ReconcileReport,
    ) {
        let Some(txn_id) = normalized.transaction_id.clone() else {
            return;
        };
        let upsert = PaymentUpsert {
            id: txn_id,
            user_id: normalized.user_id.clone(),
            customer_id: normalized.customer_id.clone(),
            provider: PAYMENT_PROVIDER_PADDLE,
            // Keep the charged amount; the refund amount stays in `raw`.
            amount: if status == PaymentStatus::Refunded {
                None
            } else {
                normalized.amount
            },
            currency: normalized.currency.clone(),
            status,
            raw: String::from_utf8_lossy(raw_body).into_owned(),
        };
        match self.billing.upsert_payment(upsert).await {
            Ok(()) => report.persisted += 1,
            Err(err) => report.fail("upsert_payment", err),
        }
    }
}

/// A one-off completion whose line items match nothing in the catalog.
fn buys_nothing(normalized: &NormalizedEvent, settings: &EntitlementSettings) -> bool {
    normalized.kind == EventKind::TransactionCompleted
        && normalized.subscription_id.is_none()
        && entitlements::purchase_for(&normalized.items, &settings.catalog).is_none()
}

/// A refund only names the transaction; the line items, owner and
/// subscription come from the payment it reverses.
fn inherit_from_original(refund: &mut NormalizedEvent, original: &Payment) {
    if refund.user_id.is_none() {
        refund.user_id = original.user_id.clone();
    }
    if refund.customer_id.is_none() {
        refund.customer_id = original.customer_id.clone();
    }
    if let Ok(source) = PaymentEvent::parse(original.raw.as_bytes()) {
        let source = source.normalize();
        refund.items = source.items;
        if refund.subscription_id.is_none() {
            refund.subscription_id = source.subscription_id;
        }
    }
}
