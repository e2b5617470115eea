use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use time::OffsetDateTime;

use crate::db::{
    billing_repository::{BillingRepository, NewCheckoutSession},
    interview_repository::InterviewRepository,
    profile_repository::ProfileRepository,
};
use crate::models::{
    checkout_session::{CheckoutSession, CHECKOUT_STATUS_COMPLETED, CHECKOUT_STATUS_CREATED},
    interview::{
        Interview, InterviewResults, INTERVIEW_STATUS_COMPLETED, INTERVIEW_STATUS_EXPIRED,
        INTERVIEW_STATUS_STARTED,
    },
    payment::{Payment, PaymentUpsert},
    profile::{Profile, ProUpdate},
    subscription::{Subscription, SubscriptionUpsert},
    subscription_event::{NewSubscriptionEvent, SubscriptionEvent},
};

/// In-memory stand-in for all three repositories, with upsert semantics that
/// mirror the Postgres implementations.
#[derive(Default)]
pub struct MockDb {
    pub profiles: Mutex<HashMap<String, Profile>>,
    pub payments: Mutex<HashMap<String, Payment>>,
    pub subscriptions: Mutex<HashMap<String, Subscription>>,
    pub events: Mutex<HashMap<String, SubscriptionEvent>>,
    pub interviews: Mutex<HashMap<String, Interview>>,
    pub checkout_sessions: Mutex<HashMap<String, CheckoutSession>>,
    pub fail_event_log: bool,
    pub fail_subscription_upsert: bool,
    /// Atomic so a test can let a redelivery succeed on the same store.
    pub fail_profile_writes: AtomicBool,
    pub fail_credit_refund_for: Option<String>,
    pub set_pro_calls: Mutex<usize>,
}

fn mock_failure() -> sqlx::Error {
    sqlx::Error::Protocol("Mock DB failure".into())
}

impl MockDb {
    pub fn insert_profile(&self, id: &str, credits: i32) {
        self.profiles.lock().unwrap().insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                email: Some(format!("{id}@example.com")),
                credits,
                pro: false,
                pro_expires_at: None,
                is_admin: false,
            },
        );
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(id).cloned()
    }

    /// Inserts an interview that was paid for with a credit.
    pub fn insert_interview(
        &self,
        id: &str,
        owner: Option<&str>,
        status: &str,
        age: time::Duration,
    ) {
        self.insert_interview_with(id, owner, status, age, true);
    }

    pub fn insert_interview_with(
        &self,
        id: &str,
        owner: Option<&str>,
        status: &str,
        age: time::Duration,
        credit_consumed: bool,
    ) {
        let created_at = OffsetDateTime::now_utc() - age;
        self.interviews.lock().unwrap().insert(
            id.to_string(),
            Interview {
                id: id.to_string(),
                owner: owner.map(str::to_string),
                transcript: None,
                analysis: None,
                status: status.to_string(),
                room_name: format!("room-{id}"),
                audio_signed_url: None,
                video_signed_url: None,
                credit_consumed,
                created_at,
                updated_at: created_at,
            },
        );
    }

    pub fn interview_status(&self, id: &str) -> Option<String> {
        self.interviews
            .lock()
            .unwrap()
            .get(id)
            .map(|i| i.status.clone())
    }

    fn blank_profile(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            email: None,
            credits: 0,
            pro: false,
            pro_expires_at: None,
            is_admin: false,
        }
    }
}

#[async_trait]
impl ProfileRepository for MockDb {
    async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>, sqlx::Error> {
        Ok(self.profile(user_id))
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, sqlx::Error> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .find(|p| {
                p.email
                    .as_deref()
                    .map(|e| e.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn set_pro(&self, user_id: &str, update: ProUpdate) -> Result<(), sqlx::Error> {
        if self.fail_profile_writes.load(Ordering::SeqCst) {
            return Err(mock_failure());
        }
        *self.set_pro_calls.lock().unwrap() += 1;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Self::blank_profile(user_id));
        profile.pro = update.pro;
        profile.pro_expires_at = update.pro_expires_at;
        Ok(())
    }

    async fn add_credits(&self, user_id: &str, delta: i32) -> Result<(), sqlx::Error> {
        if self.fail_profile_writes.load(Ordering::SeqCst)
            || self.fail_credit_refund_for.as_deref() == Some(user_id) {
            return Err(mock_failure());
        }
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Self::blank_profile(user_id));
        profile.credits = (profile.credits + delta).max(0);
        Ok(())
    }

    async fn consume_credit(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let mut profiles = self.profiles.lock().unwrap();
        match profiles.get_mut(user_id) {
            Some(profile) if profile.credits > 0 => {
                profile.credits -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_lapsed_pro(&self, now: OffsetDateTime) -> Result<u64, sqlx::Error> {
        let mut expired = 0;
        for profile in self.profiles.lock().unwrap().values_mut() {
            if profile.pro && profile.pro_expires_at.map(|e| e <= now).unwrap_or(false) {
                profile.pro = false;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl BillingRepository for MockDb {
    async fn record_event(&self, event: NewSubscriptionEvent) -> Result<bool, sqlx::Error> {
        if self.fail_event_log {
            return Err(mock_failure());
        }
        let mut events = self.events.lock().unwrap();
        if events.contains_key(&event.id) {
            return Ok(false);
        }
        events.insert(
            event.id.clone(),
            SubscriptionEvent {
                id: event.id,
                event_type: event.event_type,
                user_id: event.user_id,
                raw: event.raw,
                received_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(true)
    }

    async fn find_payment(&self, id: &str) -> Result<Option<Payment>, sqlx::Error> {
        Ok(self.payments.lock().unwrap().get(id).cloned())
    }

    async fn upsert_payment(&self, payment: PaymentUpsert) -> Result<(), sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        let mut payments = self.payments.lock().unwrap();
        match payments.get_mut(&payment.id) {
            Some(existing) => {
                existing.user_id = payment.user_id.or(existing.user_id.take());
                existing.customer_id = payment.customer_id.or(existing.customer_id.take());
                existing.amount = payment.amount.or(existing.amount);
                existing.currency = payment.currency.or(existing.currency.take());
                existing.status = payment.status.as_str().to_string();
                existing.raw = payment.raw;
                existing.updated_at = now;
            }
            None => {
                payments.insert(
                    payment.id.clone(),
                    Payment {
                        id: payment.id,
                        user_id: payment.user_id,
                        customer_id: payment.customer_id,
                        provider: payment.provider.to_string(),
                        amount: payment.amount,
                        currency: payment.currency,
                        status: payment.status.as_str().to_string(),
                        raw: payment.raw,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn find_subscription(&self, id: &str) -> Result<Option<Subscription>, sqlx::Error> {
        Ok(self.subscriptions.lock().unwrap().get(id).cloned())
    }

    async fn upsert_subscription(&self, sub: SubscriptionUpsert) -> Result<(), sqlx::Error> {
        if self.fail_subscription_upsert {
            return Err(mock_failure());
        }
        let now = OffsetDateTime::now_utc();
        let mut subs = self.subscriptions.lock().unwrap();
        let previous = subs.get(&sub.id).cloned();
        subs.insert(
            sub.id.clone(),
            Subscription {
                id: sub.id,
                user_id: sub
                    .user_id
                    .or_else(|| previous.as_ref().and_then(|p| p.user_id.clone())),
                customer_id: sub
                    .customer_id
                    .or_else(|| previous.as_ref().and_then(|p| p.customer_id.clone())),
                provider: sub.provider.to_string(),
                product_id: sub
                    .product_id
                    .or_else(|| previous.as_ref().and_then(|p| p.product_id.clone())),
                status: sub.status.as_str().to_string(),
                next_bill_date: sub.next_bill_date,
                cancel_at: sub.cancel_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn find_active_subscription_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id.as_deref() == Some(user_id) && s.status().grants_access())
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn find_user_id_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let from_subs = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.customer_id.as_deref() == Some(customer_id))
            .find_map(|s| s.user_id.clone());
        if from_subs.is_some() {
            return Ok(from_subs);
        }
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.customer_id.as_deref() == Some(customer_id))
            .find_map(|p| p.user_id.clone()))
    }

    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<CheckoutSession, sqlx::Error> {
        let row = CheckoutSession {
            id: session.id,
            user_id: session.user_id,
            product_id: session.product_id,
            amount: session.amount,
            currency: session.currency,
            status: CHECKOUT_STATUS_CREATED.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.checkout_sessions
            .lock()
            .unwrap()
            .insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn complete_checkout_session(&self, id: &str) -> Result<bool, sqlx::Error> {
        match self.checkout_sessions.lock().unwrap().get_mut(id) {
            Some(session) => {
                session.status = CHECKOUT_STATUS_COMPLETED.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl InterviewRepository for MockDb {
    async fn create_interview(
        &self,
        id: &str,
        owner: &str,
        room_name: &str,
        credit_consumed: bool,
    ) -> Result<Interview, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        let interview = Interview {
            id: id.to_string(),
            owner: Some(owner.to_string()),
            transcript: None,
            analysis: None,
            status: INTERVIEW_STATUS_STARTED.to_string(),
            room_name: room_name.to_string(),
            audio_signed_url: None,
            video_signed_url: None,
            credit_consumed,
            created_at: now,
            updated_at: now,
        };
        self.interviews
            .lock()
            .unwrap()
            .insert(id.to_string(), interview.clone());
        Ok(interview)
    }

    async fn find_interview(&self, id: &str) -> Result<Option<Interview>, sqlx::Error> {
        Ok(self.interviews.lock().unwrap().get(id).cloned())
    }

    async fn count_interviews_since(
        &self,
        owner: &str,
        since: OffsetDateTime,
    ) -> Result<i64, sqlx::Error> {
        Ok(self
            .interviews
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.owner.as_deref() == Some(owner) && i.created_at >= since)
            .count() as i64)
    }

    async fn count_interviews(&self, owner: &str) -> Result<i64, sqlx::Error> {
        Ok(self
            .interviews
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.owner.as_deref() == Some(owner))
            .count() as i64)
    }

    async fn list_stale_started(
        &self,
        cutoff: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Interview>, sqlx::Error> {
        let mut stale: Vec<Interview> = self
            .interviews
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.status == INTERVIEW_STATUS_STARTED && i.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|i| i.created_at);
        stale.truncate(limit.max(0) as usize);
        Ok(stale)
    }

    async fn expire_if_started(&self, id: &str) -> Result<bool, sqlx::Error> {
        match self.interviews.lock().unwrap().get_mut(id) {
            Some(interview) if interview.status == INTERVIEW_STATUS_STARTED => {
                interview.status = INTERVIEW_STATUS_EXPIRED.to_string();
                interview.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn save_results(
        &self,
        id: &str,
        results: InterviewResults,
    ) -> Result<Option<Interview>, sqlx::Error> {
        let mut interviews = self.interviews.lock().unwrap();
        let Some(interview) = interviews.get_mut(id) else {
            return Ok(None);
        };
        if results.transcript.is_some() {
            interview.transcript = results.transcript;
        }
        if results.analysis.is_some() {
            interview.analysis = results.analysis;
        }
        if results.audio_signed_url.is_some() {
            interview.audio_signed_url = results.audio_signed_url;
        }
        if results.video_signed_url.is_some() {
            interview.video_signed_url = results.video_signed_url;
        }
        interview.status = INTERVIEW_STATUS_COMPLETED.to_string();
        interview.updated_at = OffsetDateTime::now_utc();
        Ok(Some(interview.clone()))
    }
}
