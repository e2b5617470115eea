//! Paddle webhook payloads.
//!
//! Two API generations deliver webhooks to the same endpoint: Paddle Billing
//! (`event_type` + nested `data`) and Paddle Classic (`alert_name` + flat
//! fields). Both are parsed into [`PaymentEvent`] and normalized into a single
//! [`NormalizedEvent`] so the reconciler never touches raw JSON.

use serde_json::{Map, Value};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};

use crate::models::subscription::SubscriptionStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Billing {
        event_id: Option<String>,
        event_type: String,
        data: Value,
    },
    Classic {
        alert_id: Option<String>,
        alert_name: String,
        fields: Map<String, Value>,
    },
    Unknown(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TransactionCompleted,
    TransactionPaid,
    PaymentFailed,
    Refunded,
    SubscriptionChanged,
    Unhandled,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TransactionCompleted => "transaction_completed",
            EventKind::TransactionPaid => "transaction_paid",
            EventKind::PaymentFailed => "payment_failed",
            EventKind::Refunded => "refunded",
            EventKind::SubscriptionChanged => "subscription_changed",
            EventKind::Unhandled => "unhandled",
        }
    }
}

/// One line of a transaction. `ids` holds every catalog key the line carries
/// (price id, product id), so either can be configured as a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub ids: Vec<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub event_id: Option<String>,
    pub event_type: String,
    pub kind: EventKind,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub transaction_id: Option<String>,
    pub product_id: Option<String>,
    /// Minor currency units.
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub next_bill_date: Option<OffsetDateTime>,
    pub cancel_at: Option<OffsetDateTime>,
    pub billing_period_end: Option<OffsetDateTime>,
    pub items: Vec<LineItem>,
    pub checkout_session_id: Option<String>,
}

impl NormalizedEvent {
    fn empty(event_id: Option<String>, event_type: String, kind: EventKind) -> Self {
        Self {
            event_id,
            event_type,
            kind,
            user_id: None,
            customer_id: None,
            subscription_id: None,
            transaction_id: None,
            product_id: None,
            amount: None,
            currency: None,
            subscription_status: None,
            next_bill_date: None,
            cancel_at: None,
            billing_period_end: None,
            items: Vec::new(),
            checkout_session_id: None,
        }
    }

    fn apply_custom_data(&mut self, custom: CustomData) {
        if self.user_id.is_none() {
            self.user_id = custom.user_id;
        }
        if self.checkout_session_id.is_none() {
            self.checkout_session_id = custom.checkout_session_id;
        }
    }
}

impl PaymentEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        if let Some(event_type) = extract_str(&value, &["event_type"]) {
            return PaymentEvent::Billing {
                event_id: extract_string(&value, &["event_id"])
                    .or_else(|| extract_string(&value, &["notification_id"])),
                event_type: event_type.to_string(),
                data: value.get("data").cloned().unwrap_or(Value::Null),
            };
        }
        if let Some(alert_name) = extract_str(&value, &["alert_name"]) {
            let alert_name = alert_name.to_string();
            let alert_id = extract_string(&value, &["alert_id"]);
            if let Value::Object(fields) = value {
                return PaymentEvent::Classic {
                    alert_id,
                    alert_name,
                    fields,
                };
            }
        }
        PaymentEvent::Unknown(value)
    }

    pub fn event_type(&self) -> &str {
        match self {
            PaymentEvent::Billing { event_type, .. } => event_type,
            PaymentEvent::Classic { alert_name, .. } => alert_name,
            PaymentEvent::Unknown(_) => "unknown",
        }
    }

    pub fn normalize(&self) -> NormalizedEvent {
        match self {
            PaymentEvent::Billing {
                event_id,
                event_type,
                data,
            } => normalize_billing(event_id.clone(), event_type, data),
            PaymentEvent::Classic {
                alert_id,
                alert_name,
                fields,
            } => normalize_classic(alert_id.clone(), alert_name, fields),
            PaymentEvent::Unknown(_) => {
                NormalizedEvent::empty(None, "unknown".to_string(), EventKind::Unhandled)
            }
        }
    }
}

fn billing_kind(event_type: &str, data: &Value) -> EventKind {
    match event_type {
        "transaction.completed" => EventKind::TransactionCompleted,
        "transaction.paid" => EventKind::TransactionPaid,
        "transaction.payment_failed" => EventKind::PaymentFailed,
        "adjustment.created" | "adjustment.updated" => {
            let action = extract_str(data, &["action"]).unwrap_or_default();
            let status = extract_str(data, &["status"]).unwrap_or_default();
            if action == "refund" && status == "approved" {
                EventKind::Refunded
            } else {
                EventKind::Unhandled
            }
        }
        "subscription.created"
        | "subscription.activated"
        | "subscription.updated"
        | "subscription.resumed"
        | "subscription.past_due"
        | "subscription.paused"
        | "subscription.canceled"
        | "subscription.trialing" => EventKind::SubscriptionChanged,
        _ => EventKind::Unhandled,
    }
}

fn normalize_billing(event_id: Option<String>, event_type: &str, data: &Value) -> NormalizedEvent {
    let kind = billing_kind(event_type, data);
    let mut event = NormalizedEvent::empty(event_id, event_type.to_string(), kind);
    event.customer_id = extract_string(data, &["customer_id"]);
    event.currency = extract_string(data, &["currency_code"]);

    match kind {
        EventKind::TransactionCompleted | EventKind::TransactionPaid | EventKind::PaymentFailed => {
            event.transaction_id = extract_string(data, &["id"]);
            event.subscription_id = extract_string(data, &["subscription_id"]);
            event.amount = jget(data, &["details", "totals", "total"]).and_then(minor_units);
            event.product_id = first_item_product(data);
            event.items = billing_items(data);
            event.billing_period_end = extract_timestamp(data, &["billing_period", "ends_at"]);
            event.apply_custom_data(CustomData::from_value(data.get("custom_data")));
        }
        EventKind::Refunded => {
            event.transaction_id = extract_string(data, &["transaction_id"]);
            event.subscription_id = extract_string(data, &["subscription_id"]);
            event.amount = jget(data, &["totals", "total"]).and_then(minor_units);
            event.apply_custom_data(CustomData::from_value(data.get("custom_data")));
        }
        EventKind::SubscriptionChanged => {
            event.subscription_id = extract_string(data, &["id"]);
            event.subscription_status = extract_str(data, &["status"])
                .map(SubscriptionStatus::parse)
                .or_else(|| status_from_event_type(event_type));
            event.next_bill_date = extract_timestamp(data, &["next_billed_at"]);
            event.cancel_at = match extract_str(data, &["scheduled_change", "action"]) {
                Some("cancel") => extract_timestamp(data, &["scheduled_change", "effective_at"]),
                _ => extract_timestamp(data, &["cancel_at"]),
            };
            event.billing_period_end =
                extract_timestamp(data, &["current_billing_period", "ends_at"]);
            event.product_id = first_item_product(data);
            event.apply_custom_data(CustomData::from_value(data.get("custom_data")));
        }
        EventKind::Unhandled => {
            event.apply_custom_data(CustomData::from_value(data.get("custom_data")));
        }
    }

    event.apply_custom_data(CustomData::from_value(jget(data, &["transaction", "custom_data"])));
    event
}

fn status_from_event_type(event_type: &str) -> Option<SubscriptionStatus> {
    match event_type {
        "subscription.activated" | "subscription.resumed" => Some(SubscriptionStatus::Active),
        "subscription.trialing" => Some(SubscriptionStatus::Trialing),
        "subscription.past_due" => Some(SubscriptionStatus::PastDue),
        "subscription.paused" => Some(SubscriptionStatus::Paused),
        "subscription.canceled" => Some(SubscriptionStatus::Canceled),
        _ => None,
    }
}

fn first_item_product(data: &Value) -> Option<String> {
    let item = data.get("items")?.as_array()?.first()?;
    extract_string(item, &["price", "product_id"])
        .or_else(|| extract_string(item, &["product_id"]))
        .or_else(|| extract_string(item, &["price_id"]))
}

const ITEM_ID_PATHS: [&[&str]; 4] = [
    &["price", "id"],
    &["price_id"],
    &["price", "product_id"],
    &["product_id"],
];

fn billing_items(data: &Value) -> Vec<LineItem> {
    let Some(items) = data.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let ids: Vec<String> = ITEM_ID_PATHS
                .iter()
                .filter_map(|path| extract_string(item, path))
                .collect();
            (!ids.is_empty()).then(|| LineItem {
                ids,
                quantity: quantity(item.get("quantity")),
            })
        })
        .collect()
}

fn quantity(value: Option<&Value>) -> i32 {
    value
        .and_then(value_to_i64)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

fn classic_kind(alert_name: &str) -> EventKind {
    match alert_name {
        "payment_succeeded" | "subscription_payment_succeeded" => EventKind::TransactionCompleted,
        "subscription_payment_failed" => EventKind::PaymentFailed,
        "payment_refunded" | "subscription_payment_refunded" => EventKind::Refunded,
        "subscription_created" | "subscription_updated" | "subscription_cancelled" => {
            EventKind::SubscriptionChanged
        }
        _ => EventKind::Unhandled,
    }
}

fn normalize_classic(
    alert_id: Option<String>,
    alert_name: &str,
    fields: &Map<String, Value>,
) -> NormalizedEvent {
    let kind = classic_kind(alert_name);
    let mut event = NormalizedEvent::empty(alert_id, alert_name.to_string(), kind);
    let field = |name: &str| fields.get(name).and_then(value_to_string);

    // Classic's `user_id` is Paddle's customer id, not ours.
    event.customer_id = field("user_id");
    event.subscription_id = field("subscription_id");
    event.transaction_id = field("order_id");
    event.currency = field("currency").or_else(|| field("balance_currency"));
    event.product_id = field("subscription_plan_id").or_else(|| field("product_id"));
    if let Some(id) = field("product_id") {
        event.items.push(LineItem {
            ids: vec![id],
            quantity: quantity(fields.get("quantity")),
        });
    }
    event.next_bill_date = fields.get("next_bill_date").and_then(parse_timestamp_value);

    match kind {
        EventKind::Refunded => {
            event.amount = fields.get("gross_refund").and_then(decimal_minor_units);
        }
        EventKind::SubscriptionChanged => {
            event.subscription_status = field("status")
                .map(|s| SubscriptionStatus::parse(&s))
                .or_else(|| {
                    (alert_name == "subscription_cancelled").then_some(SubscriptionStatus::Canceled)
                });
            event.cancel_at = fields
                .get("cancellation_effective_date")
                .and_then(parse_timestamp_value);
        }
        _ => {
            event.amount = fields.get("sale_gross").and_then(decimal_minor_units);
        }
    }

    event.apply_custom_data(CustomData::from_passthrough(fields.get("passthrough")));
    event
}

/// Fields the checkout attaches to a transaction so it can be tied back to a
/// profile. The buyer controls these, so nothing here decides what was bought.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CustomData {
    pub user_id: Option<String>,
    pub checkout_session_id: Option<String>,
}

impl CustomData {
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value.filter(|v| v.is_object()) else {
            return Self::default();
        };
        Self {
            user_id: extract_string(value, &["userId"])
                .or_else(|| extract_string(value, &["user_id"])),
            checkout_session_id: extract_string(value, &["checkoutSessionId"])
                .or_else(|| extract_string(value, &["checkout_session_id"])),
        }
    }

    /// Classic `passthrough` is either a JSON object encoded as a string or a
    /// bare user id.
    pub fn from_passthrough(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(raw)) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Self::default();
                }
                match serde_json::from_str::<Value>(raw) {
                    Ok(parsed @ Value::Object(_)) => Self::from_value(Some(&parsed)),
                    _ => Self {
                        user_id: Some(raw.to_string()),
                        ..Self::default()
                    },
                }
            }
            Some(obj @ Value::Object(_)) => Self::from_value(Some(obj)),
            _ => Self::default(),
        }
    }
}

fn jget<'a>(val: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = val;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

fn extract_str<'a>(val: &'a Value, path: &[&str]) -> Option<&'a str> {
    jget(val, path)?.as_str()
}

fn extract_string(val: &Value, path: &[&str]) -> Option<String> {
    jget(val, path).and_then(value_to_string)
}

fn extract_timestamp(val: &Value, path: &[&str]) -> Option<OffsetDateTime> {
    jget(val, path).and_then(parse_timestamp_value)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Billing totals are already minor units, usually as a string.
fn minor_units(value: &Value) -> Option<i64> {
    value_to_i64(value)
}

/// Classic amounts are decimal strings such as `"12.50"`.
fn decimal_minor_units(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_decimal_minor(s),
        Value::Number(n) => n.as_f64().map(|f| (f * 100.0).round() as i64),
        _ => None,
    }
}

pub fn parse_decimal_minor(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut cents: i64 = 0;
    for (i, b) in fraction.bytes().take(2).enumerate() {
        cents += i64::from(b - b'0') * if i == 0 { 10 } else { 1 };
    }
    // Round half up on the third decimal.
    if fraction.len() > 2 && fraction.as_bytes()[2] >= b'5' {
        cents += 1;
    }
    let total = whole.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -total } else { total })
}

fn parse_timestamp_value(value: &Value) -> Option<OffsetDateTime> {
    value.as_str().and_then(parse_timestamp)
}

/// RFC 3339, or Classic's `YYYY-MM-DD[ HH:MM:SS]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(ts.assume_utc());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn normalize(value: Value) -> NormalizedEvent {
        PaymentEvent::from_value(value).normalize()
    }

    #[test]
    fn billing_transaction_completed() {
        let event = normalize(json!({
            "event_id": "evt_01",
            "event_type": "transaction.completed",
            "data": {
                "id": "txn_01",
                "customer_id": "ctm_01",
                "subscription_id": null,
                "currency_code": "USD",
                "custom_data": { "userId": "u1", "checkoutSessionId": "cs_1" },
                "items": [{ "price": { "id": "pri_1", "product_id": "pro_1" }, "quantity": 1 }],
                "details": { "totals": { "total": "1999" } },
                "billing_period": {
                    "starts_at": "2024-05-01T00:00:00Z",
                    "ends_at": "2024-06-01T00:00:00.123456Z"
                }
            }
        }));
        assert_eq!(event.kind, EventKind::TransactionCompleted);
        assert_eq!(event.event_id.as_deref(), Some("evt_01"));
        assert_eq!(event.transaction_id.as_deref(), Some("txn_01"));
        assert_eq!(event.user_id.as_deref(), Some("u1"));
        assert_eq!(event.customer_id.as_deref(), Some("ctm_01"));
        assert_eq!(event.subscription_id, None);
        assert_eq!(event.amount, Some(1999));
        assert_eq!(event.currency.as_deref(), Some("USD"));
        assert_eq!(event.product_id.as_deref(), Some("pro_1"));
        assert_eq!(
            event.items,
            vec![LineItem {
                ids: vec!["pri_1".into(), "pro_1".into()],
                quantity: 1,
            }]
        );
        assert_eq!(event.checkout_session_id.as_deref(), Some("cs_1"));
        assert_eq!(
            event.billing_period_end,
            Some(datetime!(2024-06-01 00:00:00.123456 UTC))
        );
    }

    #[test]
    fn line_items_keep_quantity_and_skip_id_less_entries() {
        let event = normalize(json!({
            "event_type": "transaction.completed",
            "data": {
                "id": "txn_2",
                "custom_data": { "user_id": "u2", "credits": "5000" },
                "items": [
                    { "price_id": "pri_pack", "quantity": 3 },
                    { "quantity": 2 },
                    { "product_id": "pro_x", "quantity": "0" }
                ]
            }
        }));
        assert_eq!(event.user_id.as_deref(), Some("u2"));
        assert_eq!(
            event.items,
            vec![
                LineItem {
                    ids: vec!["pri_pack".into()],
                    quantity: 3,
                },
                LineItem {
                    ids: vec!["pro_x".into()],
                    quantity: 1,
                },
            ]
        );
    }

    #[test]
    fn billing_subscription_with_scheduled_cancel() {
        let event = normalize(json!({
            "event_id": "evt_sub",
            "event_type": "subscription.updated",
            "data": {
                "id": "sub_1",
                "status": "active",
                "customer_id": "ctm_1",
                "next_billed_at": "2024-07-01T10:00:00Z",
                "scheduled_change": { "action": "cancel", "effective_at": "2024-07-01T10:00:00Z" },
                "custom_data": { "userId": "u1" }
            }
        }));
        assert_eq!(event.kind, EventKind::SubscriptionChanged);
        assert_eq!(event.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(event.subscription_status, Some(SubscriptionStatus::Active));
        assert_eq!(event.cancel_at, Some(datetime!(2024-07-01 10:00:00 UTC)));
        assert_eq!(event.next_bill_date, Some(datetime!(2024-07-01 10:00:00 UTC)));
    }

    #[test]
    fn scheduled_pause_is_not_a_cancel_date() {
        let event = normalize(json!({
            "event_type": "subscription.updated",
            "data": {
                "id": "sub_1",
                "status": "active",
                "scheduled_change": { "action": "pause", "effective_at": "2024-07-01T10:00:00Z" }
            }
        }));
        assert_eq!(event.cancel_at, None);
    }

    #[test]
    fn subscription_status_falls_back_to_event_name() {
        let event = normalize(json!({
            "event_type": "subscription.canceled",
            "data": { "id": "sub_9" }
        }));
        assert_eq!(event.subscription_status, Some(SubscriptionStatus::Canceled));
    }

    #[test]
    fn refund_adjustment_requires_approval() {
        let approved = normalize(json!({
            "event_type": "adjustment.updated",
            "data": {
                "action": "refund",
                "status": "approved",
                "transaction_id": "txn_01",
                "totals": { "total": "1999" },
                "transaction": { "custom_data": { "userId": "u1" } }
            }
        }));
        assert_eq!(approved.kind, EventKind::Refunded);
        assert_eq!(approved.transaction_id.as_deref(), Some("txn_01"));
        assert_eq!(approved.user_id.as_deref(), Some("u1"));

        let pending = normalize(json!({
            "event_type": "adjustment.created",
            "data": { "action": "refund", "status": "pending_approval", "transaction_id": "txn_01" }
        }));
        assert_eq!(pending.kind, EventKind::Unhandled);

        let credit = normalize(json!({
            "event_type": "adjustment.created",
            "data": { "action": "credit", "status": "approved" }
        }));
        assert_eq!(credit.kind, EventKind::Unhandled);
    }

    #[test]
    fn classic_payment_succeeded_with_json_passthrough() {
        let event = normalize(json!({
            "alert_name": "payment_succeeded",
            "alert_id": 123456,
            "order_id": "ord_9",
            "user_id": "paddle_user_7",
            "sale_gross": "12.50",
            "currency": "EUR",
            "product_id": 552,
            "quantity": "2",
            "passthrough": "{\"userId\":\"u3\",\"credits\":10}"
        }));
        assert_eq!(event.kind, EventKind::TransactionCompleted);
        assert_eq!(event.event_id.as_deref(), Some("123456"));
        assert_eq!(event.transaction_id.as_deref(), Some("ord_9"));
        assert_eq!(event.customer_id.as_deref(), Some("paddle_user_7"));
        assert_eq!(event.user_id.as_deref(), Some("u3"));
        assert_eq!(event.amount, Some(1250));
        assert_eq!(
            event.items,
            vec![LineItem {
                ids: vec!["552".into()],
                quantity: 2,
            }]
        );
    }

    #[test]
    fn classic_plain_passthrough_is_the_user_id() {
        let event = normalize(json!({
            "alert_name": "subscription_created",
            "subscription_id": "42",
            "status": "active",
            "next_bill_date": "2024-08-15",
            "passthrough": "u4"
        }));
        assert_eq!(event.user_id.as_deref(), Some("u4"));
        assert_eq!(event.subscription_status, Some(SubscriptionStatus::Active));
        assert_eq!(event.next_bill_date, Some(datetime!(2024-08-15 00:00:00 UTC)));
    }

    #[test]
    fn classic_cancellation_maps_deleted_status() {
        let event = normalize(json!({
            "alert_name": "subscription_cancelled",
            "subscription_id": "42",
            "status": "deleted",
            "cancellation_effective_date": "2024-09-01 12:30:00"
        }));
        assert_eq!(event.kind, EventKind::SubscriptionChanged);
        assert_eq!(event.subscription_status, Some(SubscriptionStatus::Canceled));
        assert_eq!(event.cancel_at, Some(datetime!(2024-09-01 12:30:00 UTC)));
    }

    #[test]
    fn classic_refund_uses_gross_refund() {
        let event = normalize(json!({
            "alert_name": "payment_refunded",
            "order_id": "ord_9",
            "gross_refund": "7.5"
        }));
        assert_eq!(event.kind, EventKind::Refunded);
        assert_eq!(event.amount, Some(750));
    }

    #[test]
    fn unknown_payloads_are_unhandled() {
        assert_eq!(normalize(json!({ "hello": "world" })).kind, EventKind::Unhandled);
        assert_eq!(
            normalize(json!({ "event_type": "customer.created", "data": {} })).kind,
            EventKind::Unhandled
        );
        assert!(PaymentEvent::parse(b"not json").is_err());
    }

    #[test]
    fn missing_fields_never_fail() {
        let event = normalize(json!({ "event_type": "transaction.completed" }));
        assert_eq!(event.kind, EventKind::TransactionCompleted);
        assert_eq!(event.transaction_id, None);
        assert_eq!(event.amount, None);
        assert_eq!(event.user_id, None);
    }

    #[test]
    fn decimal_amounts() {
        assert_eq!(parse_decimal_minor("10"), Some(1000));
        assert_eq!(parse_decimal_minor("0.99"), Some(99));
        assert_eq!(parse_decimal_minor("1.005"), Some(101));
        assert_eq!(parse_decimal_minor("-3.20"), Some(-320));
        assert_eq!(parse_decimal_minor("abc"), None);
        assert_eq!(parse_decimal_minor("."), None);
    }
}
