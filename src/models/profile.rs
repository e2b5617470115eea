use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub credits: i32,
    pub pro: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub pro_expires_at: Option<OffsetDateTime>,
    pub is_admin: bool,
}

impl Profile {
    /// Pro counts only while `pro_expires_at` is unset or still ahead of `now`.
    pub fn has_active_pro(&self, now: OffsetDateTime) -> bool {
        self.pro && self.pro_expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

/// Entitlement columns written back by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProUpdate {
    pub pro: bool,
    pub pro_expires_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn profile(pro: bool, expires: Option<OffsetDateTime>) -> Profile {
        Profile {
            id: "u1".into(),
            email: None,
            credits: 0,
            pro,
            pro_expires_at: expires,
            is_admin: false,
        }
    }

    #[test]
    fn pro_without_expiry_is_unlimited() {
        assert!(profile(true, None).has_active_pro(OffsetDateTime::now_utc()));
    }

    #[test]
    fn lapsed_expiry_is_not_active_even_if_flag_is_set() {
        let now = OffsetDateTime::now_utc();
        assert!(!profile(true, Some(now - Duration::minutes(1))).has_active_pro(now));
        assert!(profile(true, Some(now + Duration::days(3))).has_active_pro(now));
        assert!(!profile(false, Some(now + Duration::days(3))).has_active_pro(now));
    }
}
