use std::{
    collections::{HashMap, HashSet},
    env,
    net::SocketAddr,
    str::FromStr,
    time::Duration,
};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// How incoming Paddle webhooks are authenticated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookVerification {
    /// Verify `paddle-signature` against this shared secret.
    Enforced(String),
    /// Explicitly opted out with `PADDLE_SKIP_SIGNATURE=true` (local/staging only).
    Disabled,
    /// No secret and no opt-out: every webhook is rejected.
    Unconfigured,
}

#[derive(Clone, Debug)]
pub struct PaddleSettings {
    pub verification: WebhookVerification,
    /// Maximum accepted distance between the signature timestamp and now.
    pub signature_tolerance: Option<Duration>,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

/// Paddle product and price ids that grant something when bought outside a
/// subscription. Ids not listed here grant nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    pub pro: HashSet<String>,
    /// Credits per unit of each pack.
    pub credit_packs: HashMap<String, i32>,
}

impl ProductCatalog {
    pub fn credits_for(&self, id: &str) -> Option<i32> {
        self.credit_packs.get(id).copied()
    }

    pub fn is_pro(&self, id: &str) -> bool {
        self.pro.contains(id)
    }

    pub fn knows(&self, id: &str) -> bool {
        self.is_pro(id) || self.credit_packs.contains_key(id)
    }
}

#[derive(Clone, Debug)]
pub struct EntitlementSettings {
    pub pro_duration_days: i64,
    pub past_due_grace_days: i64,
    pub catalog: ProductCatalog,
}

#[derive(Clone, Debug)]
pub struct LimitSettings {
    pub max_interviews_free: i64,
    pub max_interviews_subscribed_monthly: i64,
    pub credit_refund_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct LiveKitSettings {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    pub token_ttl_secs: i64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origin: String,
    pub supabase_jwt_secret: String,
    pub jwt_audience: String,
    pub paddle: PaddleSettings,
    pub entitlements: EntitlementSettings,
    pub limits: LimitSettings,
    pub livekit: Option<LiveKitSettings>,
    pub cron_secret: Option<String>,
    pub agent_api_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let supabase_jwt_secret =
            get("SUPABASE_JWT_SECRET").ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?;

        let skip_signature = parse_or(&get, "PADDLE_SKIP_SIGNATURE", false)?;
        let verification = match get("PADDLE_WEBHOOK_SECRET") {
            Some(secret) => WebhookVerification::Enforced(secret),
            None if skip_signature => WebhookVerification::Disabled,
            None => WebhookVerification::Unconfigured,
        };
        let signature_tolerance = match get("PADDLE_WEBHOOK_TOLERANCE_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_value(
                "PADDLE_WEBHOOK_TOLERANCE_SECS",
                &raw,
            )?)),
            None => None,
        };

        let paddle = PaddleSettings {
            verification,
            signature_tolerance,
            api_key: get("PADDLE_API_KEY"),
            api_base_url: get("PADDLE_API_BASE_URL")
                .unwrap_or_else(|| "https://api.paddle.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(parse_or(&get, "PADDLE_HTTP_TIMEOUT_SECS", 20)?),
            max_retries: parse_or(&get, "PADDLE_HTTP_RETRIES", 2)?,
            retry_backoff: Duration::from_millis(parse_or(&get, "PADDLE_HTTP_BACKOFF_MS", 200)?),
        };

        let entitlements = EntitlementSettings {
            pro_duration_days: parse_or(&get, "DURATION_DAYS", 30)?,
            past_due_grace_days: parse_or(&get, "PAST_DUE_GRACE_DAYS", 7)?,
            catalog: ProductCatalog {
                pro: get("PADDLE_PRO_PRODUCTS")
                    .map(|raw| parse_id_list(&raw))
                    .unwrap_or_default(),
                credit_packs: match get("PADDLE_CREDIT_PACKS") {
                    Some(raw) => parse_credit_packs(&raw)?,
                    None => HashMap::new(),
                },
            },
        };

        let limits = LimitSettings {
            max_interviews_free: parse_or(&get, "MAX_INTERVIEWS_FREE", 3)?,
            max_interviews_subscribed_monthly: parse_or(
                &get,
                "MAX_INTERVIEWS_SUBSCRIBED_MONTHLY",
                30,
            )?,
            credit_refund_minutes: parse_or(&get, "CREDIT_REFUND_MINUTES", 15)?,
        };

        let livekit = match (
            get("LIVEKIT_URL"),
            get("LIVEKIT_API_KEY"),
            get("LIVEKIT_API_SECRET"),
        ) {
            (Some(url), Some(api_key), Some(api_secret)) => Some(LiveKitSettings {
                url,
                api_key,
                api_secret,
                token_ttl_secs: parse_or(&get, "LIVEKIT_TOKEN_TTL_SECS", 3600)?,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            bind_addr: parse_or(
                &get,
                "BIND_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
            frontend_origin: get("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            supabase_jwt_secret,
            jwt_audience: get("JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string()),
            paddle,
            entitlements,
            limits,
            livekit,
            cron_secret: get("CRON_SECRET"),
            agent_api_secret: get("AGENT_API_SECRET"),
        })
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn parse_id_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// `pri_a=5,pri_b=20`: id and credits per unit, credits strictly positive.
fn parse_credit_packs(raw: &str) -> Result<HashMap<String, i32>, ConfigError> {
    let mut packs = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || ConfigError::Invalid {
            name: "PADDLE_CREDIT_PACKS",
            value: entry.to_string(),
        };
        let (id, credits) = entry.split_once('=').ok_or_else(invalid)?;
        let id = id.trim();
        let credits: i32 = credits.trim().parse().map_err(|_| invalid())?;
        if id.is_empty() || credits <= 0 {
            return Err(invalid());
        }
        packs.insert(id.to_string(), credits);
    }
    Ok(packs)
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}
