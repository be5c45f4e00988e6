//! Pipeline definitions: filter, transform and destination models.
//!
//! These are the serde shapes the control plane upserts. Destination
//! credentials (bot tokens, webhook secrets) live inside the definition and
//! are carried opaquely; the core only uses them when calling that
//! destination.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::programs::ProgramId;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Active,
    Paused,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    /// Owning API key; opaque to the core.
    #[serde(default)]
    pub api_key: String,
    pub programs: Vec<ProgramId>,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub transform: Transform,
    pub destinations: Destinations,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Recursive declarative predicate. An empty filter matches everything;
/// convenience fields are AND-composed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filter {
    #[serde(rename = "$and", skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<Filter>>,
    #[serde(rename = "$or", skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<Filter>>,
    /// Event-name whitelist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_buy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sol_amount: Option<AmountRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_amount: Option<AmountRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<AccountsFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.and.is_none()
            && self.or.is_none()
            && self.instructions.is_none()
            && self.mints.is_none()
            && self.wallets.is_none()
            && self.is_buy.is_none()
            && self.sol_amount.is_none()
            && self.token_amount.is_none()
            && self.accounts.is_none()
            && self.conditions.is_none()
    }
}

/// Inclusive numeric range; SOL ranges are in whole SOL, token ranges in raw
/// base units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountsFilter {
    /// At least one must appear in the event's account set.
    pub include: Option<Vec<String>>,
    /// None may appear.
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Dotted path into the event (`data.sol_amount`, `source.type`).
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Trade,
    Transfer,
    Migration,
    #[default]
    Raw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Dotted source path into the event.
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transform {
    Template {
        #[serde(default)]
        name: TemplateKind,
    },
    Fields {
        fields: Vec<FieldMapping>,
    },
    /// Reserved escape hatch; the core treats it as pass-through.
    Code {
        #[serde(default)]
        code: String,
    },
}

impl Default for Transform {
    fn default() -> Self {
        Transform::Template {
            name: TemplateKind::Raw,
        }
    }
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Destinations {
    pub discord: Option<DiscordDestination>,
    pub telegram: Option<TelegramDestination>,
    pub webhook: Option<WebhookDestination>,
    pub websocket: Option<WebsocketDestination>,
}

impl Destinations {
    pub fn any_enabled(&self) -> bool {
        self.discord.as_ref().map(|d| d.enabled).unwrap_or(false)
            || self.telegram.as_ref().map(|d| d.enabled).unwrap_or(false)
            || self.webhook.as_ref().map(|d| d.enabled).unwrap_or(false)
            || self.websocket.as_ref().map(|d| d.enabled).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordDestination {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub webhook_url: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Embedded message vs plain text.
    #[serde(default = "default_true")]
    pub use_embeds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Markdown,
    Html,
    Plain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramDestination {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default)]
    pub format: MessageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDestination {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
    /// Caller-supplied headers, merged under the fixed set.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// HMAC-SHA256 signing secret; absent disables signing.
    #[serde(default)]
    pub secret: Option<String>,
    /// Header the signature is placed in.
    #[serde(default)]
    pub signature_header: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketDestination {
    #[serde(default = "default_true")]
    pub enabled: bool,
}
