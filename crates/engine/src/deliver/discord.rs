//! Discord-style chat webhook destination. Single POST, no retry.

use log::debug;
use schema::{DiscordDestination, OutputRecord, Value};
use serde_json::{json, Value as Json};

use super::DeliveryResult;

const COLOR_BUY: u32 = 0x2ecc71;
const COLOR_SELL: u32 = 0xe74c3c;
const COLOR_NEUTRAL: u32 = 0x5865f2;

fn str_field<'a>(output: &'a OutputRecord, key: &str) -> Option<&'a str> {
    output.data.get(key).and_then(Value::as_str)
}

fn num_field(output: &OutputRecord, key: &str) -> Option<f64> {
    output.data.get(key).and_then(Value::as_f64)
}

fn shorten(s: &str) -> String {
    if s.chars().count() > 12 {
        let head: String = s.chars().take(4).collect();
        let tail: String = s.chars().skip(s.chars().count() - 4).collect();
        format!("{head}…{tail}")
    } else {
        s.to_string()
    }
}

/// Build the webhook payload: an embed for trade/migration-shaped outputs, a
/// generic embed otherwise, or plain text when embeds are disabled.
pub fn build_payload(config: &DiscordDestination, output: &OutputRecord) -> Json {
    let mut payload = match str_field(output, "type") {
        Some("trade") => trade_embed(output),
        Some("migration") => migration_embed(output),
        _ => generic_embed(output),
    };

    if !config.use_embeds {
        let text = payload["embeds"][0]["description"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let title = payload["embeds"][0]["title"].as_str().unwrap_or_default();
        payload = json!({ "content": format!("**{title}**\n{text}") });
    }

    if let Some(username) = &config.username {
        payload["username"] = json!(username);
    }
    payload
}

fn trade_embed(output: &OutputRecord) -> Json {
    let direction = str_field(output, "direction").unwrap_or("swap");
    let token = str_field(output, "token").unwrap_or("?");
    let color = match direction {
        "buy" => COLOR_BUY,
        "sell" => COLOR_SELL,
        _ => COLOR_NEUTRAL,
    };

    let mut fields = vec![json!({
        "name": "Trader",
        "value": shorten(str_field(output, "trader").unwrap_or("?")),
        "inline": true,
    })];
    if let Some(sol) = num_field(output, "solAmount") {
        fields.push(json!({"name": "SOL", "value": format!("{sol:.4}"), "inline": true}));
    }
    if let Some(tokens) = num_field(output, "tokenAmount") {
        fields.push(json!({"name": "Tokens", "value": format!("{tokens}"), "inline": true}));
    }
    if let Some(price) = num_field(output, "price") {
        fields.push(json!({"name": "Price", "value": format!("{price:.9}"), "inline": true}));
    }

    json!({
        "embeds": [{
            "title": format!("{} {}", direction.to_uppercase(), shorten(token)),
            "description": format!("`{}`", output.signature),
            "color": color,
            "fields": fields,
            "footer": {"text": output.program.as_str()},
        }]
    })
}

fn migration_embed(output: &OutputRecord) -> Json {
    let token = str_field(output, "token").unwrap_or("?");
    let mut fields = Vec::new();
    if let Some(pool) = str_field(output, "pool") {
        fields.push(json!({"name": "Pool", "value": shorten(pool), "inline": true}));
    }
    if let Some(raised) = num_field(output, "solRaised") {
        fields.push(json!({"name": "SOL raised", "value": format!("{raised:.2}"), "inline": true}));
    }

    json!({
        "embeds": [{
            "title": format!("Migration {}", shorten(token)),
            "description": format!("`{}`", output.signature),
            "color": COLOR_NEUTRAL,
            "fields": fields,
            "footer": {"text": output.program.as_str()},
        }]
    })
}

fn generic_embed(output: &OutputRecord) -> Json {
    let name = str_field(output, "eventName")
        .or_else(|| str_field(output, "name"))
        .unwrap_or("Event");
    let description = serde_json::to_string_pretty(&output.data)
        .map(|s| {
            if s.len() > 1800 {
                format!("{}…", &s[..1800])
            } else {
                s
            }
        })
        .unwrap_or_default();

    json!({
        "embeds": [{
            "title": name,
            "description": format!("```json\n{description}\n```"),
            "color": COLOR_NEUTRAL,
            "footer": {"text": output.program.as_str()},
        }]
    })
}

pub(crate) async fn send(
    http: &reqwest::Client,
    config: &DiscordDestination,
    output: &OutputRecord,
) -> DeliveryResult {
    let payload = build_payload(config, output);
    match http.post(&config.webhook_url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("discord delivered pipeline={}", output.pipeline_id);
            DeliveryResult::success("discord")
        }
        Ok(response) => {
            DeliveryResult::failure("discord", format!("status {}", response.status()))
        }
        Err(e) => DeliveryResult::failure("discord", format!("transport: {e}")),
    }
}
