//! Telegram-style bot push destination. Single POST to `sendMessage`, no
//! retry.

use log::debug;
use schema::{MessageFormat, OutputRecord, TelegramDestination, Value};
use serde_json::json;

use super::DeliveryResult;

fn str_field<'a>(output: &'a OutputRecord, key: &str) -> Option<&'a str> {
    output.data.get(key).and_then(Value::as_str)
}

fn num_field(output: &OutputRecord, key: &str) -> Option<f64> {
    output.data.get(key).and_then(Value::as_f64)
}

/// Render the message text in the requested style.
pub fn build_text(format: MessageFormat, output: &OutputRecord) -> String {
    let headline = match str_field(output, "type") {
        Some("trade") => {
            let direction = str_field(output, "direction").unwrap_or("swap");
            let token = str_field(output, "token").unwrap_or("?");
            let amount = num_field(output, "solAmount")
                .map(|sol| format!(" for {sol:.4} SOL"))
                .unwrap_or_default();
            format!("{} {}{}", direction.to_uppercase(), token, amount)
        }
        Some("migration") => {
            let token = str_field(output, "token").unwrap_or("?");
            format!("Migration completed: {token}")
        }
        _ => str_field(output, "eventName")
            .or_else(|| str_field(output, "name"))
            .unwrap_or("Event")
            .to_string(),
    };

    match format {
        MessageFormat::Markdown => format!("*{}*\n`{}`", headline, output.signature),
        MessageFormat::Html => format!("<b>{}</b>\n<code>{}</code>", headline, output.signature),
        MessageFormat::Plain => format!("{}\n{}", headline, output.signature),
    }
}

fn parse_mode(format: MessageFormat) -> Option<&'static str> {
    match format {
        MessageFormat::Markdown => Some("MarkdownV2"),
        MessageFormat::Html => Some("HTML"),
        MessageFormat::Plain => None,
    }
}

pub(crate) async fn send(
    http: &reqwest::Client,
    config: &TelegramDestination,
    output: &OutputRecord,
) -> DeliveryResult {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", config.bot_token);
    let mut body = json!({
        "chat_id": config.chat_id,
        "text": build_text(config.format, output),
        "disable_web_page_preview": true,
    });
    if let Some(mode) = parse_mode(config.format) {
        body["parse_mode"] = json!(mode);
    }

    match http.post(&url).json(&body).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("telegram delivered pipeline={}", output.pipeline_id);
            DeliveryResult::success("telegram")
        }
        Ok(response) => {
            DeliveryResult::failure("telegram", format!("status {}", response.status()))
        }
        Err(e) => DeliveryResult::failure("telegram", format!("transport: {e}")),
    }
}
