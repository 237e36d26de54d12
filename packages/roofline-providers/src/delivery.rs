// std
use std::time::Duration as StdDuration;

// crates.io
use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

/// Hands one notification to the delivery gateway. Success means "accepted
/// for delivery", nothing stronger; the gateway owns the actual send.
pub async fn deliver(
	cfg: &roofline_config::DeliveryConfig,
	recipient_id: Uuid,
	subject: &str,
	body: &str,
	metadata: &Value,
) -> Result<()> {
	let client = Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let payload = serde_json::json!({
		"recipient_id": recipient_id,
		"subject": subject,
		"body": body,
		"metadata": metadata,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&payload)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	ensure_accepted(&json)
}

fn ensure_accepted(json: &Value) -> Result<()> {
	match json.get("status").and_then(Value::as_str) {
		Some("accepted" | "queued") => Ok(()),
		Some(other) => Err(eyre::eyre!("Delivery gateway rejected the message: {other}.")),
		None => Err(eyre::eyre!("Delivery gateway response is missing status.")),
	}
}
