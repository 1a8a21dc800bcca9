//! SMS gateway adapter.
//!
//! POSTs `{phone, message}` as JSON with bearer auth to the configured endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use nrelay_core::{config::SmsConfig, domain::Channel, errors::Error, ports::ChannelSender, Result};

#[derive(Serialize)]
struct SmsPayload<'a> {
    phone: &'a str,
    message: &'a str,
}

#[derive(Clone, Debug)]
pub struct SmsSender {
    cfg: SmsConfig,
    http: reqwest::Client,
}

impl SmsSender {
    pub fn new(cfg: SmsConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("sms http client: {e}")))?;
        Ok(Self { cfg, http })
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<()> {
        if !self.cfg.enabled {
            return Err(Error::Delivery("SMS service disabled".to_string()));
        }
        if self.cfg.api_url.trim().is_empty() {
            return Err(Error::Delivery("SMS gateway URL not configured".to_string()));
        }

        let resp = self
            .http
            .post(&self.cfg.api_url)
            .bearer_auth(&self.cfg.api_token)
            .json(&SmsPayload {
                phone: recipient,
                message,
            })
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("sms request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Delivery(format!(
                "sms gateway returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(())
    }
}
