//! SMS and voice calls through the Twilio REST API
//!
//! One request per action, no retry. The recipient is always the configured
//! owner phone.

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::error::ToolError;
use crate::config::TelephonyConfig;

const CALL_TWIML: &str = "<Response><Say>Hello, this is a test call!</Say></Response>";

#[derive(Deserialize)]
struct ResourceResponse {
    sid: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Credentials and numbers, all present
struct Account<'a> {
    sid: &'a str,
    token: &'a str,
    from: &'a str,
    to: &'a str,
}

pub struct TwilioClient {
    http: reqwest::Client,
    config: TelephonyConfig,
}

impl TwilioClient {
    pub fn new(config: TelephonyConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, config })
    }

    fn account(&self) -> Result<Account<'_>, ToolError> {
        fn present<'a>(
            value: &'a Option<String>,
            name: &'static str,
        ) -> Result<&'a str, ToolError> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .ok_or(ToolError::NotConfigured(name))
        }

        Ok(Account {
            sid: present(&self.config.account_sid, "Twilio account SID")?,
            token: present(&self.config.auth_token, "Twilio auth token")?,
            from: present(&self.config.from_number, "Twilio phone number")?,
            to: present(&self.config.to_number, "Recipient phone number")?,
        })
    }

    async fn create(&self, resource: &str, form: &[(&str, &str)]) -> Result<String, ToolError> {
        let account = self.account()?;
        let url = format!(
            "{}/2010-04-01/Accounts/{}/{}.json",
            self.config.endpoint.trim_end_matches('/'),
            account.sid,
            resource
        );

        let mut fields = vec![("From", account.from), ("To", account.to)];
        fields.extend_from_slice(form);

        let response = self
            .http
            .post(url)
            .basic_auth(account.sid, Some(account.token))
            .form(&fields)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            warn!("Twilio {} request failed with HTTP {}", resource, status.as_u16());
            return Err(ToolError::Upstream(format!(
                "Twilio returned HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let created: ResourceResponse = serde_json::from_str(&body)
            .map_err(|e| ToolError::Upstream(format!("Unexpected Twilio response: {}", e)))?;
        info!("Twilio {} created: {}", resource, created.sid);
        Ok(created.sid)
    }

    /// Send `body` as a text message; returns the message SID
    pub async fn send_sms(&self, body: &str) -> Result<String, ToolError> {
        if body.trim().is_empty() {
            return Err(ToolError::validation("Please enter the message."));
        }
        self.create("Messages", &[("Body", body)]).await
    }

    /// Place a call that reads a fixed greeting; returns the call SID
    pub async fn place_call(&self) -> Result<String, ToolError> {
        self.create("Calls", &[("Twiml", CALL_TWIML)]).await
    }
}
