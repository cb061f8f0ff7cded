use crate::errors::*;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;

pub const MAX_FIELDS: usize = 25;
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4096;
pub const MAX_FIELD_NAME_LEN: usize = 256;
pub const MAX_FIELD_VALUE_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: &str, value: &str, inline: bool) -> Self {
        EmbedField {
            name: truncate(name, MAX_FIELD_NAME_LEN),
            value: truncate(value, MAX_FIELD_VALUE_LEN),
            inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Cut `text` to at most `max` characters, marking the cut with `…`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = text.chars().take(max.saturating_sub(1)).collect::<String>();
    out.push('…');
    out
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        message: &WebhookMessage,
        attachment: Option<&Attachment>,
    ) -> Result<()>;
}

pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to setup http client")?;
        Ok(DiscordWebhook {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(
        &self,
        message: &WebhookMessage,
        attachment: Option<&Attachment>,
    ) -> Result<()> {
        let req = self.client.post(&self.url);
        let req = if let Some(attachment) = attachment {
            debug!(
                "Sending webhook with attachment {:?} ({} bytes)",
                attachment.filename,
                attachment.data.len()
            );
            let payload = serde_json::to_string(message)?;
            let file = Part::bytes(attachment.data.clone())
                .file_name(attachment.filename.clone())
                .mime_str(attachment.content_type)?;
            let form = Form::new()
                .text("payload_json", payload)
                .part("files[0]", file);
            req.multipart(form)
        } else {
            req.json(message)
        };

        req.send()
            .await
            .context("Failed to send webhook request")?
            .error_for_status()
            .context("Webhook rejected the notification")?;

        Ok(())
    }
}

/// Print the payload instead of sending it
pub struct DryRun;

#[async_trait]
impl Notifier for DryRun {
    async fn notify(
        &self,
        message: &WebhookMessage,
        attachment: Option<&Attachment>,
    ) -> Result<()> {
        if let Some(attachment) = attachment {
            info!(
                "Would attach {:?} ({} bytes)",
                attachment.filename,
                attachment.data.len()
            );
        }
        let json = serde_json::to_string_pretty(message)?;
        println!("{}", json);
        Ok(())
    }
}
