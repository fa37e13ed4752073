use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const MAX_TEXT_RESPONSE_CHARS: usize = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Enumerates supported `ResponsePayload` values.
pub enum ResponsePayload {
    Text {
        text: String,
    },
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A candidate reply with a selection probability in `[0, 1]`.
pub struct Response {
    #[serde(flatten)]
    pub payload: ResponsePayload,
    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_probability() -> f64 {
    1.0
}

impl Response {
    pub fn response_type(&self) -> &'static str {
        match &self.payload {
            ResponsePayload::Text { .. } => "text",
            ResponsePayload::Image { .. } => "image",
            ResponsePayload::Sticker { .. } => "sticker",
        }
    }

    /// Human-readable summary for audit records, never the full payload.
    pub fn summary(&self) -> String {
        match &self.payload {
            ResponsePayload::Text { text } => text.clone(),
            ResponsePayload::Image {
                original_content_url,
                ..
            } => original_content_url.clone(),
            ResponsePayload::Sticker {
                package_id,
                sticker_id,
            } => format!("{package_id}:{sticker_id}"),
        }
    }

    pub fn to_reply_message(&self) -> ReplyMessage {
        match &self.payload {
            ResponsePayload::Text { text } => ReplyMessage::Text { text: text.clone() },
            ResponsePayload::Image {
                original_content_url,
                preview_image_url,
            } => ReplyMessage::Image {
                original_content_url: original_content_url.clone(),
                preview_image_url: preview_image_url.clone(),
            },
            ResponsePayload::Sticker {
                package_id,
                sticker_id,
            } => ReplyMessage::Sticker {
                package_id: package_id.clone(),
                sticker_id: sticker_id.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Outbound platform message object (camelCase wire fields).
pub enum ReplyMessage {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "originalContentUrl")]
        original_content_url: String,
        #[serde(rename = "previewImageUrl")]
        preview_image_url: String,
    },
    Sticker {
        #[serde(rename = "packageId")]
        package_id: String,
        #[serde(rename = "stickerId")]
        sticker_id: String,
    },
}

pub fn validate_response(response: &Response, label: &str) -> Result<()> {
    if !response.probability.is_finite()
        || response.probability < 0.0
        || response.probability > 1.0
    {
        bail!(
            "{label} response probability {} must be between 0 and 1",
            response.probability
        );
    }
    match &response.payload {
        ResponsePayload::Text { text } => {
            if text.trim().is_empty() {
                bail!("{label} text response cannot be empty");
            }
            if text.chars().count() > MAX_TEXT_RESPONSE_CHARS {
                bail!(
                    "{label} text response exceeds {} characters",
                    MAX_TEXT_RESPONSE_CHARS
                );
            }
            Ok(())
        }
        ResponsePayload::Image {
            original_content_url,
            preview_image_url,
        } => {
            validate_media_url(original_content_url, label, "original_content_url")?;
            validate_media_url(preview_image_url, label, "preview_image_url")
        }
        ResponsePayload::Sticker {
            package_id,
            sticker_id,
        } => {
            if package_id.trim().is_empty() {
                bail!("{label} sticker response has an empty package_id");
            }
            if sticker_id.trim().is_empty() {
                bail!("{label} sticker response has an empty sticker_id");
            }
            Ok(())
        }
    }
}

fn validate_media_url(url: &str, label: &str, field: &str) -> Result<()> {
    let trimmed = url.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://localhost")) {
        bail!("{label} image response has invalid {field} '{url}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_response(text: &str, probability: f64) -> Response {
        Response {
            payload: ResponsePayload::Text {
                text: text.to_string(),
            },
            probability,
        }
    }

    #[test]
    fn unit_summary_compresses_payloads_for_audit_records() {
        assert_eq!(text_response("hi there", 1.0).summary(), "hi there");
        let sticker = Response {
            payload: ResponsePayload::Sticker {
                package_id: "446".to_string(),
                sticker_id: "1988".to_string(),
            },
            probability: 1.0,
        };
        assert_eq!(sticker.summary(), "446:1988");
    }

    #[test]
    fn unit_validate_response_rejects_out_of_range_probability() {
        let error = validate_response(&text_response("hi", 1.5), "rule r-1")
            .expect_err("probability should fail");
        assert!(error.to_string().contains("between 0 and 1"));
    }

    #[test]
    fn unit_validate_response_rejects_non_https_image_url() {
        let response = Response {
            payload: ResponsePayload::Image {
                original_content_url: "ftp://example.com/a.png".to_string(),
                preview_image_url: "https://example.com/a-small.png".to_string(),
            },
            probability: 1.0,
        };
        let error = validate_response(&response, "rule r-1").expect_err("url should fail");
        assert!(error.to_string().contains("invalid original_content_url"));
    }

    #[test]
    fn functional_reply_message_serializes_platform_wire_fields() {
        let message = Response {
            payload: ResponsePayload::Image {
                original_content_url: "https://example.com/full.png".to_string(),
                preview_image_url: "https://example.com/small.png".to_string(),
            },
            probability: 1.0,
        }
        .to_reply_message();
        let encoded = serde_json::to_value(&message).expect("encode");
        assert_eq!(encoded["type"], "image");
        assert_eq!(encoded["originalContentUrl"], "https://example.com/full.png");
        assert_eq!(encoded["previewImageUrl"], "https://example.com/small.png");
    }

    #[test]
    fn regression_response_probability_defaults_to_one_when_omitted() {
        let decoded =
            serde_json::from_str::<Response>(r#"{"kind":"text","text":"hello"}"#).expect("decode");
        assert_eq!(decoded.probability, 1.0);
        assert_eq!(decoded.response_type(), "text");
    }
}
