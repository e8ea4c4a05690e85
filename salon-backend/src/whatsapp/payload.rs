//! Webhook payload shapes and per-type content extraction

use serde::Deserialize;

use crate::payments::signature::{verify_hex_digest, SignatureError};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Metadata {
    pub display_phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<Text>,
    #[serde(default)]
    pub image: Option<Media>,
    #[serde(default)]
    pub audio: Option<Media>,
    #[serde(default)]
    pub video: Option<Media>,
    #[serde(default)]
    pub document: Option<Media>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub interactive: Option<Interactive>,
    #[serde(default)]
    pub button: Option<Button>,
    #[serde(default)]
    pub reaction: Option<Reaction>,
}

#[derive(Debug, Deserialize)]
pub struct Text {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Interactive {
    #[serde(rename = "type")]
    pub interactive_type: String,
    #[serde(default)]
    pub button_reply: Option<Reply>,
    #[serde(default)]
    pub list_reply: Option<Reply>,
}

#[derive(Debug, Deserialize)]
pub struct Reply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct Button {
    #[serde(default)]
    pub payload: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

impl InboundMessage {
    /// Types whose content is something the customer typed or picked
    pub fn is_textual(&self) -> bool {
        matches!(self.message_type.as_str(), "text" | "interactive" | "button")
    }
}

fn media_content(kind: &str, media: Option<&Media>) -> String {
    media
        .and_then(|m| m.caption.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("[{}]", kind))
}

/// Human-readable content of an inbound message
pub fn extract_message_content(message: &InboundMessage) -> String {
    match message.message_type.as_str() {
        "text" => message.text.as_ref().map(|t| t.body.clone()).unwrap_or_default(),
        "interactive" => message
            .interactive
            .as_ref()
            .and_then(|i| match i.interactive_type.as_str() {
                "button_reply" => i.button_reply.as_ref(),
                "list_reply" => i.list_reply.as_ref(),
                _ => i.button_reply.as_ref().or(i.list_reply.as_ref()),
            })
            .map(|reply| reply.title.clone())
            .unwrap_or_default(),
        "button" => message.button.as_ref().map(|b| b.text.clone()).unwrap_or_default(),
        "image" => media_content("image", message.image.as_ref()),
        "document" => media_content("document", message.document.as_ref()),
        "video" => media_content("video", message.video.as_ref()),
        "audio" => "[audio]".to_string(),
        "location" => match &message.location {
            Some(loc) => format!(
                "{} ({}, {})",
                loc.name.as_deref().unwrap_or("Location"),
                loc.latitude,
                loc.longitude
            ),
            None => "[location]".to_string(),
        },
        "reaction" => message
            .reaction
            .as_ref()
            .and_then(|r| r.emoji.clone())
            .unwrap_or_default(),
        other => format!("[{} message]", other),
    }
}

/// Check `X-Hub-Signature-256: sha256=<hex>` against the raw request body
pub fn verify_hub_signature(secret: &str, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::MissingHeader)?;
    let digest = header
        .trim()
        .strip_prefix("sha256=")
        .ok_or(SignatureError::Malformed)?;
    verify_hex_digest(secret, body, digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::signature::sign;
    use serde_json::json;

    fn message(value: serde_json::Value) -> InboundMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_and_interactive_content() {
        let text = message(json!({"id": "wamid.1", "from": "57300", "type": "text", "text": {"body": "Hola"}}));
        assert_eq!(extract_message_content(&text), "Hola");
        assert!(text.is_textual());

        let list = message(json!({
            "id": "wamid.2", "from": "57300", "type": "interactive",
            "interactive": {"type": "list_reply", "list_reply": {"id": "svc_1", "title": "Manicure"}}
        }));
        assert_eq!(extract_message_content(&list), "Manicure");

        let button = message(json!({
            "id": "wamid.3", "from": "57300", "type": "button",
            "button": {"payload": "CONFIRM", "text": "Confirmar"}
        }));
        assert_eq!(extract_message_content(&button), "Confirmar");
    }

    #[test]
    fn test_media_and_location_content() {
        let captioned = message(json!({
            "id": "wamid.4", "from": "57300", "type": "image",
            "image": {"id": "m1", "caption": "Este color"}
        }));
        assert_eq!(extract_message_content(&captioned), "Este color");

        let bare = message(json!({"id": "wamid.5", "from": "57300", "type": "document", "document": {"id": "m2"}}));
        assert_eq!(extract_message_content(&bare), "[document]");

        let audio = message(json!({"id": "wamid.6", "from": "57300", "type": "audio", "audio": {"id": "m3"}}));
        assert_eq!(extract_message_content(&audio), "[audio]");
        assert!(!audio.is_textual());

        let location = message(json!({
            "id": "wamid.7", "from": "57300", "type": "location",
            "location": {"latitude": 4.6, "longitude": -74.08, "name": "Glow Centro"}
        }));
        assert_eq!(extract_message_content(&location), "Glow Centro (4.6, -74.08)");
    }

    #[test]
    fn test_reaction_and_unknown_types() {
        let reaction = message(json!({
            "id": "wamid.8", "from": "57300", "type": "reaction",
            "reaction": {"message_id": "wamid.1", "emoji": "👍"}
        }));
        assert_eq!(extract_message_content(&reaction), "👍");

        let sticker = message(json!({"id": "wamid.9", "from": "57300", "type": "sticker"}));
        assert_eq!(extract_message_content(&sticker), "[sticker message]");
    }

    #[test]
    fn test_hub_signature() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let digest = sign("app-secret", body).unwrap();
        let header = format!("sha256={}", digest);

        assert!(verify_hub_signature("app-secret", Some(&header), body).is_ok());
        assert!(matches!(
            verify_hub_signature("other", Some(&header), body),
            Err(SignatureError::Mismatch)
        ));
        assert!(matches!(
            verify_hub_signature("app-secret", Some(&digest), body),
            Err(SignatureError::Malformed)
        ));
        assert!(matches!(
            verify_hub_signature("app-secret", None, body),
            Err(SignatureError::MissingHeader)
        ));
    }
}
