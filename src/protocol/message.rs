use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

use super::codec::base64_bytes;
use crate::{IdGenerator, Identity, LoadBalancePolicy, MessageId, Request, Response};

/// The wire record exchanged with the remote routing tier.
///
/// Requests and responses share this shape; `is_request` tells them apart.
/// A response always carries the `id` of the request it answers.
///
/// `to_instance` is never omitted on the wire: it is `null` when the remote
/// tier should choose the instance and a string otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Correlation id.
    pub id: MessageId,

    /// Secondary id generated with `id`; carried for tracing only.
    #[serde(rename = "request_id", alias = "correlationHint")]
    pub correlation_hint: MessageId,

    #[serde(rename = "from_service_name", alias = "fromService")]
    pub from_service: String,

    #[serde(rename = "from_service_no", alias = "fromInstance")]
    pub from_instance: String,

    #[serde(rename = "to_service_name", alias = "toService")]
    pub to_service: String,

    #[serde(rename = "to_service_no", alias = "toInstance")]
    pub to_instance: Option<String>,

    #[serde(
        rename = "lb_algo",
        alias = "loadBalancePolicy",
        default,
        deserialize_with = "lenient_policy"
    )]
    pub policy: LoadBalancePolicy,

    #[serde(alias = "isRequest")]
    pub is_request: bool,

    #[serde(alias = "writeOp", default)]
    pub write_op: bool,

    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "data", alias = "payload", with = "base64_bytes", default)]
    pub payload: Bytes,
}

// Unknown or empty tags fall back to the default policy; the tag is advisory.
fn lenient_policy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LoadBalancePolicy, D::Error> {
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag
        .as_deref()
        .and_then(LoadBalancePolicy::from_tag)
        .unwrap_or_default())
}

impl Message {
    /// Build a request message from `req`, stamped with fresh ids and the
    /// local identity as sender.
    pub fn request(ids: &IdGenerator, req: Request) -> Self {
        // ---
        let (id, correlation_hint) = ids.next_pair();
        let local = ids.identity();

        Self {
            id,
            correlation_hint,
            from_service: local.service_name.to_string(),
            from_instance: local.instance.to_string(),
            to_service: req.service_name,
            to_instance: req.instance,
            policy: req.policy,
            is_request: true,
            write_op: req.write_op,
            success: false,
            description: String::new(),
            payload: req.payload,
        }
    }

    /// Build the reply to this request.
    ///
    /// The reply keeps the request's `id` and hint, and swaps the addressing:
    /// it comes from whoever the request was addressed to (falling back to
    /// `local` when the request left the instance unset) and goes back to the
    /// original sender.
    pub fn reply(&self, local: &Identity, outcome: std::result::Result<Bytes, String>) -> Self {
        // ---
        let (success, description, payload) = match outcome {
            Ok(payload) => (true, String::new(), payload),
            Err(description) => (false, description, Bytes::new()),
        };

        let from_instance = self
            .to_instance
            .clone()
            .unwrap_or_else(|| local.instance.to_string());

        Self {
            id: self.id.clone(),
            correlation_hint: self.correlation_hint.clone(),
            from_service: self.to_service.clone(),
            from_instance,
            to_service: self.from_service.clone(),
            to_instance: Some(self.from_instance.clone()),
            policy: self.policy,
            is_request: false,
            write_op: self.write_op,
            success,
            description,
            payload,
        }
    }

    /// The caller-facing view of a response message.
    pub fn into_response(self) -> Response {
        Response {
            service_name: self.from_service,
            instance: self.from_instance,
            success: self.success,
            description: self.description,
            payload: self.payload,
        }
    }
}
