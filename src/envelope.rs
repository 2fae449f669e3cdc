//! Request and response envelopes exchanged with the webhook listener.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

/// One webhook event, as forwarded by the listener.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterceptorRequest {
    /// Exact raw JSON text of the webhook payload.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub header: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub interceptor_params: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub context: Option<TriggerContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerContext {
    pub event_url: String,
    pub event_id: String,
    /// `namespace/$ns/triggers/$name`.
    pub trigger_id: String,
}

impl InterceptorRequest {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn trigger_id(&self) -> &str {
        self.context
            .as_ref()
            .map(|c| c.trigger_id.as_str())
            .unwrap_or_default()
    }

    /// Whether the body was declared as a form-encoded payload.
    pub fn is_form_encoded(&self) -> bool {
        self.header("Content-Type").is_some_and(|v| {
            v.split(';')
                .next()
                .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        })
    }
}

/// Split `namespace/$ns/triggers/$name` into `($ns, $name)`.
pub fn parse_trigger_id(trigger_id: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = trigger_id.split('/').collect();
    match parts.as_slice() {
        [_, ns, _, name] => Some((*ns, *name)),
        _ => None,
    }
}

/// gRPC status codes used in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Ok,
    InvalidArgument,
    DeadlineExceeded,
    FailedPrecondition,
    Internal,
}

impl Code {
    pub fn as_u32(self) -> u32 {
        match self {
            Code::Ok => 0,
            Code::InvalidArgument => 3,
            Code::DeadlineExceeded => 4,
            Code::FailedPrecondition => 9,
            Code::Internal => 13,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::InvalidArgument => "InvalidArgument",
            Code::DeadlineExceeded => "DeadlineExceeded",
            Code::FailedPrecondition => "FailedPrecondition",
            Code::Internal => "Internal",
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Code::Ok
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    #[serde(skip_serializing_if = "Code::is_ok")]
    pub code: Code,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// The gate's answer. `proceed` is serialized as `continue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterceptorResponse {
    #[serde(rename = "continue")]
    pub proceed: bool,
    pub status: Status,
}

impl InterceptorResponse {
    pub fn allow() -> Self {
        Self {
            proceed: true,
            status: Status {
                code: Code::Ok,
                message: String::new(),
            },
        }
    }

    pub fn deny() -> Self {
        Self {
            proceed: false,
            status: Status {
                code: Code::Ok,
                message: String::new(),
            },
        }
    }

    /// A failure never lets the pipeline continue.
    pub fn failure(code: Code, message: impl Into<String>) -> Self {
        Self {
            proceed: false,
            status: Status {
                code,
                message: message.into(),
            },
        }
    }
}
