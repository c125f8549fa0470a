//! Permission decisions for `permission.request` calls from the runtime.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{json, Map, Value};

/// One permission request as sent by the runtime.
///
/// `kind` is the category (`shell`, `write`, `mcp`, `read`, `url`); every
/// other field is kept verbatim in `details`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub kind: String,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Approved,
    Denied,
    /// No policy could be consulted (e.g. the session is unknown).
    Unavailable,
}

impl PermissionDecision {
    /// The `{ "result": { "kind": ... } }` reply body.
    pub fn to_wire(self) -> Value {
        let kind = match self {
            Self::Approved => "approved",
            Self::Denied => "denied-by-rules",
            Self::Unavailable => "denied-no-approval-rule-and-could-not-request-from-user",
        };
        json!({ "result": { "kind": kind } })
    }
}

/// Strategy consulted for every permission request of a session.
pub trait PermissionPolicy: Send + Sync {
    fn decide(&self, request: &PermissionRequest) -> PermissionDecision;
}

impl<F> PermissionPolicy for F
where
    F: Fn(&PermissionRequest) -> PermissionDecision + Send + Sync,
{
    fn decide(&self, request: &PermissionRequest) -> PermissionDecision {
        self(request)
    }
}

/// Approve everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl PermissionPolicy for AlwaysApprove {
    fn decide(&self, _request: &PermissionRequest) -> PermissionDecision {
        PermissionDecision::Approved
    }
}

/// Approve only the listed request kinds.
#[derive(Debug, Clone, Default)]
pub struct AllowKinds {
    kinds: BTreeSet<String>,
}

impl AllowKinds {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionPolicy for AllowKinds {
    fn decide(&self, request: &PermissionRequest) -> PermissionDecision {
        if self.kinds.contains(&request.kind) {
            PermissionDecision::Approved
        } else {
            PermissionDecision::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: &str) -> PermissionRequest {
        serde_json::from_value(json!({
            "kind": kind,
            "toolCallId": "call_7",
            "serverName": "playwright",
            "toolName": "browser_click"
        }))
        .unwrap()
    }

    #[test]
    fn request_keeps_unknown_fields() {
        let req = request("mcp");
        assert_eq!(req.tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(req.details["serverName"], "playwright");
    }

    #[test]
    fn always_approve_approves_any_kind() {
        for kind in ["shell", "write", "mcp", "url"] {
            assert_eq!(AlwaysApprove.decide(&request(kind)), PermissionDecision::Approved);
        }
    }

    #[test]
    fn allow_kinds_denies_unlisted() {
        let policy = AllowKinds::new(["mcp", "read"]);
        assert_eq!(policy.decide(&request("mcp")), PermissionDecision::Approved);
        assert_eq!(policy.decide(&request("shell")), PermissionDecision::Denied);
    }

    #[test]
    fn closures_are_policies() {
        let policy = |req: &PermissionRequest| {
            if req.kind == "write" {
                PermissionDecision::Denied
            } else {
                PermissionDecision::Approved
            }
        };
        assert_eq!(policy.decide(&request("write")), PermissionDecision::Denied);
    }

    #[test]
    fn wire_reply_shapes() {
        assert_eq!(
            PermissionDecision::Approved.to_wire(),
            json!({"result": {"kind": "approved"}})
        );
        assert_eq!(
            PermissionDecision::Denied.to_wire()["result"]["kind"],
            "denied-by-rules"
        );
    }
}
