// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event type tags exchanged over the bus.

/// Inbound: a patient observation from the symptom-ingestion collaborator.
pub const SYMPTOM_OBSERVED: &str = "symptom.observed";
/// Outbound: a confirmed crisis, published before any protocol step runs.
pub const CRISIS_ALERT: &str = "crisis.alert";
/// Outbound: one remediation step of a running protocol.
pub const CRISIS_STEP_EXECUTED: &str = "crisis.step.executed";
/// Inbound: a clinician acted on an alert.
pub const CLINICIAN_RESPONDED: &str = "crisis.clinician.responded";
/// Outbound: echo of a recorded clinician response.
pub const CLINICIAN_RESPONSE_RECORDED: &str = "crisis.clinician.response.recorded";
/// Request: protocol steps for a category. Answered on [`reply_to`] of this tag.
pub const PROTOCOL_LOOKUP: &str = "crisis.protocol.lookup";
/// Diagnostic: a handler run failed.
pub const HANDLER_FAILED: &str = "bus.handler.failed";

/// Suffix appended to a request tag to form its reply tag.
pub const REPLY_SUFFIX: &str = ".reply";

/// Reply tag for a request tag.
pub fn reply_to(event_type: &str) -> String {
    format!("{}{}", event_type, REPLY_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_to() {
        assert_eq!(reply_to(PROTOCOL_LOOKUP), "crisis.protocol.lookup.reply");
    }
}
