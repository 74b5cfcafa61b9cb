use uuid::Uuid;

/// Append-only audit entry (spec §3 `AuditEntry`, §4.9). No update path
/// exists anywhere in this crate — `infra::postgres::audit_repo` only
/// ever inserts, and `ON CONFLICT DO NOTHING` makes even a duplicate
/// insert a no-op rather than a silent overwrite.
pub struct NewAuditEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub external_id: Option<String>,
    pub event_id: Option<String>,
    pub action: String,
    pub actor: String,
    pub correlation_id: String,
    pub detail: serde_json::Value,
}

impl NewAuditEntry {
    /// Redaction is mandatory and enforced at write time (spec §4.9):
    /// any 13-19 digit run is masked to `<mask><last4>`, and any field
    /// whose key looks CVV-labelled is blanked to `***`.
    pub fn redacted(mut self) -> Self {
        self.detail = redact_value(self.detail);
        self
    }
}

fn redact_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(redact_string(&s)),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if is_cvv_field(&k) {
                        (k, serde_json::Value::String("***".to_string()))
                    } else {
                        (k, redact_value(v))
                    }
                })
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(redact_value).collect())
        }
        other => other,
    }
}

fn is_cvv_field(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.contains("cvv") || lower.contains("cvc") || lower.contains("security_code")
}

/// Replaces any run of 13-19 consecutive digits with `<mask><last4>`.
/// Hand-rolled rather than regex-based: the alphabet (ASCII digits) and
/// the run-length bound are both fixed and small, so a single linear
/// scan is simpler than compiling a pattern.
fn redact_string(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let run_len = i - start;
            let run: String = chars[start..i].iter().collect();
            if (13..=19).contains(&run_len) {
                let last4 = &run[run.len() - 4..];
                out.push_str("<mask>");
                out.push_str(last4);
            } else {
                out.push_str(&run);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_card_number_run() {
        let redacted = redact_string("card 4242424242424242 charged");
        assert_eq!(redacted, "card <mask>4242 charged");
        assert!(!redacted.contains("424242424242"));
    }

    #[test]
    fn leaves_short_digit_runs_alone() {
        let redacted = redact_string("order 12345 total 42");
        assert_eq!(redacted, "order 12345 total 42");
    }

    #[test]
    fn redacts_cvv_labelled_field() {
        let entry = NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: "payment".into(),
            entity_id: None,
            external_id: None,
            event_id: None,
            action: "created".into(),
            actor: "test".into(),
            correlation_id: "corr-1".into(),
            detail: serde_json::json!({ "cvv": "123", "amount": 500 }),
        }
        .redacted();

        assert_eq!(entry.detail["cvv"], "***");
        assert_eq!(entry.detail["amount"], 500);
    }

    #[test]
    fn redacts_nested_pan_in_raw_payload() {
        let entry = NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: "payment".into(),
            entity_id: None,
            external_id: None,
            event_id: None,
            action: "created".into(),
            actor: "test".into(),
            correlation_id: "corr-1".into(),
            detail: serde_json::json!({ "raw": { "pan": "4111111111111111" } }),
        }
        .redacted();

        assert_eq!(entry.detail["raw"]["pan"], "<mask>1111");
    }
}
