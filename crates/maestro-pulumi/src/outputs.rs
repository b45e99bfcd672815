//! Host extraction from Pulumi stdout.
//!
//! The provisioning run emits arbitrary log noise with one structured payload
//! between two sentinel marker lines. Everything between the markers is
//! decoded as JSON with a `hosts` field. There is no partial recovery: a
//! malformed payload discards the whole stack's contribution and aborts the
//! run.

use crate::error::{PulumiError, Result};
use maestro_core::HostList;

pub const OUTPUTS_BEGIN: &str = "__PULUMI_OUTPUTS_BEGIN__";
pub const OUTPUTS_END: &str = "__PULUMI_OUTPUTS_END__";

/// Extract the host list from raw Pulumi stdout.
pub fn parse_host_outputs(stdout: &str) -> Result<HostList> {
    let begin = stdout
        .find(OUTPUTS_BEGIN)
        .ok_or(PulumiError::OutputMarkersMissing)?;
    let after_begin = &stdout[begin + OUTPUTS_BEGIN.len()..];
    let end = after_begin
        .find(OUTPUTS_END)
        .ok_or(PulumiError::OutputMarkersMissing)?;

    let payload = after_begin[..end].trim();
    serde_json::from_str(payload).map_err(PulumiError::HostPayload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payload_between_markers() {
        let stdout = format!(
            "Updating (dev)\nsome log noise\n{OUTPUTS_BEGIN}\n\
             {{\"hosts\": [{{\"hostname\": \"app.example.com\", \"roles\": [\"backend\"]}}]}}\n\
             {OUTPUTS_END}\ntrailing noise\n"
        );
        let hosts = parse_host_outputs(&stdout).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts.hosts[0].hostname, "app.example.com");
        assert_eq!(hosts.hosts[0].roles.as_deref(), Some(&["backend".to_string()][..]));
    }

    #[test]
    fn test_missing_hosts_field_defaults_to_empty() {
        let stdout = format!("{OUTPUTS_BEGIN}\n{{}}\n{OUTPUTS_END}\n");
        let hosts = parse_host_outputs(&stdout).unwrap();
        assert!(hosts.is_empty());
    }

    #[test]
    fn test_missing_begin_marker() {
        let stdout = format!("{{\"hosts\": []}}\n{OUTPUTS_END}\n");
        let err = parse_host_outputs(&stdout).unwrap_err();
        assert!(matches!(err, PulumiError::OutputMarkersMissing));
    }

    #[test]
    fn test_missing_end_marker() {
        let stdout = format!("{OUTPUTS_BEGIN}\n{{\"hosts\": []}}\n");
        let err = parse_host_outputs(&stdout).unwrap_err();
        assert!(matches!(err, PulumiError::OutputMarkersMissing));
    }

    #[test]
    fn test_invalid_payload() {
        let stdout = format!("{OUTPUTS_BEGIN}\nnot json\n{OUTPUTS_END}\n");
        let err = parse_host_outputs(&stdout).unwrap_err();
        assert!(matches!(err, PulumiError::HostPayload(_)));
    }
}
