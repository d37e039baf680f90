use std::collections::BTreeMap;

use crate::errors::RebalancerError;
use crate::types::topology::OsdId;


/// Parse a target weight map given on the command line.
///
/// The expected format is comma-separated `osd:weight` pairs, e.g.
/// `1:2.5999,2:2.5999,3:4.798`. Whitespace around ids and weights is
/// ignored. A repeated id keeps its last weight.
pub fn parse_target_weights(text: &str) -> Result<BTreeMap<OsdId, f64>, RebalancerError> {
    if text.trim().is_empty() {
        return Err(RebalancerError::TargetSpec("empty target-weight map found".into()));
    }

    let mut targets = BTreeMap::new();
    for part in text.split(',') {
        let (osd, weight) = parse_pair(part)?;
        targets.insert(osd, weight);
    }
    Ok(targets)
}


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `<osd>:<weight>`
fn parse_pair(part: &str) -> Result<(OsdId, f64), RebalancerError> {
    let (osd, weight) = part.split_once(':').ok_or_else(|| {
        RebalancerError::TargetSpec(format!("incorrect osd-weight pair provided: {:?}", part))
    })?;

    let osd = osd.trim();
    let id: OsdId = osd.parse().map_err(|e| {
        RebalancerError::TargetSpec(format!(
            "osd id should be an integer, {:?} provided: {}",
            osd, e
        ))
    })?;

    let weight = weight.trim();
    let w: f64 = weight.parse().map_err(|e| {
        RebalancerError::TargetSpec(format!(
            "weight should be a float, {:?} provided: {}",
            weight, e
        ))
    })?;

    Ok((id, w))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn spec_err(text: &str) -> String {
        match parse_target_weights(text) {
            Err(RebalancerError::TargetSpec(msg)) => msg,
            other => panic!("expected TargetSpec error, got {:?}", other),
        }
    }

    #[test]
    fn parses_pairs() {
        let targets = parse_target_weights("1:2.5999,2:2.5999,3:4.798").unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[&1], 2.5999);
        assert_eq!(targets[&3], 4.798);
    }

    #[test]
    fn tolerates_spaces() {
        let targets = parse_target_weights(" 10 : 1.5 , 11:2 ").unwrap();
        assert_eq!(targets[&10], 1.5);
        assert_eq!(targets[&11], 2.0);
    }

    #[test]
    fn last_duplicate_wins() {
        let targets = parse_target_weights("4:1.0,4:3.0").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[&4], 3.0);
    }

    #[test]
    fn empty_input_rejected() {
        assert!(spec_err("").contains("empty"));
        assert!(spec_err("   ").contains("empty"));
    }

    #[test]
    fn missing_colon_rejected() {
        assert!(spec_err("1:2.0,3").contains("incorrect osd-weight pair"));
    }

    #[test]
    fn non_integer_id_rejected() {
        assert!(spec_err("osd.1:2.0").contains("osd id should be an integer"));
    }

    #[test]
    fn non_float_weight_rejected() {
        assert!(spec_err("1:heavy").contains("weight should be a float"));
    }

    #[test]
    fn trailing_comma_rejected() {
        assert!(spec_err("1:2.0,").contains("incorrect osd-weight pair"));
    }
}
