use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The specification for the `MomentumSgd` operator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MomentumSgdSpec {
    pub momentum: f32,
    pub nesterov: bool,
    pub bounds_check: bool,
    pub parallel_chunk: Option<NonZeroUsize>,
}

impl MomentumSgdSpec {
    /// Parses a spec out of its json representation, missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SgdErr;

    #[test]
    fn test_defaults() {
        let spec = MomentumSgdSpec::from_json("{}").unwrap();

        assert_eq!(spec.momentum, 0.);
        assert!(!spec.nesterov);
        assert!(!spec.bounds_check);
        assert_eq!(spec.parallel_chunk, None);
    }

    #[test]
    fn test_parse_full_spec() {
        let json = r#"{"momentum": 0.9, "nesterov": true, "bounds_check": true, "parallel_chunk": 4096}"#;
        let spec = MomentumSgdSpec::from_json(json).unwrap();

        assert_eq!(
            spec,
            MomentumSgdSpec {
                momentum: 0.9,
                nesterov: true,
                bounds_check: true,
                parallel_chunk: NonZeroUsize::new(4096),
            }
        );
    }

    #[test]
    fn test_zero_chunk_is_rejected() {
        let res = MomentumSgdSpec::from_json(r#"{"parallel_chunk": 0}"#);
        assert!(matches!(res, Err(SgdErr::Config(_))));
    }
}
