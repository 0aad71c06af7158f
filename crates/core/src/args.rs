//! Per-call forecast arguments.
//!
//! Callers pass an open keyword map. A small documented subset is consumed and
//! type-checked here; every other key travels untouched to the forecasting
//! component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, CoreResult};

/// Forecast horizon.
pub const H: &str = "h";
/// Number of cross-validation windows.
pub const N_WINDOWS: &str = "n_windows";
/// Distance between consecutive cutoffs.
pub const STEP_SIZE: &str = "step_size";
/// Total length of the evaluated tail (alternative to `n_windows`).
pub const TEST_SIZE: &str = "test_size";
/// Rolling training window length.
pub const INPUT_SIZE: &str = "input_size";

const POSITIVE_INTS: [&str; 5] = [H, N_WINDOWS, STEP_SIZE, TEST_SIZE, INPUT_SIZE];

/// Keyword arguments for one forecast or cross-validation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, JsonValue>", into = "BTreeMap<String, JsonValue>")]
pub struct ForecastArgs {
    values: BTreeMap<String, JsonValue>,
}

/// Resolved cross-validation window layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CvWindows {
    pub h: usize,
    pub n_windows: usize,
    pub step_size: usize,
    pub input_size: Option<usize>,
}

impl CvWindows {
    /// Number of trailing rows covered by all windows together.
    pub fn test_size(&self) -> usize {
        self.h + self.step_size * (self.n_windows - 1)
    }
}

impl ForecastArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common case of only a horizon.
    pub fn horizon(h: usize) -> Self {
        Self::new().with(H, h)
    }

    /// Set a key, replacing any previous value.
    ///
    /// Type problems surface on access, or when built with [`ForecastArgs::from_map`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Build from an untyped map, validating the consumed keys.
    pub fn from_map(values: BTreeMap<String, JsonValue>) -> CoreResult<Self> {
        let args = Self { values };
        args.validate()?;
        Ok(args)
    }

    /// Check that every consumed key present has the right type.
    pub fn validate(&self) -> CoreResult<()> {
        for key in POSITIVE_INTS {
            self.positive(key)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys not consumed by this crate.
    pub fn passthrough(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.iter().filter(|(k, _)| !POSITIVE_INTS.contains(k))
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts.
    pub fn merged_with(&self, other: &ForecastArgs) -> ForecastArgs {
        let mut values = self.values.clone();
        values.extend(other.values.clone());
        ForecastArgs { values }
    }

    /// The forecast horizon; required.
    pub fn h(&self) -> CoreResult<usize> {
        self.positive(H)?
            .ok_or_else(|| CoreError::invalid_argument(H, "forecast horizon is required"))
    }

    /// Cross-validation layout derived from `h`, `n_windows`, `step_size`,
    /// `test_size` and `input_size`.
    pub fn cv_windows(&self) -> CoreResult<CvWindows> {
        let h = self.h()?;
        let step_size = self.positive(STEP_SIZE)?.unwrap_or(h);
        let input_size = self.positive(INPUT_SIZE)?;
        let n_windows = match (self.positive(TEST_SIZE)?, self.positive(N_WINDOWS)?) {
            (Some(test_size), _) => {
                if test_size < h || (test_size - h) % step_size != 0 {
                    return Err(CoreError::invalid_argument(
                        TEST_SIZE,
                        format!(
                            "must be h + k * step_size (h={h}, step_size={step_size}, got {test_size})"
                        ),
                    ));
                }
                (test_size - h) / step_size + 1
            }
            (None, n) => n.unwrap_or(1),
        };
        Ok(CvWindows {
            h,
            n_windows,
            step_size,
            input_size,
        })
    }

    fn positive(&self, key: &str) -> CoreResult<Option<usize>> {
        let Some(value) = self.values.get(key) else {
            return Ok(None);
        };
        match value.as_u64() {
            Some(n) if n > 0 => usize::try_from(n)
                .map(Some)
                .map_err(|_| CoreError::invalid_argument(key, "value too large")),
            _ => Err(CoreError::invalid_argument(
                key,
                format!("expected a positive integer, got {value}"),
            )),
        }
    }
}

impl TryFrom<BTreeMap<String, JsonValue>> for ForecastArgs {
    type Error = CoreError;

    fn try_from(values: BTreeMap<String, JsonValue>) -> Result<Self, Self::Error> {
        Self::from_map(values)
    }
}

impl From<ForecastArgs> for BTreeMap<String, JsonValue> {
    fn from(args: ForecastArgs) -> Self {
        args.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn horizon_is_required_and_positive() {
        assert!(ForecastArgs::new().h().is_err());
        assert!(ForecastArgs::new().with(H, 0).h().is_err());
        assert!(ForecastArgs::new().with(H, "5").h().is_err());
        assert_eq!(ForecastArgs::horizon(5).h().unwrap(), 5);
    }

    #[test]
    fn cv_defaults_to_one_window_stepping_by_h() {
        let w = ForecastArgs::horizon(3).cv_windows().unwrap();
        assert_eq!(w, CvWindows { h: 3, n_windows: 1, step_size: 3, input_size: None });
        assert_eq!(w.test_size(), 3);
    }

    #[test]
    fn test_size_determines_window_count() {
        let args = ForecastArgs::horizon(2).with(STEP_SIZE, 1).with(TEST_SIZE, 5);
        let w = args.cv_windows().unwrap();
        assert_eq!(w.n_windows, 4);
        assert_eq!(w.test_size(), 5);

        let bad = ForecastArgs::horizon(2).with(STEP_SIZE, 2).with(TEST_SIZE, 5);
        assert!(bad.cv_windows().is_err());
    }

    #[test]
    fn unknown_keys_pass_through() {
        let map = BTreeMap::from([
            ("h".to_string(), json!(4)),
            ("level".to_string(), json!([80, 95])),
        ]);
        let args = ForecastArgs::from_map(map).unwrap();
        let rest: Vec<_> = args.passthrough().map(|(k, _)| k).collect();
        assert_eq!(rest, vec!["level"]);
    }

    #[test]
    fn deserialization_validates_consumed_keys() {
        assert!(serde_json::from_str::<ForecastArgs>(r#"{"h": -1}"#).is_err());
        let args: ForecastArgs = serde_json::from_str(r#"{"h": 7, "x": true}"#).unwrap();
        assert_eq!(args.h().unwrap(), 7);
    }

    #[test]
    fn merged_with_prefers_overrides() {
        let defaults = ForecastArgs::horizon(1).with("level", 90);
        let merged = defaults.merged_with(&ForecastArgs::horizon(6));
        assert_eq!(merged.h().unwrap(), 6);
        assert_eq!(merged.get("level"), Some(&json!(90)));
    }
}
