//! Base simulator configuration and per-case overlays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ParamKey, ParamValue};

/// Simulator configuration grouped by section.
///
/// This is the `base_config` a run batch starts from. It is shared read-only
/// across all cases of a batch; each case receives its own overlaid copy.
///
/// Serialized as a two-level mapping:
///
/// ```yaml
/// ElastoDyn:
///   PtfmSgDOF: "False"
/// DISCON_in:
///   TCIPC_MaxTipDeflection: 10
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationInput {
    sections: BTreeMap<String, BTreeMap<String, ParamValue>>,
}

impl SimulationInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, key: &ParamKey, value: impl Into<ParamValue>) {
        self.sections
            .entry(key.target.clone())
            .or_default()
            .insert(key.field.clone(), value.into());
    }

    /// Builder-style variant of [`SimulationInput::set`]
    #[must_use]
    pub fn with(mut self, target: &str, field: &str, value: impl Into<ParamValue>) -> Self {
        self.set(&ParamKey::new(target, field), value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &ParamKey) -> Option<&ParamValue> {
        self.sections.get(&key.target)?.get(&key.field)
    }

    /// Fields of one section, if present
    #[must_use]
    pub fn section(&self, target: &str) -> Option<&BTreeMap<String, ParamValue>> {
        self.sections.get(target)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }

    /// Copy of this configuration with `assignments` applied on top.
    ///
    /// Assigned fields take precedence; everything else keeps its base value.
    #[must_use]
    pub fn overlay<'a>(
        &self,
        assignments: impl IntoIterator<Item = (&'a ParamKey, &'a ParamValue)>,
    ) -> Self {
        let mut merged = self.clone();
        for (key, value) in assignments {
            merged.set(key, value.clone());
        }
        merged
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_takes_precedence_and_keeps_base() {
        let base = SimulationInput::new()
            .with("DISCON_in", "TCIPC_MaxTipDeflection", 10)
            .with("DISCON_in", "TCIPC_ControlMode", 0)
            .with("ElastoDyn", "PtfmSgDOF", "False");

        let key = ParamKey::new("DISCON_in", "TCIPC_ControlMode");
        let value = ParamValue::from(1);
        let merged = base.overlay([(&key, &value)]);

        assert_eq!(merged.get(&key), Some(&ParamValue::Int(1)));
        assert_eq!(
            merged.get(&ParamKey::new("DISCON_in", "TCIPC_MaxTipDeflection")),
            Some(&ParamValue::Int(10))
        );
        // Base is untouched
        assert_eq!(base.get(&key), Some(&ParamValue::Int(0)));
    }

    #[test]
    fn test_overlay_adds_new_sections() {
        let base = SimulationInput::new();
        let key = ParamKey::new("InflowWind", "HWindSpeed");
        let value = ParamValue::from(12.0);
        let merged = base.overlay([(&key, &value)]);

        assert!(base.is_empty());
        assert_eq!(merged.section("InflowWind").map(BTreeMap::len), Some(1));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let input = SimulationInput::new()
            .with("Fst", "OutFileFmt", 2)
            .with("Fst", "TMax", 2.5)
            .with("ServoDyn", "DLL_FileName", "libdiscon.so");
        let yaml = input.to_yaml().unwrap();
        let parsed = SimulationInput::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, input);
    }
}
