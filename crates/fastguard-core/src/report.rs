//! Unobfuscation report (`-print-kept-names`).

use crate::error::{Error, Result};
use crate::whitelist::{KeepReason, ReservedKind};
use fastguard_util::fs::write_artifact;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

type Reasons = BTreeMap<String, BTreeSet<KeepReason>>;

/// Names deliberately left alone, per reservation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeptNames {
    pub property: Reasons,
    pub global: Reasons,
    pub local: Reasons,
    #[serde(rename = "fileName")]
    pub file_name: Reasons,
}

impl KeptNames {
    pub fn record(&mut self, kind: ReservedKind, name: &str, reasons: &[KeepReason]) {
        if reasons.is_empty() {
            return;
        }
        let bucket = match kind {
            ReservedKind::Property => &mut self.property,
            ReservedKind::TopLevel => &mut self.global,
            ReservedKind::Local => &mut self.local,
            ReservedKind::FileName => &mut self.file_name,
        };
        bucket
            .entry(name.to_string())
            .or_default()
            .extend(reasons.iter().copied());
    }

    #[must_use]
    pub fn reasons(&self, kind: ReservedKind, name: &str) -> Option<&BTreeSet<KeepReason>> {
        let bucket = match kind {
            ReservedKind::Property => &self.property,
            ReservedKind::TopLevel => &self.global,
            ReservedKind::Local => &self.local,
            ReservedKind::FileName => &self.file_name,
        };
        bucket.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.property.is_empty()
            && self.global.is_empty()
            && self.local.is_empty()
            && self.file_name.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnobfuscationReport {
    pub kept_reasons: BTreeMap<&'static str, &'static str>,
    pub kept_names: KeptNames,
}

impl UnobfuscationReport {
    #[must_use]
    pub fn new(kept_names: KeptNames) -> Self {
        Self {
            kept_reasons: KeepReason::ALL
                .iter()
                .map(|r| (r.tag(), r.description()))
                .collect(),
            kept_names,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::other(format!("failed to serialize unobfuscation report: {e}")))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_artifact(path, self.to_json()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_shape() {
        let mut kept = KeptNames::default();
        kept.record(ReservedKind::Property, "title", &[KeepReason::Conf]);
        kept.record(ReservedKind::Property, "title", &[KeepReason::Sdk]);
        kept.record(ReservedKind::TopLevel, "Api", &[KeepReason::Exported]);
        kept.record(ReservedKind::Local, "skipped", &[]);

        let report = UnobfuscationReport::new(kept);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["keptReasons"]["strProp"], "same as the string property");
        assert_eq!(value["keptNames"]["property"]["title"], serde_json::json!(["sdk", "conf"]));
        assert_eq!(value["keptNames"]["global"]["Api"], serde_json::json!(["exported"]));
        assert!(value["keptNames"]["local"].as_object().unwrap().is_empty());
        assert!(value["keptNames"]["fileName"].is_object());
    }
}
