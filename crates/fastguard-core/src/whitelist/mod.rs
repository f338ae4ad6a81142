//! Name reservation.
//!
//! Seven independent sources can keep a name from being renamed: the language
//! preset, user configuration, the SDK surface, framework struct members,
//! string-literal property values, enum members and the export surface. A
//! name is reserved as soon as any applicable source lists it; the sources that
//! did are reported as [`KeepReason`]s for the unobfuscation report.

pub mod keywords;
pub mod sdk;

use crate::wildcard::{WildcardMode, WildcardSet};
use keywords::LanguagePreset;
use sdk::ApiSurface;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which check a query goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKind {
    /// Identifier declared below module scope.
    Local,
    /// Identifier declared in module scope.
    TopLevel,
    /// Property, enum member or string-literal property.
    Property,
    /// Path segment.
    FileName,
}

/// Why a name was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeepReason {
    #[serde(rename = "sdk")]
    Sdk,
    #[serde(rename = "lang")]
    Lang,
    #[serde(rename = "conf")]
    Conf,
    #[serde(rename = "struct")]
    Struct,
    #[serde(rename = "exported")]
    Exported,
    #[serde(rename = "strProp")]
    StrProp,
    #[serde(rename = "enum")]
    Enum,
}

impl KeepReason {
    pub const ALL: [KeepReason; 7] = [
        Self::Sdk,
        Self::Lang,
        Self::Conf,
        Self::Struct,
        Self::Exported,
        Self::StrProp,
        Self::Enum,
    ];

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Sdk => "sdk",
            Self::Lang => "lang",
            Self::Conf => "conf",
            Self::Struct => "struct",
            Self::Exported => "exported",
            Self::StrProp => "strProp",
            Self::Enum => "enum",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Sdk => "same as the system api names",
            Self::Lang => "same as the language keywords",
            Self::Conf => "same as the user-configured kept name",
            Self::Struct => "same as the ArkUI struct property",
            Self::Exported => "same as the exported names and properties",
            Self::StrProp => "same as the string property",
            Self::Enum => "same as the members in the enum",
        }
    }
}

/// Obfuscation switches that decide which sources apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitelistMode {
    pub property: bool,
    pub toplevel: bool,
    pub export: bool,
    pub string_property: bool,
}

impl WhitelistMode {
    /// Top-level names are renamed through the property table, so the
    /// top-level check widens to the property check.
    #[must_use]
    pub fn toplevel_collapses_into_property(self) -> bool {
        self.toplevel && self.property
    }
}

/// User-configured reserved names, already split into exact and wildcard.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredNames {
    pub globals: WildcardSet,
    pub properties: WildcardSet,
    pub file_names: WildcardSet,
}

impl ConfiguredNames {
    pub fn from_lists<'a>(
        globals: impl IntoIterator<Item = &'a str>,
        properties: impl IntoIterator<Item = &'a str>,
        file_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            globals: WildcardSet::from_literals(WildcardMode::Name, globals),
            properties: WildcardSet::from_literals(WildcardMode::Name, properties),
            file_names: WildcardSet::from_literals(WildcardMode::Name, file_names),
        }
    }
}

/// Every reservation source for one compilation.
#[derive(Debug, Clone)]
pub struct Whitelist {
    mode: WhitelistMode,
    language: HashSet<&'static str>,
    configured: ConfiguredNames,
    sdk: ApiSurface,
    // Collected from the project while preparing.
    struct_members: HashSet<String>,
    string_properties: HashSet<String>,
    enum_members: HashSet<String>,
    exported_names: HashSet<String>,
    exported_properties: HashSet<String>,
    kept_file_names: HashSet<String>,
}

impl Whitelist {
    #[must_use]
    pub fn new(mode: WhitelistMode, preset: LanguagePreset, configured: ConfiguredNames) -> Self {
        Self {
            mode,
            language: preset.names().collect(),
            configured,
            sdk: ApiSurface::default(),
            struct_members: HashSet::new(),
            string_properties: HashSet::new(),
            enum_members: HashSet::new(),
            exported_names: HashSet::new(),
            exported_properties: HashSet::new(),
            kept_file_names: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_sdk(mut self, sdk: ApiSurface) -> Self {
        self.sdk = sdk;
        self
    }

    #[must_use]
    pub fn mode(&self) -> WhitelistMode {
        self.mode
    }

    #[must_use]
    pub fn configured(&self) -> &ConfiguredNames {
        &self.configured
    }

    pub fn add_struct_member(&mut self, name: &str) {
        self.struct_members.insert(name.to_string());
    }

    /// String-literal property values are only reserved while string
    /// property obfuscation is off.
    pub fn add_string_property(&mut self, name: &str) {
        if !self.mode.string_property {
            self.string_properties.insert(name.to_string());
        }
    }

    pub fn add_enum_member(&mut self, name: &str) {
        self.enum_members.insert(name.to_string());
    }

    /// Export surface is only reserved while export obfuscation is off.
    pub fn add_exported_name(&mut self, name: &str) {
        if !self.mode.export {
            self.exported_names.insert(name.to_string());
        }
    }

    pub fn add_exported_property(&mut self, name: &str) {
        if !self.mode.export {
            self.exported_properties.insert(name.to_string());
        }
    }

    /// Names declared in files that are kept as-is.
    pub fn add_kept_file_name(&mut self, name: &str) {
        self.kept_file_names.insert(name.to_string());
    }

    /// Drop everything collected from the project, keeping configuration.
    pub fn clear_project_sets(&mut self) {
        self.struct_members.clear();
        self.string_properties.clear();
        self.enum_members.clear();
        self.exported_names.clear();
        self.exported_properties.clear();
        self.kept_file_names.clear();
    }

    #[must_use]
    pub fn is_reserved(&self, kind: ReservedKind, name: &str) -> bool {
        !self.reasons(kind, name).is_empty()
    }

    /// Every source that keeps `name` under `kind`, deduplicated and ordered.
    #[must_use]
    pub fn reasons(&self, kind: ReservedKind, name: &str) -> Vec<KeepReason> {
        let mut reasons = Vec::new();
        match kind {
            ReservedKind::Local => {
                self.push_if(&mut reasons, KeepReason::Lang, self.language.contains(name));
                self.push_if(&mut reasons, KeepReason::Sdk, self.sdk.locals.contains(name));
            }
            ReservedKind::TopLevel => {
                self.toplevel_reasons(name, &mut reasons);
                if self.mode.toplevel_collapses_into_property() {
                    self.property_reasons(name, &mut reasons);
                }
            }
            ReservedKind::Property => self.property_reasons(name, &mut reasons),
            ReservedKind::FileName => {
                self.push_if(
                    &mut reasons,
                    KeepReason::Conf,
                    self.configured.file_names.contains(name),
                );
            }
        }
        reasons.sort();
        reasons.dedup();
        reasons
    }

    fn toplevel_reasons(&self, name: &str, out: &mut Vec<KeepReason>) {
        self.push_if(out, KeepReason::Lang, self.language.contains(name));
        self.push_if(
            out,
            KeepReason::Conf,
            self.configured.globals.contains(name) || self.kept_file_names.contains(name),
        );
        self.push_if(out, KeepReason::Sdk, self.sdk.globals.contains(name));
        self.push_if(out, KeepReason::Exported, self.exported_names.contains(name));
    }

    fn property_reasons(&self, name: &str, out: &mut Vec<KeepReason>) {
        self.push_if(out, KeepReason::Lang, self.language.contains(name));
        self.push_if(
            out,
            KeepReason::Conf,
            self.configured.properties.contains(name) || self.kept_file_names.contains(name),
        );
        self.push_if(out, KeepReason::Sdk, self.sdk.properties.contains(name));
        self.push_if(out, KeepReason::Struct, self.struct_members.contains(name));
        self.push_if(out, KeepReason::StrProp, self.string_properties.contains(name));
        self.push_if(out, KeepReason::Enum, self.enum_members.contains(name));
        self.push_if(
            out,
            KeepReason::Exported,
            self.exported_properties.contains(name) || self.exported_names.contains(name),
        );
    }

    #[allow(clippy::unused_self)]
    fn push_if(&self, out: &mut Vec<KeepReason>, reason: KeepReason, cond: bool) {
        if cond {
            out.push(reason);
        }
    }
}
