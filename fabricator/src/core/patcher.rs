//! Patcher variants and kernel module interface versions.
//!
//! Both sets are closed. Every per-variant property is an exhaustive `match`,
//! so adding a variant fails to compile until each property is provided.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Root-access patching method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatcherVariant {
    /// Original KernelSU.
    Kernelsu,
    /// KernelSU Next branch.
    KernelsuNext,
    /// SukiSU fork of KernelSU.
    Sukisu,
    /// APatch.
    Apatch,
    /// Magisk; patches the ramdisk and needs no KMI.
    Magisk,
}

impl PatcherVariant {
    /// All variants in presentation order.
    pub const ALL: [Self; 5] = [
        Self::Kernelsu,
        Self::KernelsuNext,
        Self::Sukisu,
        Self::Apatch,
        Self::Magisk,
    ];

    /// Identifier sent as the `patcher_type` input.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Kernelsu => "kernelsu",
            Self::KernelsuNext => "kernelsu-next",
            Self::Sukisu => "sukisu",
            Self::Apatch => "apatch",
            Self::Magisk => "magisk",
        }
    }

    /// Workflow definition file dispatched for this variant.
    #[must_use]
    pub const fn workflow_file(&self) -> &'static str {
        match self {
            Self::Kernelsu => "patch-kernelsu.yml",
            Self::KernelsuNext => "patch-kernelsu-next.yml",
            Self::Sukisu => "patch-sukisu.yml",
            Self::Apatch => "patch-apatch.yml",
            Self::Magisk => "patch-magisk.yml",
        }
    }

    /// Whether a KMI version must be selected.
    #[must_use]
    pub const fn requires_kmi(&self) -> bool {
        match self {
            Self::Kernelsu | Self::KernelsuNext | Self::Sukisu | Self::Apatch => true,
            Self::Magisk => false,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Kernelsu => "KernelSU",
            Self::KernelsuNext => "KernelSU Next",
            Self::Sukisu => "SUKISU",
            Self::Apatch => "APatch",
            Self::Magisk => "Magisk",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Kernelsu => "Original KernelSU for Android 13+",
            Self::KernelsuNext => "Latest KernelSU branch for Android 14+",
            Self::Sukisu => "Enhanced KernelSU fork",
            Self::Apatch => "Alternative kernel patching method",
            Self::Magisk => "Classic ramdisk patching, no KMI needed",
        }
    }
}

impl Default for PatcherVariant {
    fn default() -> Self {
        Self::Kernelsu
    }
}

impl fmt::Display for PatcherVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatcherVariant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ValidationError::new("patcher", format!("Unknown patcher variant: '{s}'"))
            })
    }
}

/// Kernel Module Interface generation of the target kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KmiVersion {
    /// android12-5.10
    #[serde(rename = "android12-5.10")]
    Android12_5_10,
    /// android13-5.10
    #[serde(rename = "android13-5.10")]
    Android13_5_10,
    /// android13-5.15
    #[serde(rename = "android13-5.15")]
    Android13_5_15,
    /// android14-5.15
    #[serde(rename = "android14-5.15")]
    Android14_5_15,
    /// android14-6.1
    #[serde(rename = "android14-6.1")]
    Android14_6_1,
    /// android15-6.6
    #[serde(rename = "android15-6.6")]
    Android15_6_6,
    /// android16-6.12
    #[serde(rename = "android16-6.12")]
    Android16_6_12,
}

impl KmiVersion {
    /// All versions, oldest first.
    pub const ALL: [Self; 7] = [
        Self::Android12_5_10,
        Self::Android13_5_10,
        Self::Android13_5_15,
        Self::Android14_5_15,
        Self::Android14_6_1,
        Self::Android15_6_6,
        Self::Android16_6_12,
    ];

    /// Tag sent as the `kmi_version` input.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Android12_5_10 => "android12-5.10",
            Self::Android13_5_10 => "android13-5.10",
            Self::Android13_5_15 => "android13-5.15",
            Self::Android14_5_15 => "android14-5.15",
            Self::Android14_6_1 => "android14-6.1",
            Self::Android15_6_6 => "android15-6.6",
            Self::Android16_6_12 => "android16-6.12",
        }
    }
}

impl fmt::Display for KmiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KmiVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| ValidationError::new("kmi_version", format!("Unknown KMI version: '{s}'")))
    }
}
