//! Enumeration types for the composition engine.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// Coarse category of a component type.
///
/// Used for grouping in the registry and for deciding the domain of a
/// composed entity. Plugins may introduce new domains through
/// [`Domain::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Pathogens, toxins, invasive organisms.
    Biological,
    /// Malware, intrusions, network attacks.
    Cyber,
    /// Floods, wildfires, climate effects.
    Environmental,
    /// Quantum computing and cryptographic breakage.
    Quantum,
    /// Radiation sources and contamination.
    Radiological,
    /// Autonomous machines and swarms.
    Robotic,
    /// Markets, supply chains, currencies.
    Economic,
    /// Misinformation, unrest, institutional trust.
    Social,
    /// Structural and kinetic hazards.
    Physical,
    /// A plugin-defined domain.
    Custom(String),
}

impl core::fmt::Display for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Biological => f.write_str("biological"),
            Self::Cyber => f.write_str("cyber"),
            Self::Environmental => f.write_str("environmental"),
            Self::Quantum => f.write_str("quantum"),
            Self::Radiological => f.write_str("radiological"),
            Self::Robotic => f.write_str("robotic"),
            Self::Economic => f.write_str("economic"),
            Self::Social => f.write_str("social"),
            Self::Physical => f.write_str("physical"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// The declared kind of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// A floating point number.
    Number,
    /// A boolean flag.
    Bool,
    /// Free-form text.
    Text,
    /// One of a declared set of variant names.
    Enum,
}

impl core::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("bool"),
            Self::Text => f.write_str("text"),
            Self::Enum => f.write_str("enum"),
        }
    }
}

/// Comparison operator used by trigger conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
}

impl Comparison {
    /// Whether the operator needs an ordering (only numbers have one).
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }

    /// Symbol used in log output and rule descriptions.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// How two or more components affect each other when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// The components amplify each other.
    Synergy,
    /// The components work against each other.
    Conflict,
    /// One component changes the nature of the other.
    Transformation,
    /// One component triggers a chain of follow-on effects.
    Cascade,
}

/// Impact classification of an emergent behavior.
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    /// Minor, local consequences.
    Low,
    /// Noticeable consequences.
    Medium,
    /// Serious consequences.
    High,
    /// Catastrophic consequences.
    Critical,
}

/// Whether a composed entity attacks or is attacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    /// Something that causes harm.
    Threat,
    /// Something that can be harmed (infrastructure, population, system).
    Threatenable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_levels_are_ordered() {
        assert!(ImpactLevel::Low < ImpactLevel::Medium);
        assert!(ImpactLevel::High < ImpactLevel::Critical);
    }

    #[test]
    fn domain_serializes_snake_case() {
        let json = serde_json::to_string(&Domain::Radiological).ok();
        assert_eq!(json.as_deref(), Some("\"radiological\""));
        let custom: Result<Domain, _> = serde_json::from_str(r#"{"custom":"orbital"}"#);
        assert_eq!(custom.ok(), Some(Domain::Custom(String::from("orbital"))));
    }

    #[test]
    fn only_inequalities_need_ordering() {
        assert!(Comparison::Gt.is_ordering());
        assert!(Comparison::Le.is_ordering());
        assert!(!Comparison::Eq.is_ordering());
        assert!(!Comparison::Ne.is_ordering());
    }
}
