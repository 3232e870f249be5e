//! The interaction matrix: rules keyed by unordered component type pairs.
//!
//! Pair rules are stored under a canonical (sorted) [`TypePair`] so that
//! `(A, B)` and `(B, A)` resolve to the same list. Several rules may exist
//! for one pair; they are kept in registration order, which is also the
//! tie-break order used by discovery. Higher-order [`PatternRule`]s are
//! stored alongside and share the same [`RuleId`] counter.

use std::collections::{BTreeMap, BTreeSet};

use threatforge_types::{ComponentTypeId, EmergentEffect, ImpactLevel, InteractionKind, RuleId};

use crate::condition::Condition;
use crate::error::MatrixError;

/// Minimum number of distinct types in a pattern rule.
pub const MIN_PATTERN_TYPES: usize = 3;

/// A rule describing how two component types interact.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRule {
    /// Name given to emergent behaviors produced by this rule.
    pub name: String,
    /// Description of the resulting emergent effect.
    pub description: String,
    /// Interaction kind.
    pub kind: InteractionKind,
    /// Multiplier applied to the rule's complexity.
    pub strength: f64,
    /// Conditions that must all hold for the rule to fire.
    pub conditions: Vec<Condition>,
    /// Impact classification of produced behaviors.
    pub impact: ImpactLevel,
    /// Base complexity of produced behaviors.
    pub complexity: f64,
    /// Effects applied to the entity when the rule fires.
    pub effects: Vec<EmergentEffect>,
}

impl InteractionRule {
    /// An unconditional rule with unit strength and complexity.
    pub fn new(name: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            strength: 1.0,
            conditions: Vec::new(),
            impact: ImpactLevel::Medium,
            complexity: 1.0,
            effects: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a trigger condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the strength multiplier.
    #[must_use]
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Set the impact level.
    #[must_use]
    pub fn with_impact(mut self, impact: ImpactLevel) -> Self {
        self.impact = impact;
        self
    }

    /// Set the base complexity.
    #[must_use]
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    /// Add an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: EmergentEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Complexity of a behavior produced by this rule.
    pub fn emergent_complexity(&self) -> f64 {
        self.complexity * self.strength
    }

    /// Reject NaN, infinite or negative strength, complexity and effect
    /// multipliers.
    pub fn validate(&self) -> Result<(), MatrixError> {
        check_amount(&self.name, "strength", self.strength)?;
        check_amount(&self.name, "complexity", self.complexity)?;
        check_effects(&self.name, &self.effects)
    }
}

/// A rule that fires when three or more specific types are present
/// together.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    /// Name given to the produced emergent behavior.
    pub name: String,
    /// Description of the resulting effect.
    pub description: String,
    /// Interaction kind.
    pub kind: InteractionKind,
    /// Types that must all be present.
    pub required_types: BTreeSet<ComponentTypeId>,
    /// Conditions over the required types' instances.
    pub conditions: Vec<Condition>,
    /// Impact classification.
    pub impact: ImpactLevel,
    /// Complexity of the produced behavior.
    pub complexity: f64,
    /// Effects applied to the entity.
    pub effects: Vec<EmergentEffect>,
}

impl PatternRule {
    /// An unconditional pattern over `required_types`.
    pub fn new<I, T>(name: impl Into<String>, kind: InteractionKind, required_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ComponentTypeId>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            required_types: required_types.into_iter().map(Into::into).collect(),
            conditions: Vec::new(),
            impact: ImpactLevel::High,
            complexity: 1.0,
            effects: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a trigger condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the impact level.
    #[must_use]
    pub fn with_impact(mut self, impact: ImpactLevel) -> Self {
        self.impact = impact;
        self
    }

    /// Set the complexity.
    #[must_use]
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    /// Add an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: EmergentEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Reject a NaN, infinite or negative complexity or effect multiplier.
    pub fn validate(&self) -> Result<(), MatrixError> {
        check_amount(&self.name, "complexity", self.complexity)?;
        check_effects(&self.name, &self.effects)
    }
}

fn check_amount(rule: &str, field: &str, value: f64) -> Result<(), MatrixError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MatrixError::InvalidRule {
            name: String::from(rule),
            reason: format!("{field} must be finite and non-negative, got {value}"),
        })
    }
}

fn check_effects(rule: &str, effects: &[EmergentEffect]) -> Result<(), MatrixError> {
    for effect in effects {
        match effect {
            EmergentEffect::SpreadMultiplier(factor) => {
                check_amount(rule, "spread multiplier", *factor)?;
            }
            EmergentEffect::IntensityMultiplier(factor) => {
                check_amount(rule, "intensity multiplier", *factor)?;
            }
            EmergentEffect::Label(_) => {}
        }
    }
    Ok(())
}

/// Canonical unordered pair of component types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypePair {
    low: ComponentTypeId,
    high: ComponentTypeId,
}

impl TypePair {
    /// Build the canonical pair for `a` and `b` in either order.
    pub fn new(a: ComponentTypeId, b: ComponentTypeId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Whether `type_id` is one of the pair.
    pub fn contains(&self, type_id: &ComponentTypeId) -> bool {
        self.low == *type_id || self.high == *type_id
    }

    /// Whether both members are the same type.
    pub fn is_self_interaction(&self) -> bool {
        self.low == self.high
    }

    /// The two members in canonical order.
    pub const fn members(&self) -> (&ComponentTypeId, &ComponentTypeId) {
        (&self.low, &self.high)
    }
}

/// A pair rule as stored in the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredRule {
    /// Registration-ordered identifier.
    pub id: RuleId,
    /// The canonical pair this rule applies to.
    pub pair: TypePair,
    /// The rule itself.
    pub rule: InteractionRule,
}

/// A pattern rule as stored in the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredPattern {
    /// Registration-ordered identifier.
    pub id: RuleId,
    /// The pattern itself.
    pub pattern: PatternRule,
}

/// Lookup of interaction rules by type pair.
#[derive(Debug, Default)]
pub struct InteractionMatrix {
    /// All pair rules in registration order.
    rules: Vec<RegisteredRule>,
    /// Canonical pair -> positions in `rules`.
    by_pair: BTreeMap<TypePair, Vec<usize>>,
    /// Type -> positions in `rules` of every rule mentioning it.
    by_type: BTreeMap<ComponentTypeId, Vec<usize>>,
    /// Pattern rules in registration order.
    patterns: Vec<RegisteredPattern>,
    /// Type -> numeric `(property, threshold)` pairs from all conditions
    /// targeting it.
    thresholds: BTreeMap<ComponentTypeId, Vec<(String, f64)>>,
    /// Next rule identifier.
    next_id: u32,
}

impl InteractionMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for the unordered pair `(type_a, type_b)`.
    pub fn add_rule(
        &mut self,
        type_a: ComponentTypeId,
        type_b: ComponentTypeId,
        rule: InteractionRule,
    ) -> Result<RuleId, MatrixError> {
        rule.validate()?;
        let id = self.allocate_id();
        let pair = TypePair::new(type_a, type_b);
        let position = self.rules.len();

        self.record_thresholds(&rule.conditions);
        self.by_pair.entry(pair.clone()).or_default().push(position);
        let (low, high) = pair.members();
        self.by_type.entry(low.clone()).or_default().push(position);
        if !pair.is_self_interaction() {
            self.by_type.entry(high.clone()).or_default().push(position);
        }
        self.rules.push(RegisteredRule { id, pair, rule });
        Ok(id)
    }

    /// Append a higher-order pattern rule.
    pub fn add_pattern(&mut self, pattern: PatternRule) -> Result<RuleId, MatrixError> {
        if pattern.required_types.len() < MIN_PATTERN_TYPES {
            return Err(MatrixError::PatternTooSmall {
                name: pattern.name,
                count: pattern.required_types.len(),
            });
        }
        pattern.validate()?;
        let id = self.allocate_id();
        self.record_thresholds(&pattern.conditions);
        self.patterns.push(RegisteredPattern { id, pattern });
        Ok(id)
    }

    /// Rules for the unordered pair, in registration order.
    ///
    /// An empty list means the types do not interact.
    pub fn rules_for(&self, type_a: &ComponentTypeId, type_b: &ComponentTypeId) -> Vec<&RegisteredRule> {
        let pair = TypePair::new(type_a.clone(), type_b.clone());
        self.by_pair
            .get(&pair)
            .map(|positions| self.resolve(positions))
            .unwrap_or_default()
    }

    /// Every rule mentioning `type_id`, in registration order.
    pub fn rules_involving(&self, type_id: &ComponentTypeId) -> Vec<&RegisteredRule> {
        self.by_type
            .get(type_id)
            .map(|positions| self.resolve(positions))
            .unwrap_or_default()
    }

    /// Pattern rules in registration order.
    pub fn patterns(&self) -> &[RegisteredPattern] {
        &self.patterns
    }

    /// Numeric thresholds declared on conditions targeting `type_id`.
    pub fn thresholds_for(&self, type_id: &ComponentTypeId) -> &[(String, f64)] {
        self.thresholds
            .get(type_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of pair rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Number of pattern rules.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    fn allocate_id(&mut self) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn resolve(&self, positions: &[usize]) -> Vec<&RegisteredRule> {
        positions.iter().filter_map(|&i| self.rules.get(i)).collect()
    }

    fn record_thresholds(&mut self, conditions: &[Condition]) {
        for condition in conditions {
            let Some(threshold) = condition.numeric_threshold() else {
                continue;
            };
            let entry = self.thresholds.entry(condition.target.clone()).or_default();
            let known = entry
                .iter()
                .any(|(property, t)| *property == condition.property && t.total_cmp(&threshold).is_eq());
            if !known {
                entry.push((condition.property.clone(), threshold));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use threatforge_types::Comparison;

    use super::*;

    fn id(s: &str) -> ComponentTypeId {
        ComponentTypeId::from(s)
    }

    #[test]
    fn lookup_is_symmetric() {
        let mut matrix = InteractionMatrix::new();
        matrix.add_rule(id("b"), id("a"), InteractionRule::new("ab", InteractionKind::Synergy)).unwrap();

        let forward = matrix.rules_for(&id("a"), &id("b"));
        let backward = matrix.rules_for(&id("b"), &id("a"));
        assert_eq!(forward.len(), 1);
        assert_eq!(forward, backward);
    }

    #[test]
    fn rules_for_same_pair_are_appended_in_order() {
        let mut matrix = InteractionMatrix::new();
        let first = matrix
            .add_rule(id("a"), id("b"), InteractionRule::new("one", InteractionKind::Synergy))
            .unwrap();
        let second = matrix
            .add_rule(id("b"), id("a"), InteractionRule::new("two", InteractionKind::Conflict))
            .unwrap();

        let rules = matrix.rules_for(&id("a"), &id("b"));
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, first);
        assert_eq!(rules[1].id, second);
        assert!(first < second);
    }

    #[test]
    fn missing_pair_is_empty_not_error() {
        let matrix = InteractionMatrix::new();
        assert!(matrix.rules_for(&id("a"), &id("z")).is_empty());
    }

    #[test]
    fn rules_involving_covers_both_sides_and_self_pairs() {
        let mut matrix = InteractionMatrix::new();
        matrix.add_rule(id("a"), id("b"), InteractionRule::new("ab", InteractionKind::Synergy)).unwrap();
        matrix.add_rule(id("c"), id("a"), InteractionRule::new("ca", InteractionKind::Cascade)).unwrap();
        matrix.add_rule(id("a"), id("a"), InteractionRule::new("aa", InteractionKind::Synergy)).unwrap();
        matrix.add_rule(id("b"), id("c"), InteractionRule::new("bc", InteractionKind::Conflict)).unwrap();

        let names: Vec<_> = matrix
            .rules_involving(&id("a"))
            .iter()
            .map(|r| r.rule.name.clone())
            .collect();
        assert_eq!(names, vec!["ab", "ca", "aa"]);
    }

    #[test]
    fn pattern_needs_three_types() {
        let mut matrix = InteractionMatrix::new();
        let small = PatternRule::new("pair", InteractionKind::Synergy, ["a", "b"]);
        assert!(matches!(
            matrix.add_pattern(small),
            Err(MatrixError::PatternTooSmall { count: 2, .. })
        ));
        let ok = PatternRule::new("trio", InteractionKind::Synergy, ["a", "b", "c"]);
        assert!(matrix.add_pattern(ok).is_ok());
        assert_eq!(matrix.pattern_count(), 1);
    }

    #[test]
    fn thresholds_are_indexed_by_target_type() {
        let mut matrix = InteractionMatrix::new();
        let rule = InteractionRule::new("hot", InteractionKind::Synergy)
            .with_condition(Condition::new("a", "intensity", Comparison::Gt, 0.5))
            .with_condition(Condition::new("b", "armed", Comparison::Eq, true));
        matrix.add_rule(id("a"), id("b"), rule.clone()).unwrap();
        matrix.add_rule(id("a"), id("c"), rule).unwrap();

        assert_eq!(matrix.thresholds_for(&id("a")), &[(String::from("intensity"), 0.5)]);
        assert!(matrix.thresholds_for(&id("b")).is_empty());
    }

    #[test]
    fn emergent_complexity_scales_with_strength() {
        let rule = InteractionRule::new("r", InteractionKind::Synergy)
            .with_complexity(2.0)
            .with_strength(1.5);
        assert!((rule.emergent_complexity() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_rule_values_are_rejected() {
        let mut matrix = InteractionMatrix::new();
        let nan_strength = InteractionRule::new("nan", InteractionKind::Synergy).with_strength(f64::NAN);
        let infinite = InteractionRule::new("inf", InteractionKind::Synergy).with_complexity(f64::INFINITY);
        let negative = InteractionRule::new("neg", InteractionKind::Synergy).with_complexity(-1.0);
        let bad_effect = InteractionRule::new("effect", InteractionKind::Synergy)
            .with_effect(EmergentEffect::IntensityMultiplier(f64::NAN));

        for rule in [nan_strength, infinite, negative, bad_effect] {
            assert!(matches!(
                matrix.add_rule(id("a"), id("b"), rule),
                Err(MatrixError::InvalidRule { .. })
            ));
        }
        assert_eq!(matrix.rule_count(), 0);
        assert!(matrix.rules_involving(&id("a")).is_empty());
    }

    #[test]
    fn invalid_pattern_is_rejected_without_consuming_an_id() {
        let mut matrix = InteractionMatrix::new();
        let bad = PatternRule::new("trio", InteractionKind::Cascade, ["a", "b", "c"])
            .with_effect(EmergentEffect::SpreadMultiplier(f64::INFINITY));
        assert!(matches!(matrix.add_pattern(bad), Err(MatrixError::InvalidRule { .. })));
        assert_eq!(matrix.pattern_count(), 0);

        let first = matrix
            .add_rule(id("a"), id("b"), InteractionRule::new("ok", InteractionKind::Synergy))
            .unwrap();
        assert_eq!(first, RuleId(0));
    }
}
