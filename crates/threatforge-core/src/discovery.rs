//! Emergence discovery: which rules fire for a set of component instances.
//!
//! Discovery walks every unordered pair of instances in insertion order and
//! evaluates the pair's rules in registration order, then evaluates pattern
//! rules once against the whole set. Every firing becomes its own
//! [`EmergentBehavior`]. The output is a pure function of the instances'
//! property values and the matrix, so repeated passes give identical lists.

use threatforge_types::{ComponentInstanceId, EmergentBehavior, EmergentBehaviorId, RuleId};
use tracing::{debug, info, warn};

use crate::condition::{Condition, all_hold};
use crate::config::{DiscoveryConfig, ImpactWeights};
use crate::error::ConditionError;
use crate::instance::ComponentInstance;
use crate::matrix::{InteractionMatrix, RegisteredPattern, RegisteredRule, TypePair};

/// A rule skipped because one of its conditions could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionFailure {
    /// The skipped rule.
    pub rule: RuleId,
    /// The skipped rule's name.
    pub rule_name: String,
    /// What went wrong.
    pub error: ConditionError,
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryOutcome {
    /// Emergent behaviors in discovery order, after caps.
    pub behaviors: Vec<EmergentBehavior>,
    /// Emergence score of `behaviors`.
    pub score: f64,
    /// Number of behaviors dropped by the caps.
    pub truncated: usize,
    /// Rules skipped because of malformed conditions.
    pub condition_errors: Vec<ConditionFailure>,
}

/// Evaluates the interaction matrix against component instances.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryEngine<'a> {
    matrix: &'a InteractionMatrix,
    config: &'a DiscoveryConfig,
}

impl<'a> DiscoveryEngine<'a> {
    /// Create an engine over `matrix`.
    pub const fn new(matrix: &'a InteractionMatrix, config: &'a DiscoveryConfig) -> Self {
        Self { matrix, config }
    }

    /// Full discovery pass over `instances`.
    pub fn discover(&self, instances: &[ComponentInstance], tick: u64) -> DiscoveryOutcome {
        let mut pass = Pass::new(tick);

        for (i, first) in instances.iter().enumerate() {
            for second in instances.iter().skip(i.saturating_add(1)) {
                let rules = self.matrix.rules_for(first.type_id(), second.type_id());
                pass.evaluate_pair(first, second, rules);
            }
        }
        for pattern in self.matrix.patterns() {
            pass.evaluate_pattern(pattern, instances);
        }

        self.finish(pass)
    }

    /// Discovery restricted to findings that involve `instances[new_index]`.
    ///
    /// Pairs are formed between the new instance and every other instance,
    /// in insertion order, using only rules that mention the new type.
    /// Patterns are evaluated only if they require the new type. Returns an
    /// empty outcome when `new_index` is out of range.
    pub fn discover_incremental(
        &self,
        instances: &[ComponentInstance],
        new_index: usize,
        tick: u64,
    ) -> DiscoveryOutcome {
        let Some(added) = instances.get(new_index) else {
            return DiscoveryOutcome::default();
        };
        let mut pass = Pass::new(tick);
        let involved = self.matrix.rules_involving(added.type_id());

        for (i, other) in instances.iter().enumerate() {
            if i == new_index {
                continue;
            }
            let pair = TypePair::new(added.type_id().clone(), other.type_id().clone());
            let rules = involved
                .iter()
                .copied()
                .filter(|registered| registered.pair == pair)
                .collect();
            if i < new_index {
                pass.evaluate_pair(other, added, rules);
            } else {
                pass.evaluate_pair(added, other, rules);
            }
        }
        for pattern in self.matrix.patterns() {
            if pattern.pattern.required_types.contains(added.type_id()) {
                pass.evaluate_pattern(pattern, instances);
            }
        }

        self.finish(pass)
    }

    fn finish(&self, pass: Pass) -> DiscoveryOutcome {
        let mut behaviors = pass.behaviors;
        let truncated = apply_caps(&mut behaviors, self.config);
        let score = emergence_score(&behaviors, &self.config.impact_weights);
        debug!(
            behaviors = behaviors.len(),
            score,
            truncated,
            condition_errors = pass.condition_errors.len(),
            "Discovery pass complete"
        );
        DiscoveryOutcome {
            behaviors,
            score,
            truncated,
            condition_errors: pass.condition_errors,
        }
    }
}

/// Accumulator for one discovery pass.
struct Pass {
    tick: u64,
    behaviors: Vec<EmergentBehavior>,
    condition_errors: Vec<ConditionFailure>,
}

impl Pass {
    const fn new(tick: u64) -> Self {
        Self {
            tick,
            behaviors: Vec::new(),
            condition_errors: Vec::new(),
        }
    }

    fn evaluate_pair(
        &mut self,
        first: &ComponentInstance,
        second: &ComponentInstance,
        rules: Vec<&RegisteredRule>,
    ) {
        let participants = [first, second];
        for registered in rules {
            let rule = &registered.rule;
            if !self.conditions_hold(registered.id, &rule.name, &rule.conditions, &participants) {
                continue;
            }
            let ids = vec![first.id(), second.id()];
            self.behaviors.push(EmergentBehavior {
                id: EmergentBehaviorId::derive(registered.id, &ids, self.tick),
                rule: registered.id,
                name: rule.name.clone(),
                description: rule.description.clone(),
                kind: rule.kind,
                impact: rule.impact,
                complexity: rule.emergent_complexity(),
                component_types: vec![first.type_id().clone(), second.type_id().clone()],
                participants: ids,
                effects: rule.effects.clone(),
                discovered_tick: self.tick,
            });
            debug!(rule = %registered.id, name = %rule.name, "Interaction rule fired");
        }
    }

    fn evaluate_pattern(&mut self, registered: &RegisteredPattern, instances: &[ComponentInstance]) {
        let pattern = &registered.pattern;
        let all_present = pattern
            .required_types
            .iter()
            .all(|required| instances.iter().any(|instance| instance.type_id() == required));
        if !all_present {
            return;
        }

        let participants: Vec<&ComponentInstance> = instances
            .iter()
            .filter(|instance| pattern.required_types.contains(instance.type_id()))
            .collect();
        if !self.conditions_hold(registered.id, &pattern.name, &pattern.conditions, &participants) {
            return;
        }

        let ids: Vec<ComponentInstanceId> = participants.iter().map(|instance| instance.id()).collect();
        self.behaviors.push(EmergentBehavior {
            id: EmergentBehaviorId::derive(registered.id, &ids, self.tick),
            rule: registered.id,
            name: pattern.name.clone(),
            description: pattern.description.clone(),
            kind: pattern.kind,
            impact: pattern.impact,
            complexity: pattern.complexity,
            component_types: pattern.required_types.iter().cloned().collect(),
            participants: ids,
            effects: pattern.effects.clone(),
            discovered_tick: self.tick,
        });
        debug!(rule = %registered.id, name = %pattern.name, "Pattern rule fired");
    }

    fn conditions_hold(
        &mut self,
        rule: RuleId,
        rule_name: &str,
        conditions: &[Condition],
        participants: &[&ComponentInstance],
    ) -> bool {
        match all_hold(conditions, participants) {
            Ok(holds) => holds,
            Err(error) => {
                warn!(%rule, rule_name, %error, "Condition evaluation failed, rule skipped");
                self.condition_errors.push(ConditionFailure {
                    rule,
                    rule_name: String::from(rule_name),
                    error,
                });
                false
            }
        }
    }
}

/// Sum of impact weight times complexity.
pub fn emergence_score(behaviors: &[EmergentBehavior], weights: &ImpactWeights) -> f64 {
    behaviors
        .iter()
        .map(|behavior| weights.weight(behavior.impact) * behavior.complexity)
        .sum()
}

/// Enforce the configured count and score caps in place.
///
/// Repeatedly drops the lowest-complexity behavior (the latest one on
/// ties) until both caps hold. Survivors keep their relative order.
/// Returns the number dropped.
pub fn apply_caps(behaviors: &mut Vec<EmergentBehavior>, config: &DiscoveryConfig) -> usize {
    let before = behaviors.len();
    loop {
        let over_count = config
            .max_emergent_behaviors
            .is_some_and(|max| behaviors.len() > max);
        let over_score = config
            .max_emergence_score
            .is_some_and(|max| emergence_score(behaviors, &config.impact_weights) > max);
        if !(over_count || over_score) {
            break;
        }
        let Some(victim) = lowest_complexity(behaviors) else {
            break;
        };
        behaviors.remove(victim);
    }

    let dropped = before.saturating_sub(behaviors.len());
    if dropped > 0 {
        info!(
            dropped,
            kept = behaviors.len(),
            "Emergent behaviors truncated by cap"
        );
    }
    dropped
}

fn lowest_complexity(behaviors: &[EmergentBehavior]) -> Option<usize> {
    behaviors
        .iter()
        .enumerate()
        .reduce(|lowest, candidate| {
            if candidate.1.complexity <= lowest.1.complexity {
                candidate
            } else {
                lowest
            }
        })
        .map(|(index, _)| index)
}
