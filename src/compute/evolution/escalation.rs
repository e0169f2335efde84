//! Secondary-objective escalation: switch on tie-breaking objectives once
//! the search has used enough budget or stopped making progress.

use crate::schema::EscalationConfig;

use super::candidate::Genome;
use super::objective::ObjectiveSet;

/// Decides when secondary objectives join the active set.
#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    config: EscalationConfig,
}

impl EscalationPolicy {
    pub fn new(config: EscalationConfig) -> Self {
        Self { config }
    }

    /// Whether activation waits for a budget or starvation threshold.
    pub fn is_deferred(&self) -> bool {
        self.config.enable_after > 0.0 || self.config.starvation_after.is_some()
    }

    /// Pure activation rule over starvation count and consumed budget fraction.
    pub fn should_activate(&self, starvation: usize, progress: f64) -> bool {
        progress >= self.config.enable_after
            && self
                .config
                .starvation_after
                .is_none_or(|needed| starvation >= needed)
    }

    /// Run-start adjustment: deferred secondaries start inactive, immediate
    /// ones start active. Returns how many were activated.
    pub fn prepare<G: Genome>(&self, objectives: &mut ObjectiveSet<G>) -> usize {
        if self.is_deferred() {
            objectives.deactivate_secondaries();
            0
        } else {
            objectives.activate_secondaries()
        }
    }

    /// Iteration-boundary check. Activation is irreversible and idempotent;
    /// returns how many objectives were newly activated.
    pub fn apply<G: Genome>(
        &self,
        objectives: &mut ObjectiveSet<G>,
        starvation: usize,
        progress: f64,
    ) -> usize {
        if objectives.active_secondary_count() == objectives.secondary_count() {
            return 0;
        }
        if !self.should_activate(starvation, progress) {
            return 0;
        }

        let activated = objectives.activate_secondaries();
        if activated > 0 {
            log::info!(
                "Activated {} secondary objective(s) at progress {:.2}, starvation {}",
                activated,
                progress,
                starvation
            );
        }
        activated
    }
}
