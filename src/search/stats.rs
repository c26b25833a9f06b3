use serde::Serialize;
use std::time::Duration;

/// Counters collected during one search run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStatistics {
    /// Candidate trials (branching decisions tried).
    pub nodes: u64,
    /// Choice points exhausted and popped.
    pub backtracks: u64,
    /// Forced assignments made by unit propagation.
    pub propagations: u64,
    /// Trials that wiped out another session's domain.
    pub prunings_infeasible: u64,
    /// Trials cut because they could not beat the incumbent.
    pub prunings_bound: u64,
    /// Improving solutions found.
    pub solutions_found: u64,
    /// Deepest choice-point stack reached.
    pub max_depth: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl SearchStatistics {
    #[inline]
    pub(crate) fn on_node(&mut self) {
        self.nodes = self.nodes.saturating_add(1);
    }

    #[inline]
    pub(crate) fn on_backtrack(&mut self) {
        self.backtracks = self.backtracks.saturating_add(1);
    }

    #[inline]
    pub(crate) fn on_pruning_infeasible(&mut self) {
        self.prunings_infeasible = self.prunings_infeasible.saturating_add(1);
    }

    #[inline]
    pub(crate) fn on_pruning_bound(&mut self) {
        self.prunings_bound = self.prunings_bound.saturating_add(1);
    }

    #[inline]
    pub(crate) fn on_solution(&mut self) {
        self.solutions_found = self.solutions_found.saturating_add(1);
    }

    #[inline]
    pub(crate) fn on_depth(&mut self, depth: usize) {
        self.max_depth = self.max_depth.max(depth as u64);
    }

    /// Adds another run's counters (used when a re-optimization falls back
    /// to a second search).
    pub fn absorb(&mut self, other: &SearchStatistics) {
        self.nodes = self.nodes.saturating_add(other.nodes);
        self.backtracks = self.backtracks.saturating_add(other.backtracks);
        self.propagations = self.propagations.saturating_add(other.propagations);
        self.prunings_infeasible = self
            .prunings_infeasible
            .saturating_add(other.prunings_infeasible);
        self.prunings_bound = self.prunings_bound.saturating_add(other.prunings_bound);
        self.solutions_found = self.solutions_found.saturating_add(other.solutions_found);
        self.max_depth = self.max_depth.max(other.max_depth);
        self.elapsed += other.elapsed;
    }
}

impl std::fmt::Display for SearchStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Search statistics:")?;
        writeln!(f, "  Nodes:                 {}", self.nodes)?;
        writeln!(f, "  Backtracks:            {}", self.backtracks)?;
        writeln!(f, "  Propagations:          {}", self.propagations)?;
        writeln!(f, "  Prunings (infeasible): {}", self.prunings_infeasible)?;
        writeln!(f, "  Prunings (bound):      {}", self.prunings_bound)?;
        writeln!(f, "  Solutions found:       {}", self.solutions_found)?;
        writeln!(f, "  Max depth:             {}", self.max_depth)?;
        writeln!(f, "  Elapsed:               {:.2?}", self.elapsed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_absorb() {
        let mut a = SearchStatistics::default();
        a.on_node();
        a.on_node();
        a.on_depth(3);
        a.on_solution();
        let mut b = SearchStatistics::default();
        b.on_node();
        b.on_backtrack();
        b.on_depth(5);
        a.absorb(&b);
        assert_eq!(a.nodes, 3);
        assert_eq!(a.backtracks, 1);
        assert_eq!(a.max_depth, 5);
        assert_eq!(a.solutions_found, 1);
        assert!(a.to_string().contains("Nodes:                 3"));
    }
}
