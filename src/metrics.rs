// Monotone counters surfaced by the classifier core.
//
// Counters only ever increase; `merge` folds per-worker copies into a
// run-level total after parallel classification.

use std::fmt;

/// Counters from SA-range walking (coordinate materialization).
#[derive(Debug, Clone, Default)]
pub struct WalkMetrics {
    /// Sum of `bot - top` over every walked SA range.
    pub sa_range_total: u64,
    /// Reference coordinates actually materialized.
    pub coords_materialized: u64,
}

impl WalkMetrics {
    pub fn merge(&mut self, other: &WalkMetrics) {
        self.sa_range_total += other.sa_range_total;
        self.coords_materialized += other.coords_materialized;
    }
}

/// Per-run classifier counters.
#[derive(Debug, Clone, Default)]
pub struct ClassifyMetrics {
    /// Classification units processed (a unit is a read or a pair).
    pub units: u64,
    /// Units that produced at least one report record.
    pub classified: u64,
    /// Partial hits emitted on the selected strands.
    pub partial_hits: u64,
    /// Units whose hit iteration stopped on the dominance bound.
    pub early_stops: u64,
    /// Mates skipped because they were shorter than the minimum hit length.
    pub short_reads: u64,
    /// Coordinates skipped because their reference name carried no taxon id.
    pub taxa_missing: u64,
    pub walk: WalkMetrics,
}

impl ClassifyMetrics {
    pub fn merge(&mut self, other: &ClassifyMetrics) {
        self.units += other.units;
        self.classified += other.classified;
        self.partial_hits += other.partial_hits;
        self.early_stops += other.early_stops;
        self.short_reads += other.short_reads;
        self.taxa_missing += other.taxa_missing;
        self.walk.merge(&other.walk);
    }
}

/// End-of-run summary printed by the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub metrics: ClassifyMetrics,
    pub wall_time_secs: f64,
}

impl RunStats {
    pub fn units_per_second(&self) -> f64 {
        if self.wall_time_secs > 0.0 {
            self.metrics.units as f64 / self.wall_time_secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "classified {} of {} units in {:.2}s ({:.0} units/sec, {} coords walked, {} early stops)",
            self.metrics.classified,
            self.metrics.units,
            self.wall_time_secs,
            self.units_per_second(),
            self.metrics.walk.coords_materialized,
            self.metrics.early_stops
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_everything() {
        let mut a = ClassifyMetrics {
            units: 2,
            classified: 1,
            partial_hits: 10,
            early_stops: 1,
            short_reads: 0,
            taxa_missing: 3,
            walk: WalkMetrics {
                sa_range_total: 100,
                coords_materialized: 7,
            },
        };
        let b = ClassifyMetrics {
            units: 3,
            classified: 3,
            partial_hits: 5,
            early_stops: 0,
            short_reads: 2,
            taxa_missing: 0,
            walk: WalkMetrics {
                sa_range_total: 11,
                coords_materialized: 4,
            },
        };
        a.merge(&b);
        assert_eq!(a.units, 5);
        assert_eq!(a.classified, 4);
        assert_eq!(a.partial_hits, 15);
        assert_eq!(a.early_stops, 1);
        assert_eq!(a.short_reads, 2);
        assert_eq!(a.taxa_missing, 3);
        assert_eq!(a.walk.sa_range_total, 111);
        assert_eq!(a.walk.coords_materialized, 11);
    }
}
