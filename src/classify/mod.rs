// Seed-voting classification core.

pub mod classifier;
pub mod driver;
pub mod hits;
pub mod search;
pub mod tally;

pub use classifier::{Classifier, ClassifyOpts, ClassifyRecord, ReportMode, ReportSink};
pub use driver::{classify_reads, ClassifyError, DriverOpts};
pub use hits::{PartialHit, ReadBwtHit};
pub use tally::{GenusCount, GenusMap, SpeciesCount};
