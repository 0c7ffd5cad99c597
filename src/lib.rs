pub mod classify;
pub mod fastq_reader; // batched FASTQ reader using bio::io::fastq
pub mod fm_index; // FM-index over the reversed reference (extension, SA walking)
pub mod index; // ClassifyIndex build/load/save and the Index contract
pub mod metrics;
pub mod read;
pub mod reference;
pub mod utils;
