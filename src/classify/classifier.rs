// Classifier kernel: strand election, seed ordering, coordinate
// materialization, taxon voting, early termination and report emission.
// All scratch state lives in the `Classifier` and is cleared, not freed,
// between classification units.

use crate::classify::hits::ReadBwtHit;
use crate::classify::search::search_forward_and_reverse;
use crate::classify::tally::{GenusMap, SpeciesCount};
use crate::index::{Index, IndexError};
use crate::metrics::ClassifyMetrics;
use crate::read::ReadSeq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Quadratic weight offset: a hit of length L votes with (L - 15)^2.
const WEIGHT_OFFSET: i64 = 15;

/// Which records a classification unit reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Every (genus, species) pair that received votes, in insertion order.
    #[default]
    AllSpecies,
    /// Only the maximum-weight genera (all ties), each with its best species.
    TopGenus,
}

#[derive(Debug, Clone)]
pub struct ClassifyOpts {
    /// Minimum partial-hit length that may contribute to the tally.
    pub min_hit_len: usize,
    /// Cap on materialized reference coordinates per unit.
    pub khits: usize,
    pub report_mode: ReportMode,
}

impl Default for ClassifyOpts {
    fn default() -> Self {
        ClassifyOpts {
            min_hit_len: 22,
            khits: 5,
            report_mode: ReportMode::AllSpecies,
        }
    }
}

/// One reported classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRecord {
    pub genus: u32,
    pub species: u32,
    pub score: u64,
}

/// Destination for classification records.
pub trait ReportSink {
    fn report(&mut self, rec: ClassifyRecord);
}

impl ReportSink for Vec<ClassifyRecord> {
    fn report(&mut self, rec: ClassifyRecord) {
        self.push(rec);
    }
}

/// Owns the per-unit scratch state; one instance per worker thread.
pub struct Classifier {
    opts: ClassifyOpts,
    genus_map: GenusMap,
    /// [mate][strand] hit lists, reused across units.
    hits: [[ReadBwtHit; 2]; 2],
    ties: Vec<usize>,
    pub metrics: ClassifyMetrics,
}

impl Classifier {
    pub fn new(opts: ClassifyOpts) -> Self {
        Classifier {
            opts,
            genus_map: GenusMap::default(),
            hits: Default::default(),
            ties: Vec::new(),
            metrics: ClassifyMetrics::default(),
        }
    }

    pub fn classify_one<I: Index, S: ReportSink>(
        &mut self,
        index: &I,
        read: &ReadSeq,
        rnd: &mut StdRng,
        sink: &mut S,
    ) -> Result<(), IndexError> {
        self.classify(index, &[read], rnd, sink)
    }

    /// Evidence from both mates accumulates into the same genus map; the
    /// tally is not reset between mates.
    pub fn classify_pair<I: Index, S: ReportSink>(
        &mut self,
        index: &I,
        read1: &ReadSeq,
        read2: &ReadSeq,
        rnd: &mut StdRng,
        sink: &mut S,
    ) -> Result<(), IndexError> {
        self.classify(index, &[read1, read2], rnd, sink)
    }

    fn classify<I: Index, S: ReportSink>(
        &mut self,
        index: &I,
        reads: &[&ReadSeq],
        rnd: &mut StdRng,
        sink: &mut S,
    ) -> Result<(), IndexError> {
        let Self {
            opts,
            genus_map,
            hits,
            ties,
            metrics,
        } = self;
        genus_map.clear();
        metrics.units += 1;

        let min_hit_len = opts.min_hit_len;
        let khits = opts.khits.max(1);
        let mut best: u64 = 0;
        let mut second: u64 = 0;

        for (rdi, &read) in reads.iter().enumerate() {
            if read.len() < min_hit_len {
                metrics.short_reads += 1;
                continue;
            }
            let mate_hits = &mut hits[rdi];
            search_forward_and_reverse(index, read, mate_hits, min_hit_len);

            let (fwi, totals) = select_strand(mate_hits, min_hit_len);
            let strand_hits = &mut mate_hits[fwi];
            metrics.partial_hits += strand_hits.hits.len() as u64;

            // cheap, informative seeds first: ascending occurrence count,
            // descending length, so the dominance bound can fire before the
            // expensive large ranges are walked
            strand_hits
                .hits
                .sort_by(|a, b| a.size().cmp(&b.size()).then(b.len.cmp(&a.len)));

            // NOTE: indexed by the inverted strand flag, as is the coordinate
            // strand below; the SA walker has always taken this orientation
            let total_hit_len = totals[usize::from(!strand_hits.fw)];
            let coord_strand = !strand_hits.fw;

            let mut used_portion: u64 = 0;
            let mut genome_hit_cnt: usize = 0;
            let last_mate = rdi + 1 == reads.len();

            for hi in 0..strand_hits.hits.len() {
                let hit_len = strand_hits.hits[hi].len;
                if hit_len < min_hit_len {
                    continue;
                }

                let remaining = khits - genome_hit_cnt;
                let ph = &mut strand_hits.hits[hi];
                ph.coords.clear();
                index.walk_sa(
                    ph.range,
                    hit_len,
                    coord_strand,
                    remaining,
                    rnd,
                    &mut metrics.walk,
                    &mut ph.coords,
                )?;
                if ph.coords.is_empty() {
                    continue;
                }
                used_portion += hit_len as u64;

                if genome_hit_cnt + ph.coords.len() > khits {
                    // adapter over-filled the budget: shuffle so the
                    // truncation below is an unbiased sample
                    ph.coords.shuffle(rnd);
                }

                let w = {
                    let l = hit_len as i64 - WEIGHT_OFFSET;
                    (l * l) as u64
                };
                for coord in ph.coords.iter() {
                    if genome_hit_cnt >= khits {
                        break;
                    }
                    genome_hit_cnt += 1;
                    let taxon = match index.taxon(coord.ref_id) {
                        Some(t) => t,
                        None => {
                            metrics.taxa_missing += 1;
                            continue;
                        }
                    };
                    let new_score = genus_map.add(taxon.genus, taxon.species, hi, w);
                    if new_score > best {
                        second = best;
                        best = new_score;
                    } else if new_score > second {
                        second = new_score;
                    }
                }

                if last_mate {
                    // even the whole remaining match budget at maximal
                    // per-base weight cannot close the gap
                    let rem = total_hit_len as i64 - used_portion as i64 - WEIGHT_OFFSET;
                    if best as i64 > (second as i64).saturating_add(rem * rem) {
                        metrics.early_stops += 1;
                        break;
                    }
                }
                if genome_hit_cnt >= khits {
                    break;
                }
            }
        }

        if !genus_map.is_empty() {
            metrics.classified += 1;
        }

        match opts.report_mode {
            ReportMode::AllSpecies => {
                for g in genus_map.entries() {
                    for s in &g.species {
                        sink.report(ClassifyRecord {
                            genus: g.id,
                            species: s.id,
                            score: g.weighted_count + s.weighted_count,
                        });
                    }
                }
            }
            ReportMode::TopGenus => {
                ties.clear();
                let mut best_weight: u64 = 0;
                for (gi, g) in genus_map.entries().iter().enumerate() {
                    if g.weighted_count > best_weight {
                        best_weight = g.weighted_count;
                        ties.clear();
                        ties.push(gi);
                    } else if g.weighted_count == best_weight {
                        ties.push(gi);
                    }
                }
                for &gi in ties.iter() {
                    let g = &genus_map.entries()[gi];
                    let mut best_species: Option<&SpeciesCount> = None;
                    for s in &g.species {
                        if best_species.map_or(true, |b| s.weighted_count > b.weighted_count) {
                            best_species = Some(s);
                        }
                    }
                    if let Some(s) = best_species {
                        sink.report(ClassifyRecord {
                            genus: g.id,
                            species: s.id,
                            score: g.weighted_count + s.weighted_count,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Pick the strand with the higher mean qualifying-hit length; ties go to
/// the reverse complement. Returns the chosen strand index and both strands'
/// total qualifying hit lengths.
pub(crate) fn select_strand(hits: &[ReadBwtHit; 2], min_hit_len: usize) -> (usize, [u64; 2]) {
    let mut totals = [0u64; 2];
    let mut avg = [0u64; 2];
    for (fwi, strand) in hits.iter().enumerate() {
        let mut n = 0u64;
        for h in &strand.hits {
            if h.len < min_hit_len {
                continue;
            }
            totals[fwi] += h.len as u64;
            n += 1;
        }
        if n > 0 {
            avg[fwi] = totals[fwi] / n;
        }
    }
    let fwi = if avg[0] > avg[1] { 0 } else { 1 };
    (fwi, totals)
}
