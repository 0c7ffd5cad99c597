// Two-level weighted tally of taxon votes.
//
// The genus and species maps are ordered sequences scanned linearly; per-read
// cardinality is expected in the tens, where a scan beats a hash table.
// Dedup: each partial hit may vote at most once per genus and once per
// species, enforced by stamping entries with the hit index.

/// Per-species vote counters inside one genus bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesCount {
    pub id: u32,
    /// Distinct partial hits that voted for this species.
    pub count: u32,
    pub weighted_count: u64,
    /// Index of the partial hit that last incremented the counters.
    pub time_stamp: usize,
}

/// Genus bucket: its own counters plus the species living under it.
#[derive(Debug, Default)]
pub struct GenusCount {
    pub id: u32,
    pub count: u32,
    pub weighted_count: u64,
    pub time_stamp: usize,
    pub species: Vec<SpeciesCount>,
}

/// Insertion-ordered genus buckets, cleared (not freed) between reads.
/// Species vectors from drained buckets are pooled for reuse.
#[derive(Debug, Default)]
pub struct GenusMap {
    entries: Vec<GenusCount>,
    spare_species: Vec<Vec<SpeciesCount>>,
}

impl GenusMap {
    pub fn clear(&mut self) {
        for mut g in self.entries.drain(..) {
            g.species.clear();
            self.spare_species.push(std::mem::take(&mut g.species));
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn entries(&self) -> &[GenusCount] {
        &self.entries
    }

    /// Record one reference occurrence of partial hit `hi` with weight `w`.
    /// Returns the species' weighted count after the update, or 0 when this
    /// hit already voted for the species from another occurrence.
    pub fn add(&mut self, genus_id: u32, species_id: u32, hi: usize, w: u64) -> u64 {
        let gi = match self.entries.iter().position(|g| g.id == genus_id) {
            Some(gi) => {
                let g = &mut self.entries[gi];
                if g.time_stamp != hi {
                    g.count += 1;
                    g.weighted_count += w;
                    g.time_stamp = hi;
                }
                gi
            }
            None => {
                let mut species = self.spare_species.pop().unwrap_or_default();
                species.clear();
                self.entries.push(GenusCount {
                    id: genus_id,
                    count: 1,
                    weighted_count: w,
                    time_stamp: hi,
                    species,
                });
                self.entries.len() - 1
            }
        };

        let g = &mut self.entries[gi];
        match g.species.iter_mut().find(|s| s.id == species_id) {
            Some(s) => {
                if s.time_stamp != hi {
                    s.count += 1;
                    s.weighted_count += w;
                    s.time_stamp = hi;
                    s.weighted_count
                } else {
                    0
                }
            }
            None => {
                g.species.push(SpeciesCount {
                    id: species_id,
                    count: 1,
                    weighted_count: w,
                    time_stamp: hi,
                });
                w
            }
        }
    }
}
