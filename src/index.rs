// ClassifyIndex: the FM-index plus the reference dictionary, with build
// and single-file persistence. The classifier core is written against the
// `Index` trait so it never names the concrete structure.

use crate::fm_index::{FmIndex, SaRange};
use crate::metrics::WalkMetrics;
use crate::read::encode_base;
use crate::reference::{RefDict, TaxonId};
use crate::utils::{BinaryRead, BinaryWrite};
use bio::io::fasta;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const INDEX_MAGIC: u32 = u32::from_le_bytes(*b"TXC1");
pub const INDEX_VERSION: u32 = 1;

/// Fixed seed for ambiguous-base replacement so index builds are reproducible.
const AMBIG_SEED: u64 = 11;

/// One materialized reference coordinate of a partial hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coord {
    pub ref_id: u32,
    pub ref_offset: u64,
    pub strand: bool,
}

/// Structural index failures. Local conditions (empty ranges, missing taxa)
/// are not errors; these abort the read.
#[derive(Debug)]
pub enum IndexError {
    Io(io::Error),
    BadMagic(u32),
    BadVersion(u32),
    NoReferences,
    InvertedRange { top: u64, bot: u64 },
    OffsetOutOfRange { pos: u64, text_len: u64 },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Io(err) => write!(f, "I/O error: {}", err),
            IndexError::BadMagic(m) => write!(f, "not a taxoclass index (magic {:#010x})", m),
            IndexError::BadVersion(v) => write!(f, "unsupported index version {}", v),
            IndexError::NoReferences => write!(f, "reference set is empty"),
            IndexError::InvertedRange { top, bot } => {
                write!(f, "inverted SA range: top {} > bot {}", top, bot)
            }
            IndexError::OffsetOutOfRange { pos, text_len } => {
                write!(f, "walked offset {} outside reference text of {} bases", pos, text_len)
            }
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for IndexError {
    fn from(err: io::Error) -> Self {
        IndexError::Io(err)
    }
}

/// Contract the classifier consumes: extend a query by one base, walk an SA
/// range out to reference coordinates, resolve names and taxa.
pub trait Index {
    /// SA range of the empty query.
    fn init_range(&self) -> SaRange;

    /// Narrow `range` by one 2-bit query base; codes >= 4 never match.
    fn extend_right(&self, range: SaRange, base: u8) -> SaRange;

    /// Materialize up to `max_elements` coordinates for a match of
    /// `match_len` bases with SA range `range`, appending to `out`. When the
    /// range holds more occurrences than `max_elements`, a random subset is
    /// drawn from the full range.
    #[allow(clippy::too_many_arguments)]
    fn walk_sa(
        &self,
        range: SaRange,
        match_len: usize,
        strand: bool,
        max_elements: usize,
        rnd: &mut StdRng,
        wlm: &mut WalkMetrics,
        out: &mut Vec<Coord>,
    ) -> Result<(), IndexError>;

    fn reference_count(&self) -> usize;

    fn reference_name(&self, ref_id: u32) -> &str;

    /// Taxon ids decoded from the reference name at build time; `None` when
    /// the name was unparsable.
    fn taxon(&self, ref_id: u32) -> Option<TaxonId>;
}

#[derive(Debug)]
pub struct ClassifyIndex {
    fm: FmIndex,
    refs: RefDict,
}

impl ClassifyIndex {
    /// Build from named reference sequences (raw ASCII bases). Ambiguous
    /// bases are replaced with seeded-random ones so they never produce
    /// spurious exact matches deterministically absent from the input.
    pub fn build<I>(records: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut refs = RefDict::default();
        let mut text: Vec<u8> = Vec::new();
        let mut rng = StdRng::seed_from_u64(AMBIG_SEED);
        let mut ambiguous = 0u64;
        for (name, seq) in records {
            refs.push(name, seq.len() as u64);
            for &b in &seq {
                let code = encode_base(b);
                if code < 4 {
                    text.push(code);
                } else {
                    ambiguous += 1;
                    text.push(rng.gen_range(0..4u8));
                }
            }
        }
        if refs.ref_count() == 0 {
            return Err(IndexError::NoReferences);
        }
        if ambiguous > 0 {
            log::debug!("replaced {} ambiguous reference bases", ambiguous);
        }
        Ok(ClassifyIndex {
            fm: FmIndex::build(&text),
            refs,
        })
    }

    /// Build from a multi-FASTA whose headers carry leading taxon integers.
    pub fn build_from_fasta(path: &Path) -> Result<Self, IndexError> {
        let reader = fasta::Reader::new(crate::utils::xzopen(path)?);
        let mut records = Vec::new();
        for rec in reader.records() {
            let rec =
                rec.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            records.push((rec.id().to_string(), rec.seq().to_vec()));
        }
        Self::build(records)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.save(&mut w)
    }

    pub fn save<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32_le(INDEX_MAGIC)?;
        w.write_u32_le(INDEX_VERSION)?;
        self.fm.save(w)?;
        self.refs.save(w)
    }

    pub fn load_from(path: &Path) -> Result<Self, IndexError> {
        let mut r = BufReader::new(File::open(path)?);
        Self::load(&mut r)
    }

    pub fn load<R: Read>(r: &mut R) -> Result<Self, IndexError> {
        let magic = r.read_u32_le()?;
        if magic != INDEX_MAGIC {
            return Err(IndexError::BadMagic(magic));
        }
        let version = r.read_u32_le()?;
        if version != INDEX_VERSION {
            return Err(IndexError::BadVersion(version));
        }
        let fm = FmIndex::load(r)?;
        let refs = RefDict::load(r)?;
        Ok(ClassifyIndex { fm, refs })
    }

    fn push_coord(
        &self,
        row: u64,
        match_len: usize,
        strand: bool,
        out: &mut Vec<Coord>,
    ) -> Result<(), IndexError> {
        let n = self.fm.text_len();
        let q = self.fm.sa_value(row);
        let len = match_len as u64;
        if q + len > n {
            return Err(IndexError::OffsetOutOfRange { pos: q, text_len: n });
        }
        // sa_value is an offset into the reversed text; the match starts at
        // n - q - len on the forward strand
        let start = n - q - len;
        let (ref_id, ref_offset) = self
            .refs
            .pos_to_ref(start)
            .ok_or(IndexError::OffsetOutOfRange { pos: start, text_len: n })?;
        out.push(Coord {
            ref_id,
            ref_offset,
            strand,
        });
        Ok(())
    }
}

impl Index for ClassifyIndex {
    #[inline]
    fn init_range(&self) -> SaRange {
        self.fm.full_range()
    }

    #[inline]
    fn extend_right(&self, range: SaRange, base: u8) -> SaRange {
        self.fm.extend_right(range, base)
    }

    fn walk_sa(
        &self,
        range: SaRange,
        match_len: usize,
        strand: bool,
        max_elements: usize,
        rnd: &mut StdRng,
        wlm: &mut WalkMetrics,
        out: &mut Vec<Coord>,
    ) -> Result<(), IndexError> {
        if range.bot < range.top {
            return Err(IndexError::InvertedRange {
                top: range.top,
                bot: range.bot,
            });
        }
        let size = range.size();
        if size == 0 || max_elements == 0 {
            return Ok(());
        }
        wlm.sa_range_total += size;

        let nelt = (size as usize).min(max_elements);
        if nelt as u64 == size {
            for row in range.top..range.bot {
                self.push_coord(row, match_len, strand, out)?;
            }
        } else {
            for i in rand::seq::index::sample(rnd, size as usize, nelt).iter() {
                self.push_coord(range.top + i as u64, match_len, strand, out)?;
            }
        }
        wlm.coords_materialized += nelt as u64;
        Ok(())
    }

    #[inline]
    fn reference_count(&self) -> usize {
        self.refs.ref_count()
    }

    #[inline]
    fn reference_name(&self, ref_id: u32) -> &str {
        self.refs.name(ref_id)
    }

    #[inline]
    fn taxon(&self, ref_id: u32) -> Option<TaxonId> {
        self.refs.taxon(ref_id)
    }
}
