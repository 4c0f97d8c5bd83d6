//! Transcript model and coordinate engine.
//!
//! The model is built once at load time (or rehydrated from a snapshot) and
//! is immutable afterwards, so queries require no locking.

mod index;
mod transcript;

pub use index::IntervalIndex;
pub use transcript::{Exon, Strand, Transcript};

use ahash::AHashMap;
use indexmap::IndexMap;

/// All transcripts of an assembly, grouped by chromosome, with a per-chromosome
/// interval index for stabbing queries by genomic position.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TranscriptStore {
    /// Transcripts per chromosome, sorted ascending by start after `finalize`.
    by_chrom: IndexMap<String, Vec<Transcript>>,
    /// Interval index per chromosome, rebuilt after deserialization.
    #[serde(skip)]
    indices: AHashMap<String, IntervalIndex>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group the given transcripts by chromosome and build all indices.
    pub fn from_transcripts(transcripts: Vec<Transcript>) -> Self {
        let mut result = Self::new();
        for tx in transcripts {
            result.insert(tx);
        }
        result.finalize();
        result
    }

    /// Add a transcript; `finalize` must be called before querying.
    pub fn insert(&mut self, tx: Transcript) {
        self.by_chrom.entry(tx.chrom.clone()).or_default().push(tx);
    }

    /// Sort transcripts, compute per-transcript lookup tables, and build the
    /// interval index of every chromosome.  Must be called exactly once after
    /// the last `insert` and again after deserializing a snapshot.
    pub fn finalize(&mut self) {
        self.indices.clear();
        for (chrom, transcripts) in self.by_chrom.iter_mut() {
            transcripts.sort_by(|a, b| {
                a.start
                    .cmp(&b.start)
                    .then(a.end.cmp(&b.end))
                    .then_with(|| a.id.cmp(&b.id))
            });
            for tx in transcripts.iter_mut() {
                tx.finalize();
            }
            let intervals = transcripts
                .iter()
                .map(|tx| (tx.start, tx.end))
                .collect::<Vec<_>>();
            self.indices
                .insert(chrom.clone(), IntervalIndex::build(&intervals));
        }
    }

    /// Return all transcripts containing the given 1-based position.
    pub fn find_overlapping(&self, chrom: &str, pos: i64) -> Vec<&Transcript> {
        self.find_near(chrom, pos, 0)
    }

    /// Return all transcripts within `flank` bases of the given position.
    pub fn find_near(&self, chrom: &str, pos: i64, flank: i64) -> Vec<&Transcript> {
        let chrom = chrom.trim_start_matches("chr");
        let (Some(transcripts), Some(index)) = (self.by_chrom.get(chrom), self.indices.get(chrom))
        else {
            return Vec::new();
        };
        index
            .stab_with_flank(pos, flank)
            .into_iter()
            .map(|i| &transcripts[i])
            .collect()
    }

    /// Iterate over all transcripts in chromosome order.
    pub fn iter(&self) -> impl Iterator<Item = &Transcript> {
        self.by_chrom.values().flatten()
    }

    pub fn transcript_count(&self) -> usize {
        self.by_chrom.values().map(Vec::len).sum()
    }
}
