//! Transcript and exon entities with genomic/CDS/transcript coordinate
//! conversions.

use crate::Sequence;

/// Strand of a transcript on the reference assembly.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Strand {
    #[default]
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn is_forward(&self) -> bool {
        matches!(self, Strand::Forward)
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// A single exon of a transcript.
///
/// `number` is the biological exon number (1-based in transcript 5'->3'
/// order), so numbering runs opposite to storage order on the reverse strand.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Exon {
    pub number: u32,
    /// 1-based inclusive genomic start.
    pub start: i64,
    /// 1-based inclusive genomic end.
    pub end: i64,
    /// Genomic start of the coding portion, 0 if none.
    pub cds_start: i64,
    /// Genomic end of the coding portion, 0 if none.
    pub cds_end: i64,
    /// Reading frame of the first coding base, `-1` for non-coding exons.
    pub frame: i8,
}

impl Exon {
    pub fn is_coding(&self) -> bool {
        self.cds_start > 0 && self.cds_end > 0
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }

    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn cds_len(&self) -> i64 {
        if self.is_coding() {
            self.cds_end - self.cds_start + 1
        } else {
            0
        }
    }
}

/// Coding region of one exon with its cumulative CDS offset.
///
/// `offset` is the total CDS length of all regions that come strictly earlier
/// in transcript order, which makes genomic<->CDS translation a binary search
/// plus one addition.
#[derive(Debug, Default, Clone)]
struct CdsRegion {
    start: i64,
    end: i64,
    offset: i64,
}

/// A transcript with its exon structure and optional attached sequences.
///
/// Instances are mutable only during loading; `finalize` computes the lookup
/// tables and afterwards the transcript is treated as immutable.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    /// Stable transcript id, possibly with version suffix (`ENST….4`).
    pub id: String,
    pub gene_id: String,
    pub gene_symbol: String,
    /// Gene-level biotype from the annotation source.
    pub gene_type: String,
    /// Chromosome without `chr` prefix.
    pub chrom: String,
    /// 1-based inclusive transcript start.
    pub start: i64,
    /// 1-based inclusive transcript end.
    pub end: i64,
    pub strand: Strand,
    /// Transcript-level biotype, e.g. `protein_coding`.
    pub biotype: String,
    pub canonical: bool,
    pub mane_select: bool,
    /// Genomic CDS start, 0 for non-coding transcripts.
    pub cds_start: i64,
    /// Genomic CDS end, 0 for non-coding transcripts.
    pub cds_end: i64,
    /// Exons in ascending genomic order.
    pub exons: Vec<Exon>,
    /// Coding sequence in transcript orientation, including the stop codon.
    pub cds_seq: Option<Sequence>,
    /// 3'UTR sequence in transcript orientation, used for stop scans after
    /// frameshifts.
    pub utr3_seq: Option<Sequence>,
    /// Translated protein sequence without terminal stop.
    pub protein_seq: Option<Sequence>,

    #[serde(skip)]
    cds_regions: Vec<CdsRegion>,
    /// Cumulative exonic base count before each exon in transcript order,
    /// parallel to `exons`.
    #[serde(skip)]
    exon_offsets: Vec<i64>,
}

impl Transcript {
    /// Transcript id with any version suffix stripped.
    pub fn base_id(&self) -> &str {
        self.id.split('.').next().unwrap_or(&self.id)
    }

    /// Protein-coding iff both CDS bounds are set.
    pub fn is_coding(&self) -> bool {
        self.cds_start > 0 && self.cds_end > 0
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }

    pub fn contains_cds(&self, pos: i64) -> bool {
        self.is_coding() && pos >= self.cds_start && pos <= self.cds_end
    }

    /// Total CDS length in bases.
    pub fn cds_len(&self) -> i64 {
        self.exons.iter().map(Exon::cds_len).sum()
    }

    /// Sort exons and compute the cumulative offset tables.  Must be called
    /// once after construction or deserialization, before any coordinate
    /// query.
    pub fn finalize(&mut self) {
        self.exons.sort_by_key(|e| e.start);

        self.cds_regions = self
            .exons
            .iter()
            .filter(|e| e.is_coding())
            .map(|e| CdsRegion {
                start: e.cds_start,
                end: e.cds_end,
                offset: 0,
            })
            .collect();
        let mut running = 0;
        match self.strand {
            Strand::Forward => {
                for region in self.cds_regions.iter_mut() {
                    region.offset = running;
                    running += region.end - region.start + 1;
                }
            }
            Strand::Reverse => {
                for region in self.cds_regions.iter_mut().rev() {
                    region.offset = running;
                    running += region.end - region.start + 1;
                }
            }
        }

        self.exon_offsets = vec![0; self.exons.len()];
        let mut running = 0;
        match self.strand {
            Strand::Forward => {
                for i in 0..self.exons.len() {
                    self.exon_offsets[i] = running;
                    running += self.exons[i].len();
                }
            }
            Strand::Reverse => {
                for i in (0..self.exons.len()).rev() {
                    self.exon_offsets[i] = running;
                    running += self.exons[i].len();
                }
            }
        }
    }

    /// Map a genomic position to the 1-based CDS position, 0 when the
    /// position does not fall into any coding region.
    pub fn genomic_to_cds(&self, pos: i64) -> i64 {
        let idx = self.cds_regions.partition_point(|r| r.start <= pos);
        if idx == 0 {
            return 0;
        }
        let region = &self.cds_regions[idx - 1];
        if pos > region.end {
            return 0;
        }
        match self.strand {
            Strand::Forward => region.offset + (pos - region.start) + 1,
            Strand::Reverse => region.offset + (region.end - pos) + 1,
        }
    }

    /// Inverse of `genomic_to_cds` for valid CDS positions.
    pub fn cds_to_genomic(&self, cds: i64) -> Option<i64> {
        for region in &self.cds_regions {
            let len = region.end - region.start + 1;
            if cds > region.offset && cds <= region.offset + len {
                return Some(match self.strand {
                    Strand::Forward => region.start + (cds - region.offset) - 1,
                    Strand::Reverse => region.end - (cds - region.offset) + 1,
                });
            }
        }
        None
    }

    /// Map a genomic position to the 1-based transcript-relative position
    /// (exonic bases only), 0 when the position is not exonic.
    pub fn genomic_to_transcript(&self, pos: i64) -> i64 {
        let Some(idx) = self.find_exon_idx(pos) else {
            return 0;
        };
        let exon = &self.exons[idx];
        match self.strand {
            Strand::Forward => self.exon_offsets[idx] + (pos - exon.start) + 1,
            Strand::Reverse => self.exon_offsets[idx] + (exon.end - pos) + 1,
        }
    }

    /// Storage index of the exon containing `pos`, tolerating both ascending
    /// and descending stored orderings.
    pub fn find_exon_idx(&self, pos: i64) -> Option<usize> {
        if self.exons.is_empty() {
            return None;
        }
        let ascending =
            self.exons.len() < 2 || self.exons[0].start <= self.exons[self.exons.len() - 1].start;
        let candidate = if ascending {
            let idx = self.exons.partition_point(|e| e.start <= pos);
            idx.checked_sub(1)?
        } else {
            let idx = self.exons.partition_point(|e| e.start > pos);
            if idx == self.exons.len() {
                return None;
            }
            idx
        };
        self.exons[candidate].contains(pos).then_some(candidate)
    }

    /// Exon containing `pos`, if any.
    pub fn find_exon(&self, pos: i64) -> Option<&Exon> {
        self.find_exon_idx(pos).map(|i| &self.exons[i])
    }

    /// Storage index of the exon nearest to `pos`.  For intronic positions
    /// the closer flanking exon wins, ties break toward the exon that is
    /// upstream in transcript order.
    pub fn find_nearest_exon_idx(&self, pos: i64) -> usize {
        if let Some(idx) = self.find_exon_idx(pos) {
            return idx;
        }
        let right = self.exons.partition_point(|e| e.start <= pos);
        if right == 0 {
            return 0;
        }
        if right == self.exons.len() {
            return self.exons.len() - 1;
        }
        let left = right - 1;
        let dist_left = pos - self.exons[left].end;
        let dist_right = self.exons[right].start - pos;
        match self.strand {
            Strand::Forward => {
                if dist_left <= dist_right {
                    left
                } else {
                    right
                }
            }
            Strand::Reverse => {
                if dist_right <= dist_left {
                    right
                } else {
                    left
                }
            }
        }
    }

    /// Biological number of the intron between storage exons `left_idx` and
    /// `left_idx + 1`.
    pub fn intron_number(&self, left_idx: usize) -> u32 {
        self.exons[left_idx]
            .number
            .min(self.exons[left_idx + 1].number)
    }

    /// Base at the given 1-based CDS position, if the CDS sequence is
    /// attached and long enough.
    pub fn cds_base(&self, cds: i64) -> Option<u8> {
        if cds < 1 {
            return None;
        }
        self.cds_seq
            .as_ref()
            .and_then(|seq| seq.get(cds as usize - 1))
            .copied()
    }
}


// <LICENSE>
// Copyright 2026 vep Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
// </LICENSE>
