//! Classification of a variant's effect on a single overlapping transcript.

use crate::{
    model::{Strand, Transcript},
    sequences::{complement, revcomp, translate_codon, trim_common_prefixes, trim_common_suffixes},
    variant::{Variant, VariantKind},
};

/// Maximum distance for `upstream_gene_variant` / `downstream_gene_variant`.
pub const UPSTREAM_DOWNSTREAM_RANGE: i64 = 5_000;
/// Intronic distance classified as splice donor/acceptor.
const SPLICE_SITE_RANGE: i64 = 2;
/// Intronic distance classified as splice region.
const SPLICE_REGION_RANGE: i64 = 8;
/// Exonic CDS bases next to an exon boundary that carry the splice-region tag.
const EXONIC_SPLICE_REGION_RANGE: i64 = 3;

/// Sequence Ontology consequence terms, ordered by decreasing severity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Consequence {
    #[strum(serialize = "splice_acceptor_variant")]
    #[serde(rename = "splice_acceptor_variant")]
    SpliceAcceptorVariant,
    #[strum(serialize = "splice_donor_variant")]
    #[serde(rename = "splice_donor_variant")]
    SpliceDonorVariant,
    #[strum(serialize = "stop_gained")]
    #[serde(rename = "stop_gained")]
    StopGained,
    #[strum(serialize = "frameshift_variant")]
    #[serde(rename = "frameshift_variant")]
    FrameshiftVariant,
    #[strum(serialize = "stop_lost")]
    #[serde(rename = "stop_lost")]
    StopLost,
    #[strum(serialize = "start_lost")]
    #[serde(rename = "start_lost")]
    StartLost,
    #[strum(serialize = "inframe_insertion")]
    #[serde(rename = "inframe_insertion")]
    InframeInsertion,
    #[strum(serialize = "inframe_deletion")]
    #[serde(rename = "inframe_deletion")]
    InframeDeletion,
    #[strum(serialize = "missense_variant")]
    #[serde(rename = "missense_variant")]
    MissenseVariant,
    #[strum(serialize = "splice_region_variant")]
    #[serde(rename = "splice_region_variant")]
    SpliceRegionVariant,
    #[strum(serialize = "synonymous_variant")]
    #[serde(rename = "synonymous_variant")]
    SynonymousVariant,
    #[strum(serialize = "coding_sequence_variant")]
    #[serde(rename = "coding_sequence_variant")]
    CodingSequenceVariant,
    #[strum(serialize = "5_prime_UTR_variant")]
    #[serde(rename = "5_prime_UTR_variant")]
    FivePrimeUtrVariant,
    #[strum(serialize = "3_prime_UTR_variant")]
    #[serde(rename = "3_prime_UTR_variant")]
    ThreePrimeUtrVariant,
    #[strum(serialize = "non_coding_transcript_exon_variant")]
    #[serde(rename = "non_coding_transcript_exon_variant")]
    NonCodingTranscriptExonVariant,
    #[strum(serialize = "intron_variant")]
    #[serde(rename = "intron_variant")]
    IntronVariant,
    #[strum(serialize = "non_coding_transcript_variant")]
    #[serde(rename = "non_coding_transcript_variant")]
    NonCodingTranscriptVariant,
    #[strum(serialize = "upstream_gene_variant")]
    #[serde(rename = "upstream_gene_variant")]
    UpstreamGeneVariant,
    #[strum(serialize = "downstream_gene_variant")]
    #[serde(rename = "downstream_gene_variant")]
    DownstreamGeneVariant,
    #[strum(serialize = "intergenic_variant")]
    #[serde(rename = "intergenic_variant")]
    IntergenicVariant,
}

impl Consequence {
    pub fn impact(&self) -> Impact {
        match self {
            Consequence::SpliceAcceptorVariant
            | Consequence::SpliceDonorVariant
            | Consequence::StopGained
            | Consequence::FrameshiftVariant
            | Consequence::StopLost
            | Consequence::StartLost => Impact::High,
            Consequence::InframeInsertion
            | Consequence::InframeDeletion
            | Consequence::MissenseVariant => Impact::Moderate,
            Consequence::SpliceRegionVariant | Consequence::SynonymousVariant => Impact::Low,
            _ => Impact::Modifier,
        }
    }
}

/// Ordinal severity bucket of a consequence term.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Impact {
    #[strum(serialize = "HIGH")]
    #[serde(rename = "HIGH")]
    High,
    #[strum(serialize = "MODERATE")]
    #[serde(rename = "MODERATE")]
    Moderate,
    #[strum(serialize = "LOW")]
    #[serde(rename = "LOW")]
    Low,
    #[strum(serialize = "MODIFIER")]
    #[serde(rename = "MODIFIER")]
    Modifier,
}

/// Result of classifying one variant against one transcript.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConsequenceResult {
    pub term: Consequence,
    /// Additional `splice_region_variant` tag for CDS variants within
    /// [`EXONIC_SPLICE_REGION_RANGE`] of an exon boundary.
    pub splice_region: bool,
    /// 1-based CDS position of the (first affected) base.
    pub cds_position: Option<i64>,
    /// 1-based codon index.
    pub protein_position: Option<i64>,
    /// Amino acid change, e.g. `G/C`; `G` when unchanged.
    pub amino_acids: Option<String>,
    /// Codon change, e.g. `GGT/TGT`.
    pub codons: Option<String>,
    pub exon_number: Option<u32>,
    pub intron_number: Option<u32>,
    /// Codons until the first downstream stop after a frameshift, counted
    /// from `protein_position`.
    pub fs_stop_distance: Option<i64>,
}

impl ConsequenceResult {
    fn of(term: Consequence) -> Self {
        Self {
            term,
            splice_region: false,
            cds_position: None,
            protein_position: None,
            amino_acids: None,
            codons: None,
            exon_number: None,
            intron_number: None,
            fs_stop_distance: None,
        }
    }

    pub fn impact(&self) -> Impact {
        self.term.impact()
    }
}

/// Variant edit reduced to the minimal changed bases.
///
/// `anchor` is the last genomic position before the change; the removed bases
/// (if any) start at `anchor + 1`.  Alleles are kept on the genomic forward
/// strand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReducedEdit {
    pub anchor: i64,
    pub removed: Vec<u8>,
    pub inserted: Vec<u8>,
}

impl ReducedEdit {
    pub fn from_variant(variant: &Variant) -> Self {
        let (prefix, reference, alternative) = trim_common_prefixes(
            variant.reference.as_bytes(),
            variant.alternative.as_bytes(),
        );
        let (_, removed, inserted) = trim_common_suffixes(&reference, &alternative);
        Self {
            anchor: variant.pos + prefix as i64 - 1,
            removed,
            inserted,
        }
    }

    /// Genomic span of the removed bases (empty for pure insertions).
    pub fn removed_span(&self) -> (i64, i64) {
        (self.anchor + 1, self.anchor + self.removed.len() as i64)
    }
}

/// Classify the effect of `variant` on `tx`.
///
/// The transcript is expected to be on the same chromosome; positions outside
/// the transcript are bucketed into upstream/downstream/intergenic in
/// transcript orientation.
pub fn classify(variant: &Variant, tx: &Transcript) -> ConsequenceResult {
    let pos = variant.effective_pos();

    if !tx.contains(pos) {
        return classify_flanking(pos, tx);
    }

    match tx.find_exon_idx(pos) {
        Some(exon_idx) => classify_exonic(variant, tx, pos, exon_idx),
        None => classify_intronic(tx, pos),
    }
}

fn classify_flanking(pos: i64, tx: &Transcript) -> ConsequenceResult {
    let distance = if pos < tx.start {
        tx.start - pos
    } else {
        pos - tx.end
    };
    if distance > UPSTREAM_DOWNSTREAM_RANGE {
        return ConsequenceResult::of(Consequence::IntergenicVariant);
    }
    let before = pos < tx.start;
    let term = if before == tx.strand.is_forward() {
        Consequence::UpstreamGeneVariant
    } else {
        Consequence::DownstreamGeneVariant
    };
    ConsequenceResult::of(term)
}

fn classify_intronic(tx: &Transcript, pos: i64) -> ConsequenceResult {
    let right = tx.exons.partition_point(|e| e.start <= pos);
    if right == 0 || right == tx.exons.len() {
        // Transcript bounds extend past the outermost exons.
        return ConsequenceResult::of(if tx.is_coding() {
            Consequence::IntronVariant
        } else {
            Consequence::NonCodingTranscriptVariant
        });
    }
    let left = right - 1;

    // The nearest exon decides the splice site: distance ties break toward
    // the transcript-upstream exon, whose boundary is the donor side.
    let nearest = tx.find_nearest_exon_idx(pos);
    let donor_side = (nearest == left) == tx.strand.is_forward();
    let distance = if nearest == left {
        pos - tx.exons[left].end
    } else {
        tx.exons[right].start - pos
    };

    let term = if distance <= SPLICE_SITE_RANGE {
        if donor_side {
            Consequence::SpliceDonorVariant
        } else {
            Consequence::SpliceAcceptorVariant
        }
    } else if distance <= SPLICE_REGION_RANGE {
        Consequence::SpliceRegionVariant
    } else if tx.is_coding() {
        Consequence::IntronVariant
    } else {
        Consequence::NonCodingTranscriptVariant
    };

    let mut result = ConsequenceResult::of(term);
    result.intron_number = Some(tx.intron_number(left));
    result
}

fn classify_exonic(
    variant: &Variant,
    tx: &Transcript,
    pos: i64,
    exon_idx: usize,
) -> ConsequenceResult {
    let exon_number = tx.exons[exon_idx].number;

    if !tx.is_coding() {
        let mut result = ConsequenceResult::of(Consequence::NonCodingTranscriptExonVariant);
        result.exon_number = Some(exon_number);
        return result;
    }

    if !tx.contains_cds(pos) {
        let five_prime = match tx.strand {
            Strand::Forward => pos < tx.cds_start,
            Strand::Reverse => pos > tx.cds_end,
        };
        let mut result = ConsequenceResult::of(if five_prime {
            Consequence::FivePrimeUtrVariant
        } else {
            Consequence::ThreePrimeUtrVariant
        });
        result.exon_number = Some(exon_number);
        return result;
    }

    classify_cds(variant, tx, pos, exon_idx)
}

fn classify_cds(
    variant: &Variant,
    tx: &Transcript,
    pos: i64,
    exon_idx: usize,
) -> ConsequenceResult {
    let cds = tx.genomic_to_cds(pos);
    let splice_region = exonic_splice_overlap(tx, exon_idx, pos);
    let exon_number = tx.exons[exon_idx].number;

    let mut result = match (&tx.cds_seq, variant.kind()) {
        // Missing CDS sequence degrades every CDS consequence to the coarse
        // category; the annotation keeps its coordinates but no HGVS strings.
        (None, _) => degraded(cds),
        (Some(_), VariantKind::Snv) => classify_snv(variant, tx, cds),
        (Some(_), _) => classify_cds_indel(variant, tx, cds),
    };

    result.splice_region = splice_region;
    result.exon_number = Some(exon_number);
    result
}

fn degraded(cds: i64) -> ConsequenceResult {
    let mut result = ConsequenceResult::of(Consequence::CodingSequenceVariant);
    result.cds_position = Some(cds);
    result.protein_position = Some((cds + 2) / 3);
    result
}

fn classify_snv(variant: &Variant, tx: &Transcript, cds: i64) -> ConsequenceResult {
    let cds_seq = tx.cds_seq.as_ref().expect("checked by caller");
    let cds0 = (cds - 1) as usize;
    let codon_start = (cds0 / 3) * 3;
    if codon_start + 3 > cds_seq.len() {
        return degraded(cds);
    }

    let ref_codon = &cds_seq[codon_start..codon_start + 3];
    let alt_base = match tx.strand {
        Strand::Forward => variant.alternative.as_bytes()[0],
        Strand::Reverse => complement(variant.alternative.as_bytes()[0]),
    };
    let mut alt_codon = [ref_codon[0], ref_codon[1], ref_codon[2]];
    alt_codon[cds0 % 3] = alt_base;

    let (Ok(ref_aa), Ok(alt_aa)) = (translate_codon(ref_codon), translate_codon(&alt_codon))
    else {
        return degraded(cds);
    };

    let protein_position = (cds0 / 3 + 1) as i64;
    let term = if ref_aa == alt_aa {
        Consequence::SynonymousVariant
    } else if alt_aa == b'*' {
        Consequence::StopGained
    } else if ref_aa == b'*' {
        Consequence::StopLost
    } else if protein_position == 1 && ref_aa == b'M' {
        Consequence::StartLost
    } else {
        Consequence::MissenseVariant
    };

    let mut result = ConsequenceResult::of(term);
    result.cds_position = Some(cds);
    result.protein_position = Some(protein_position);
    result.amino_acids = Some(if ref_aa == alt_aa {
        (ref_aa as char).to_string()
    } else {
        format!("{}/{}", ref_aa as char, alt_aa as char)
    });
    result.codons = Some(format!(
        "{}/{}",
        String::from_utf8_lossy(ref_codon),
        String::from_utf8_lossy(&alt_codon)
    ));
    result
}

fn classify_cds_indel(variant: &Variant, tx: &Transcript, cds: i64) -> ConsequenceResult {
    let cds_seq = tx.cds_seq.as_ref().expect("checked by caller");
    let edit = ReducedEdit::from_variant(variant);

    // Project the edit into transcript orientation.
    let inserted = match tx.strand {
        Strand::Forward => edit.inserted.clone(),
        Strand::Reverse => revcomp(&edit.inserted),
    };

    let (first_cds, removed_len) = if edit.removed.is_empty() {
        // Pure insertion: the first new base sits right after the anchor in
        // transcript orientation.
        let anchor_tx = match tx.strand {
            Strand::Forward => tx.genomic_to_cds(edit.anchor),
            Strand::Reverse => tx.genomic_to_cds(edit.anchor + 1),
        };
        if anchor_tx == 0 {
            return degraded(cds);
        }
        (anchor_tx + 1, 0usize)
    } else {
        let (del_start, del_end) = edit.removed_span();
        let (s, e) = match tx.strand {
            Strand::Forward => (tx.genomic_to_cds(del_start), tx.genomic_to_cds(del_end)),
            Strand::Reverse => (tx.genomic_to_cds(del_end), tx.genomic_to_cds(del_start)),
        };
        if s == 0 || e == 0 {
            // Span reaches outside the CDS; only the coarse category is safe.
            return degraded(cds);
        }
        // Counting removed bases in CDS space keeps the frame arithmetic
        // correct for spans that cross an intron.
        (s, (e - s + 1) as usize)
    };

    let s0 = (first_cds - 1) as usize;
    if s0 >= cds_seq.len() {
        return degraded(cds);
    }

    let net = inserted.len() as i64 - removed_len as i64;
    let term = if net % 3 != 0 {
        Consequence::FrameshiftVariant
    } else if edit.removed.is_empty() {
        Consequence::InframeInsertion
    } else if edit.inserted.is_empty() {
        Consequence::InframeDeletion
    } else if net > 0 {
        Consequence::InframeInsertion
    } else if net < 0 {
        Consequence::InframeDeletion
    } else {
        // Equal-length substitution: classify by the resulting protein change.
        return classify_delins(cds_seq, s0, &inserted, cds);
    };

    let mut result = ConsequenceResult::of(term);
    result.cds_position = Some(first_cds);
    result.protein_position = Some((s0 / 3 + 1) as i64);

    if term == Consequence::FrameshiftVariant {
        let (ref_aa, stop_distance) =
            frameshift_scan(tx, cds_seq, s0, removed_len, &inserted);
        result.amino_acids = ref_aa.map(|aa| (aa as char).to_string());
        result.fs_stop_distance = stop_distance;
    } else if let Some((ref_aas, alt_aas)) =
        inframe_protein_change(cds_seq, s0, removed_len, &inserted)
    {
        let ref_aas = if ref_aas.is_empty() { "-".to_string() } else { ref_aas };
        let alt_aas = if alt_aas.is_empty() { "-".to_string() } else { alt_aas };
        result.amino_acids = Some(format!("{}/{}", ref_aas, alt_aas));
    }

    result
}

/// Equal-length delins inside the CDS, classified by protein change.
fn classify_delins(cds_seq: &[u8], s0: usize, inserted: &[u8], cds: i64) -> ConsequenceResult {
    let Some((ref_aas, alt_aas)) = inframe_protein_change(cds_seq, s0, inserted.len(), inserted)
    else {
        return degraded(cds);
    };

    let term = if ref_aas == alt_aas {
        Consequence::SynonymousVariant
    } else if alt_aas.contains('*') && !ref_aas.contains('*') {
        Consequence::StopGained
    } else if ref_aas.contains('*') && !alt_aas.contains('*') {
        Consequence::StopLost
    } else {
        Consequence::MissenseVariant
    };

    let mut result = ConsequenceResult::of(term);
    result.cds_position = Some(s0 as i64 + 1);
    result.protein_position = Some((s0 / 3 + 1) as i64);
    result.amino_acids = Some(if ref_aas == alt_aas {
        ref_aas.clone()
    } else {
        format!("{}/{}", ref_aas, alt_aas)
    });
    let codon_start = (s0 / 3) * 3;
    let codon_end = (((s0 + inserted.len().max(1) - 1) / 3) + 1) * 3;
    if codon_end <= cds_seq.len() {
        let ref_span = &cds_seq[codon_start..codon_end];
        let mut alt_span = ref_span.to_vec();
        alt_span[(s0 - codon_start)..(s0 - codon_start + inserted.len())]
            .copy_from_slice(inserted);
        result.codons = Some(format!(
            "{}/{}",
            String::from_utf8_lossy(ref_span),
            String::from_utf8_lossy(&alt_span)
        ));
    }
    result
}

/// Translate the codon span affected by an in-frame edit.
///
/// `s0` is the 0-based CDS index of the first affected base; for pure
/// insertions it is the index of the first base following the anchor and
/// `removed_len` is 0.
fn inframe_protein_change(
    cds_seq: &[u8],
    s0: usize,
    removed_len: usize,
    inserted: &[u8],
) -> Option<(String, String)> {
    let last_affected = if removed_len > 0 {
        s0 + removed_len - 1
    } else {
        // The insertion point only touches the codon of the preceding base.
        s0.saturating_sub(1)
    };
    let codon_start = (s0.min(last_affected) / 3) * 3;
    let codon_end = ((last_affected / 3) + 1) * 3;
    if codon_end > cds_seq.len() {
        return None;
    }

    let ref_span = &cds_seq[codon_start..codon_end];
    let mut alt_span = Vec::with_capacity(ref_span.len() + inserted.len());
    alt_span.extend_from_slice(&cds_seq[codon_start..s0]);
    alt_span.extend_from_slice(inserted);
    alt_span.extend_from_slice(&cds_seq[(s0 + removed_len)..codon_end]);
    if alt_span.len() % 3 != 0 {
        return None;
    }

    let ref_aas = crate::sequences::translate_cds(ref_span).ok()?;
    let alt_aas = crate::sequences::translate_cds(&alt_span).ok()?;
    Some((
        String::from_utf8_lossy(&ref_aas).into_owned(),
        String::from_utf8_lossy(&alt_aas).into_owned(),
    ))
}

/// Scan for the first stop codon downstream of a frameshift, continuing into
/// the 3'UTR when attached.
///
/// Returns the reference amino acid of the first affected codon and the new
/// stop distance in codons (1-based, `None` when no stop is reached).
fn frameshift_scan(
    tx: &Transcript,
    cds_seq: &[u8],
    s0: usize,
    removed_len: usize,
    inserted: &[u8],
) -> (Option<u8>, Option<i64>) {
    let codon_start = (s0 / 3) * 3;
    let ref_aa = if codon_start + 3 <= cds_seq.len() {
        translate_codon(&cds_seq[codon_start..codon_start + 3]).ok()
    } else {
        None
    };

    let mut seq = cds_seq[codon_start..s0].to_vec();
    seq.extend_from_slice(inserted);
    let resume = s0 + removed_len;
    if resume < cds_seq.len() {
        seq.extend_from_slice(&cds_seq[resume..]);
    }
    if let Some(utr3) = &tx.utr3_seq {
        seq.extend_from_slice(utr3);
    }

    let mut stop_distance = None;
    for (i, chunk) in seq.chunks_exact(3).enumerate() {
        if translate_codon(chunk).ok() == Some(b'*') {
            stop_distance = Some(i as i64 + 1);
            break;
        }
    }

    (ref_aa, stop_distance)
}

fn exonic_splice_overlap(tx: &Transcript, exon_idx: usize, pos: i64) -> bool {
    let exon = &tx.exons[exon_idx];
    let near_start = exon_idx > 0 && pos - exon.start < EXONIC_SPLICE_REGION_RANGE;
    let near_end = exon_idx + 1 < tx.exons.len() && exon.end - pos < EXONIC_SPLICE_REGION_RANGE;
    near_start || near_end
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
