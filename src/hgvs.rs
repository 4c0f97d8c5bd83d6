//! Emission of HGVS coding-DNA notation (and a deliberately small protein
//! notation) for classified variants.
//!
//! All sequence strings are given on the coding strand, i.e.
//! reverse-complemented for reverse-strand transcripts.  Insertions and pure
//! deletions inside the CDS are 3'-shifted before emission and insertions are
//! rewritten as `dup` when they repeat an adjacent run.

use std::fmt::Write as _;

use crate::{
    consequence::{Consequence, ConsequenceResult, ReducedEdit},
    model::{Strand, Transcript},
    sequences::{aa1_to_aa3, complement, revcomp_into},
    variant::Variant,
    Sequence,
};

/// Region of a transcript a coding position falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingRegion {
    /// 5'UTR, rendered as `-<base>`.
    FivePrime,
    /// CDS proper, rendered as the plain CDS coordinate.
    Cds,
    /// 3'UTR, rendered as `*<base>`.
    ThreePrime,
    /// Non-coding transcript, plain transcript-relative coordinate (`n.`).
    NonCoding,
}

/// One HGVS position: a base coordinate relative to its region plus an
/// intronic offset (`0` for exonic positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingPos {
    pub base: i64,
    pub offset: i64,
    pub region: CodingRegion,
}

impl CodingPos {
    fn exonic_cds(base: i64) -> Self {
        Self {
            base,
            offset: 0,
            region: CodingRegion::Cds,
        }
    }

    /// Whether this is a plain exonic CDS position.
    fn in_cds(&self) -> bool {
        self.region == CodingRegion::Cds && self.offset == 0
    }
}

impl std::fmt::Display for CodingPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.region {
            CodingRegion::FivePrime => write!(f, "-{}", self.base)?,
            CodingRegion::ThreePrime => write!(f, "*{}", self.base)?,
            CodingRegion::Cds | CodingRegion::NonCoding => write!(f, "{}", self.base)?,
        }
        if self.offset != 0 {
            write!(f, "{:+}", self.offset)?;
        }
        Ok(())
    }
}

/// Map a genomic position to its HGVS coding position on `tx`.
///
/// Returns `None` for positions outside the transcript.
pub fn coding_pos(tx: &Transcript, pos: i64) -> Option<CodingPos> {
    if tx.find_exon_idx(pos).is_some() {
        Some(exonic_coding_pos(tx, pos))
    } else if tx.contains(pos) {
        Some(intronic_coding_pos(tx, pos))
    } else {
        None
    }
}

fn exonic_coding_pos(tx: &Transcript, pos: i64) -> CodingPos {
    if !tx.is_coding() {
        return CodingPos {
            base: tx.genomic_to_transcript(pos),
            offset: 0,
            region: CodingRegion::NonCoding,
        };
    }
    if tx.contains_cds(pos) {
        let cds = tx.genomic_to_cds(pos);
        if cds > 0 {
            return CodingPos::exonic_cds(cds);
        }
    }

    // UTR: count exonic bases between the position and the CDS boundary in
    // transcript orientation.
    let n = tx.genomic_to_transcript(pos);
    let (cds_first_g, cds_last_g) = match tx.strand {
        Strand::Forward => (tx.cds_start, tx.cds_end),
        Strand::Reverse => (tx.cds_end, tx.cds_start),
    };
    let five_prime = n < tx.genomic_to_transcript(cds_first_g);
    if five_prime {
        CodingPos {
            base: tx.genomic_to_transcript(cds_first_g) - n,
            offset: 0,
            region: CodingRegion::FivePrime,
        }
    } else {
        CodingPos {
            base: n - tx.genomic_to_transcript(cds_last_g),
            offset: 0,
            region: CodingRegion::ThreePrime,
        }
    }
}

fn intronic_coding_pos(tx: &Transcript, pos: i64) -> CodingPos {
    // The closer flank wins; ties go to the transcript-upstream exon, which
    // is the 5' flank the notation requires.
    let exon = &tx.exons[tx.find_nearest_exon_idx(pos)];
    let (boundary_g, genomic_offset) = if pos > exon.end {
        (exon.end, pos - exon.end)
    } else {
        (exon.start, pos - exon.start)
    };

    // The offset is positive when the position lies 3' of its flanking exon
    // in transcript orientation.
    let offset = match tx.strand {
        Strand::Forward => genomic_offset,
        Strand::Reverse => -genomic_offset,
    };

    let mut result = exonic_coding_pos(tx, boundary_g);
    result.offset = offset;
    result
}

/// Render the HGVS coding-DNA string for a classified variant.
///
/// Returns the empty string for variants outside the transcript
/// (upstream/downstream/intergenic).
pub fn hgvs_c(variant: &Variant, tx: &Transcript, result: &ConsequenceResult) -> String {
    if matches!(
        result.term,
        Consequence::UpstreamGeneVariant
            | Consequence::DownstreamGeneVariant
            | Consequence::IntergenicVariant
    ) {
        return String::new();
    }

    let prefix = if tx.is_coding() { "c." } else { "n." };
    let edit = ReducedEdit::from_variant(variant);
    let mut out = String::new();
    let mut buf: Sequence = Vec::new();

    match (edit.removed.len(), edit.inserted.len()) {
        (0, 0) => {}
        (1, 1) => emit_substitution(&mut out, prefix, tx, &edit),
        (0, _) => emit_insertion(&mut out, &mut buf, prefix, tx, &edit),
        (_, 0) => emit_deletion(&mut out, prefix, tx, &edit),
        (_, _) => emit_delins(&mut out, &mut buf, prefix, tx, &edit),
    }
    out
}

fn emit_substitution(out: &mut String, prefix: &str, tx: &Transcript, edit: &ReducedEdit) {
    let g = edit.anchor + 1;
    let Some(pos) = coding_pos(tx, g) else {
        return;
    };
    let (reference, alternative) = match tx.strand {
        Strand::Forward => (edit.removed[0], edit.inserted[0]),
        Strand::Reverse => (complement(edit.removed[0]), complement(edit.inserted[0])),
    };
    let _ = write!(
        out,
        "{}{}{}>{}",
        prefix, pos, reference as char, alternative as char
    );
}

fn emit_insertion(
    out: &mut String,
    buf: &mut Sequence,
    prefix: &str,
    tx: &Transcript,
    edit: &ReducedEdit,
) {
    // Flanking genomic bases in transcript orientation.
    let (before_g, after_g) = match tx.strand {
        Strand::Forward => (edit.anchor, edit.anchor + 1),
        Strand::Reverse => (edit.anchor + 1, edit.anchor),
    };
    let inserted: &[u8] = match tx.strand {
        Strand::Forward => &edit.inserted,
        Strand::Reverse => {
            revcomp_into(&edit.inserted, buf);
            buf
        }
    };

    let before_cds = tx.genomic_to_cds(before_g);
    let after_cds = tx.genomic_to_cds(after_g);
    if let Some(cds_seq) = tx
        .cds_seq
        .as_ref()
        .filter(|_| before_cds > 0 && after_cds == before_cds + 1)
    {
        // Fully inside the CDS: 3'-shift, then prefer `dup` over `ins`.
        let (anchor, shifted) = shift3_insertion(cds_seq, before_cds, inserted);
        let l = shifted.len() as i64;
        if anchor >= l && cds_seq[(anchor - l) as usize..anchor as usize] == shifted[..] {
            emit_dup(out, prefix, anchor - l + 1, anchor);
        } else if (anchor + l) as usize <= cds_seq.len()
            && cds_seq[anchor as usize..(anchor + l) as usize] == shifted[..]
        {
            emit_dup(out, prefix, anchor + 1, anchor + l);
        } else {
            let _ = write!(
                out,
                "{}{}_{}ins{}",
                prefix,
                anchor,
                anchor + 1,
                String::from_utf8_lossy(&shifted)
            );
        }
        return;
    }

    let (Some(before), Some(after)) = (coding_pos(tx, before_g), coding_pos(tx, after_g)) else {
        return;
    };

    // At a splice junction exactly one side is exonic; run the duplication
    // check against that flank.
    let l = inserted.len() as i64;
    if let Some(cds_seq) = &tx.cds_seq {
        if before.in_cds()
            && before.base >= l
            && cds_seq.len() as i64 >= before.base
            && cds_seq[(before.base - l) as usize..before.base as usize] == inserted[..]
        {
            emit_dup(out, prefix, before.base - l + 1, before.base);
            return;
        }
        if after.in_cds()
            && (after.base - 1 + l) as usize <= cds_seq.len()
            && cds_seq[(after.base - 1) as usize..(after.base - 1 + l) as usize] == inserted[..]
        {
            emit_dup(out, prefix, after.base, after.base + l - 1);
            return;
        }
    }

    let _ = write!(
        out,
        "{}{}_{}ins{}",
        prefix,
        before,
        after,
        String::from_utf8_lossy(inserted)
    );
}

fn emit_deletion(out: &mut String, prefix: &str, tx: &Transcript, edit: &ReducedEdit) {
    let (del_start_g, del_end_g) = edit.removed_span();
    let (first_g, last_g) = match tx.strand {
        Strand::Forward => (del_start_g, del_end_g),
        Strand::Reverse => (del_end_g, del_start_g),
    };
    let (Some(first), Some(last)) = (coding_pos(tx, first_g), coding_pos(tx, last_g)) else {
        return;
    };

    if let Some(cds_seq) = tx.cds_seq.as_ref().filter(|_| first.in_cds() && last.in_cds()) {
        let (s, e) = shift3_deletion(cds_seq, first.base, last.base);
        if s == e {
            let _ = write!(out, "{}{}del", prefix, s);
        } else {
            let _ = write!(out, "{}{}_{}del", prefix, s, e);
        }
        return;
    }

    if first == last {
        let _ = write!(out, "{}{}del", prefix, first);
    } else {
        let _ = write!(out, "{}{}_{}del", prefix, first, last);
    }
}

fn emit_delins(
    out: &mut String,
    buf: &mut Sequence,
    prefix: &str,
    tx: &Transcript,
    edit: &ReducedEdit,
) {
    let (del_start_g, del_end_g) = edit.removed_span();
    let (first_g, last_g) = match tx.strand {
        Strand::Forward => (del_start_g, del_end_g),
        Strand::Reverse => (del_end_g, del_start_g),
    };
    let (Some(first), Some(last)) = (coding_pos(tx, first_g), coding_pos(tx, last_g)) else {
        return;
    };
    let inserted: &[u8] = match tx.strand {
        Strand::Forward => &edit.inserted,
        Strand::Reverse => {
            revcomp_into(&edit.inserted, buf);
            buf
        }
    };

    if first == last {
        let _ = write!(
            out,
            "{}{}delins{}",
            prefix,
            first,
            String::from_utf8_lossy(inserted)
        );
    } else {
        let _ = write!(
            out,
            "{}{}_{}delins{}",
            prefix,
            first,
            last,
            String::from_utf8_lossy(inserted)
        );
    }
}

fn emit_dup(out: &mut String, prefix: &str, start: i64, end: i64) {
    if start == end {
        let _ = write!(out, "{}{}dup", prefix, start);
    } else {
        let _ = write!(out, "{}{}_{}dup", prefix, start, end);
    }
}

/// 3'-shift an insertion inside the CDS.
///
/// `anchor` is the 1-based CDS position of the base 5' of the insertion.
/// While the base following the anchor equals the first inserted base, the
/// inserted bases rotate left and the anchor advances; the result is the
/// rightmost equivalent representation.
fn shift3_insertion(cds_seq: &[u8], mut anchor: i64, inserted: &[u8]) -> (i64, Sequence) {
    let mut inserted = inserted.to_vec();
    while (anchor as usize) < cds_seq.len() && cds_seq[anchor as usize] == inserted[0] {
        inserted.rotate_left(1);
        anchor += 1;
    }
    (anchor, inserted)
}

/// 3'-shift a pure deletion inside the CDS, given 1-based CDS endpoints.
fn shift3_deletion(cds_seq: &[u8], mut s: i64, mut e: i64) -> (i64, i64) {
    while (e as usize) < cds_seq.len() && cds_seq[e as usize] == cds_seq[(s - 1) as usize] {
        s += 1;
        e += 1;
    }
    (s, e)
}

/// Render a small HGVS protein string for a classified variant.
///
/// Only the forms needed by the annotation output are produced; everything
/// else yields the empty string.
pub fn hgvs_p(result: &ConsequenceResult) -> String {
    let (Some(protein_position), Some(amino_acids)) =
        (result.protein_position, result.amino_acids.as_deref())
    else {
        return String::new();
    };

    let mut parts = amino_acids.splitn(2, '/');
    let ref_aas = parts.next().unwrap_or_default();
    let alt_aas = parts.next();

    let aa3 = |aas: &str| aa1_to_aa3(aas.as_bytes()).unwrap_or_else(|_| "Xaa".to_string());
    let first_ref = &ref_aas[..ref_aas.len().min(1)];

    match result.term {
        Consequence::StartLost => "p.Met1?".to_string(),
        Consequence::SynonymousVariant => format!("p.{}{}=", aa3(first_ref), protein_position),
        Consequence::MissenseVariant | Consequence::StopGained | Consequence::StopLost => {
            match alt_aas {
                Some(alt) => format!(
                    "p.{}{}{}",
                    aa3(first_ref),
                    protein_position,
                    aa3(&alt[..alt.len().min(1)])
                ),
                None => String::new(),
            }
        }
        Consequence::FrameshiftVariant => {
            format!("p.{}{}fs", aa3(first_ref), protein_position)
        }
        Consequence::InframeDeletion | Consequence::InframeInsertion => match alt_aas {
            Some("-") | None => {
                if ref_aas.len() <= 1 {
                    format!("p.{}{}del", aa3(first_ref), protein_position)
                } else {
                    format!(
                        "p.{}{}_{}{}del",
                        aa3(&ref_aas[..1]),
                        protein_position,
                        aa3(&ref_aas[ref_aas.len() - 1..]),
                        protein_position + ref_aas.len() as i64 - 1
                    )
                }
            }
            Some(alt) => format!(
                "p.{}{}delins{}",
                aa3(first_ref),
                protein_position,
                aa3(alt)
            ),
        },
        _ => String::new(),
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
