//! End-to-end annotation scenarios on synthetic transcripts.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use vep::{
    annotate::{Annotator, Config},
    consequence::{Consequence, Impact},
    model::{Exon, Strand, Transcript, TranscriptStore},
    variant::Variant,
};

/// KRAS-like reverse-strand transcript on chromosome 12.
///
/// The CDS covers genomic 25245333-25245383 (51 bases, 17 codons); codon 12
/// is GGT (Gly) at CDS 34-36, i.e. genomic 25245350 carries the first codon
/// base on the coding strand.
fn kras_like() -> Transcript {
    let cds = b"ATGACTGAATATAAACTTGTGGTAGTTGGAGCTGGTGGCGTAGGCAAGAGT".to_vec();
    assert_eq!(cds.len(), 51);
    let mut tx = Transcript {
        id: "ENST00000311936".to_string(),
        gene_id: "ENSG00000133703".to_string(),
        gene_symbol: "KRAS".to_string(),
        gene_type: "protein_coding".to_string(),
        chrom: "12".to_string(),
        start: 25245274,
        end: 25250929,
        strand: Strand::Reverse,
        biotype: "protein_coding".to_string(),
        canonical: true,
        mane_select: true,
        cds_start: 25245333,
        cds_end: 25245383,
        exons: vec![
            Exon {
                number: 2,
                start: 25245274,
                end: 25245395,
                cds_start: 25245333,
                cds_end: 25245383,
                frame: 0,
            },
            Exon {
                number: 1,
                start: 25250751,
                end: 25250929,
                cds_start: 0,
                cds_end: 0,
                frame: -1,
            },
        ],
        cds_seq: Some(cds),
        ..Transcript::default()
    };
    tx.finalize();
    tx
}

/// Forward-strand transcript on chromosome 17 whose codon 19 is TAC; genomic
/// 7676154 carries its third base (C), so C>T is synonymous.
fn synonymous_like() -> Transcript {
    let mut cds = b"GCT".repeat(18);
    cds.extend_from_slice(b"TAC");
    cds.extend_from_slice(&b"GCA".repeat(81));
    cds.extend_from_slice(b"TAA");
    assert_eq!(cds.len(), 303);
    let mut tx = Transcript {
        id: "TX_SYN.1".to_string(),
        gene_id: "GENE_SYN".to_string(),
        gene_symbol: "SYN1".to_string(),
        gene_type: "protein_coding".to_string(),
        chrom: "17".to_string(),
        start: 7676000,
        end: 7676500,
        strand: Strand::Forward,
        biotype: "protein_coding".to_string(),
        canonical: true,
        cds_start: 7676098,
        cds_end: 7676400,
        exons: vec![Exon {
            number: 1,
            start: 7676000,
            end: 7676500,
            cds_start: 7676098,
            cds_end: 7676400,
            frame: 0,
        }],
        cds_seq: Some(cds),
        ..Transcript::default()
    };
    tx.finalize();
    tx
}

/// Forward-strand transcript on chromosome 17 with an `AAGT` run at CDS
/// 31-34; genomic 41234450 is CDS 31.
fn dup_like() -> Transcript {
    let mut cds = b"GCT".repeat(10);
    cds.extend_from_slice(b"AAGTTC");
    cds.extend_from_slice(&b"GCA".repeat(36));
    cds.extend_from_slice(b"TAA");
    assert_eq!(cds.len(), 147);
    let mut tx = Transcript {
        id: "TX_DUP.1".to_string(),
        gene_id: "GENE_DUP".to_string(),
        gene_symbol: "DUP1".to_string(),
        gene_type: "protein_coding".to_string(),
        chrom: "17".to_string(),
        start: 41234400,
        end: 41234600,
        strand: Strand::Forward,
        biotype: "protein_coding".to_string(),
        canonical: true,
        cds_start: 41234420,
        cds_end: 41234566,
        exons: vec![Exon {
            number: 1,
            start: 41234400,
            end: 41234600,
            cds_start: 41234420,
            cds_end: 41234566,
            frame: 0,
        }],
        cds_seq: Some(cds),
        ..Transcript::default()
    };
    tx.finalize();
    tx
}

/// Forward-strand transcript whose first coding exon ends at CDS 88.
fn splice_like() -> Transcript {
    let mut tx = Transcript {
        id: "TX_SPL.1".to_string(),
        gene_id: "GENE_SPL".to_string(),
        gene_symbol: "SPL1".to_string(),
        gene_type: "protein_coding".to_string(),
        chrom: "7".to_string(),
        start: 50000,
        end: 50400,
        strand: Strand::Forward,
        biotype: "protein_coding".to_string(),
        canonical: true,
        cds_start: 50013,
        cds_end: 50283,
        exons: vec![
            Exon {
                number: 1,
                start: 50000,
                end: 50100,
                cds_start: 50013,
                cds_end: 50100,
                frame: 0,
            },
            Exon {
                number: 2,
                start: 50200,
                end: 50400,
                cds_start: 50200,
                cds_end: 50283,
                frame: 2,
            },
        ],
        ..Transcript::default()
    };
    tx.finalize();
    tx
}

fn annotator() -> Annotator {
    Annotator::new(
        Arc::new(TranscriptStore::from_transcripts(vec![
            kras_like(),
            synonymous_like(),
            dup_like(),
            splice_like(),
        ])),
        Config::default(),
    )
}

#[test]
fn kras_g12c_missense_on_reverse_strand() -> Result<(), anyhow::Error> {
    let annotations = annotator().annotate(&Variant::new("12", 25245350, "C", "A"))?;

    assert_eq!(annotations.len(), 1);
    let annotation = &annotations[0];
    assert_eq!(annotation.transcript_id, "ENST00000311936");
    assert_eq!(annotation.gene_symbol, "KRAS");
    assert_eq!(annotation.consequence, Consequence::MissenseVariant);
    assert_eq!(annotation.impact, Impact::Moderate);
    assert_eq!(annotation.cds_position, Some(34));
    assert_eq!(annotation.protein_position, Some(12));
    assert_eq!(annotation.amino_acid_change.as_deref(), Some("G/C"));
    assert_eq!(annotation.codon_change.as_deref(), Some("GGT/TGT"));
    assert_eq!(annotation.hgvs_c, "c.34G>T");
    assert_eq!(annotation.hgvs_p, "p.Gly12Cys");
    assert!(annotation.canonical);
    assert_eq!(annotation.exon_number, Some(2));

    Ok(())
}

#[test]
fn synonymous_variant_in_coding_exon() -> Result<(), anyhow::Error> {
    let annotations = annotator().annotate(&Variant::new("17", 7676154, "C", "T"))?;

    let annotation = annotations
        .iter()
        .find(|a| a.transcript_id == "TX_SYN.1")
        .expect("transcript overlaps");
    assert_eq!(annotation.consequence, Consequence::SynonymousVariant);
    assert_eq!(annotation.impact, Impact::Low);
    assert_eq!(annotation.cds_position, Some(57));
    assert_eq!(annotation.hgvs_c, "c.57C>T");

    Ok(())
}

#[test]
fn insertion_preceded_by_equal_run_is_a_dup() -> Result<(), anyhow::Error> {
    let annotations = annotator().annotate(&Variant::new("17", 41234450, "A", "AAG"))?;

    let annotation = annotations
        .iter()
        .find(|a| a.transcript_id == "TX_DUP.1")
        .expect("transcript overlaps");
    // Two inserted bases shift the frame.
    assert_eq!(annotation.consequence, Consequence::FrameshiftVariant);
    assert_eq!(annotation.impact, Impact::High);
    // After the 3' shift the insertion repeats CDS 32-33 and must be a dup.
    assert_eq!(annotation.hgvs_c, "c.32_33dup");

    Ok(())
}

#[test]
fn reverse_strand_deletion_is_3prime_shifted() -> Result<(), anyhow::Error> {
    // Deleting one A of the AAA run at CDS 13-15 of the KRAS-like
    // transcript; genomic TT at 25245370-25245371 are coding CDS 14/13.
    let annotations = annotator().annotate(&Variant::new("12", 25245370, "TT", "T"))?;

    let annotation = &annotations[0];
    assert_eq!(annotation.consequence, Consequence::FrameshiftVariant);
    // Shifted from CDS 13 to the 3' end of the repeated run.
    assert_eq!(annotation.hgvs_c, "c.15del");

    Ok(())
}

#[test]
fn second_intronic_base_after_coding_exon_is_a_splice_donor() -> Result<(), anyhow::Error> {
    let annotations = annotator().annotate(&Variant::new("7", 50102, "A", "G"))?;

    let annotation = &annotations[0];
    assert_eq!(annotation.consequence, Consequence::SpliceDonorVariant);
    assert_eq!(annotation.impact, Impact::High);
    assert_eq!(annotation.intron_number, Some(1));
    assert_eq!(annotation.hgvs_c, "c.88+2A>G");
    assert_eq!(annotation.hgvs_p, "");

    Ok(())
}

#[test]
fn chromosome_without_transcripts_is_intergenic() -> Result<(), anyhow::Error> {
    let annotations = annotator().annotate(&Variant::new("20", 1_000_000, "A", "T"))?;

    assert_eq!(annotations.len(), 1);
    let annotation = &annotations[0];
    assert_eq!(annotation.consequence, Consequence::IntergenicVariant);
    assert_eq!(annotation.impact, Impact::Modifier);
    assert_eq!(annotation.transcript_id, "");
    assert_eq!(annotation.gene_symbol, "");
    assert_eq!(annotation.hgvs_c, "");
    assert_eq!(annotation.allele, "T");

    Ok(())
}
