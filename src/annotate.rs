//! Assembly of per-transcript annotations for single variants.

use std::sync::Arc;

use crate::{
    consequence::{classify, Consequence, ConsequenceResult, Impact},
    hgvs::{hgvs_c, hgvs_p},
    model::{Transcript, TranscriptStore},
    variant::Variant,
};

/// Externally supplied missense pathogenicity enrichment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AlphaMissense {
    pub score: f64,
    pub class: String,
}

/// One annotation record per (variant, transcript) pair.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    pub transcript_id: String,
    pub gene_id: String,
    pub gene_symbol: String,
    pub gene_type: String,
    pub consequence: Consequence,
    /// Secondary terms, currently only the splice-region overlap tag.
    pub additional_consequences: Vec<Consequence>,
    pub impact: Impact,
    pub canonical: bool,
    pub cds_position: Option<i64>,
    pub protein_position: Option<i64>,
    pub amino_acid_change: Option<String>,
    pub codon_change: Option<String>,
    pub hgvs_c: String,
    pub hgvs_p: String,
    pub exon_number: Option<u32>,
    pub intron_number: Option<u32>,
    pub allele: String,
    pub biotype: String,
    pub alpha_missense: Option<AlphaMissense>,
}

impl Annotation {
    fn from_parts(variant: &Variant, tx: &Transcript, result: &ConsequenceResult) -> Self {
        let additional = if result.splice_region {
            vec![Consequence::SpliceRegionVariant]
        } else {
            Vec::new()
        };
        Self {
            transcript_id: tx.id.clone(),
            gene_id: tx.gene_id.clone(),
            gene_symbol: tx.gene_symbol.clone(),
            gene_type: tx.gene_type.clone(),
            consequence: result.term,
            additional_consequences: additional,
            impact: result.impact(),
            canonical: tx.canonical,
            cds_position: result.cds_position,
            protein_position: result.protein_position,
            amino_acid_change: result.amino_acids.clone(),
            codon_change: result.codons.clone(),
            hgvs_c: hgvs_c(variant, tx, result),
            hgvs_p: hgvs_p(result),
            exon_number: result.exon_number,
            intron_number: result.intron_number,
            allele: variant.alternative.clone(),
            biotype: tx.biotype.clone(),
            alpha_missense: None,
        }
    }

    /// Annotation for a variant that overlaps nothing.
    fn intergenic(variant: &Variant) -> Self {
        Self {
            transcript_id: String::new(),
            gene_id: String::new(),
            gene_symbol: String::new(),
            gene_type: String::new(),
            consequence: Consequence::IntergenicVariant,
            additional_consequences: Vec::new(),
            impact: Impact::Modifier,
            canonical: false,
            cds_position: None,
            protein_position: None,
            amino_acid_change: None,
            codon_change: None,
            hgvs_c: String::new(),
            hgvs_p: String::new(),
            exon_number: None,
            intron_number: None,
            allele: variant.alternative.clone(),
            biotype: String::new(),
            alpha_missense: None,
        }
    }

    /// All consequence terms joined with `&`, primary first.
    pub fn consequence_terms(&self) -> String {
        let mut result = self.consequence.to_string();
        for term in &self.additional_consequences {
            result.push('&');
            result.push_str(&term.to_string());
        }
        result
    }
}

/// Configuration for the annotator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Restrict output to canonical transcripts, falling back to the best
    /// transcript when no overlapping transcript is canonical.
    pub canonical_only: bool,
    /// Flank within which upstream/downstream annotations are produced.
    pub flank: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canonical_only: false,
            flank: crate::consequence::UPSTREAM_DOWNSTREAM_RANGE,
        }
    }
}

/// Annotates variants against an immutable transcript store.
///
/// The annotator only reads shared state and is safe to call concurrently
/// from multiple threads.
pub struct Annotator {
    store: Arc<TranscriptStore>,
    config: Config,
}

impl Annotator {
    pub fn new(store: Arc<TranscriptStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Annotate one variant against every overlapping (or near) transcript.
    ///
    /// A variant overlapping no transcript yields exactly one intergenic
    /// annotation with empty transcript fields.
    pub fn annotate(&self, variant: &Variant) -> Result<Vec<Annotation>, crate::variant::Error> {
        self.annotate_with(variant, None)
    }

    /// Like [`Annotator::annotate`], attaching the given enrichment to
    /// missense annotations.
    pub fn annotate_with(
        &self,
        variant: &Variant,
        enrichment: Option<&AlphaMissense>,
    ) -> Result<Vec<Annotation>, crate::variant::Error> {
        variant.validate()?;

        let mut transcripts =
            self.store
                .find_near(&variant.chrom, variant.effective_pos(), self.config.flank);
        if transcripts.is_empty() {
            return Ok(vec![Annotation::intergenic(variant)]);
        }

        if self.config.canonical_only {
            let canonical = transcripts
                .iter()
                .copied()
                .filter(|tx| tx.canonical)
                .collect::<Vec<_>>();
            transcripts = if canonical.is_empty() {
                vec![best_transcript(&transcripts)]
            } else {
                canonical
            };
        }

        Ok(transcripts
            .iter()
            .map(|tx| {
                let result = classify(variant, tx);
                let mut annotation = Annotation::from_parts(variant, tx, &result);
                if annotation.consequence == Consequence::MissenseVariant {
                    annotation.alpha_missense = enrichment.cloned();
                }
                annotation
            })
            .collect())
    }
}

/// Preference order when no overlapping transcript is canonical:
/// MANE-Select first, then canonical, longest CDS, smallest id.
fn best_transcript<'a>(transcripts: &[&'a Transcript]) -> &'a Transcript {
    transcripts
        .iter()
        .copied()
        .max_by(|a, b| {
            (a.mane_select, a.canonical, a.cds_len())
                .cmp(&(b.mane_select, b.canonical, b.cds_len()))
                .then_with(|| b.id.cmp(&a.id))
        })
        .expect("transcript list is non-empty")
}
