//! Genomic variant records as consumed by the annotation core.

use std::fmt::Display;

pub use crate::variant::error::Error;

mod error {
    /// Error type for malformed variant input.
    #[derive(thiserror::Error, Debug, Clone)]
    pub enum Error {
        #[error("variant position must be 1-based, but is: {0}")]
        NonPositivePosition(i64),
        #[error("empty {0} allele")]
        EmptyAllele(&'static str),
        #[error("multi-allelic variant must be split before annotation: {0}")]
        MultiAllelic(String),
        #[error("{0} allele contains non-ACGTN base: {1}")]
        InvalidBase(&'static str, String),
    }
}

/// Classification of a variant by allele lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VariantKind {
    /// Single nucleotide variant.
    Snv,
    /// Multi-nucleotide variant of equal reference/alternative length.
    Mnv,
    /// Insertion sharing a genomic-anchor base.
    Insertion,
    /// Deletion sharing a genomic-anchor base.
    Deletion,
}

/// A single normalized variant on the reference assembly.
///
/// Positions are 1-based, alleles upper case.  Multi-allelic records must be
/// split into one `Variant` per alternative allele before entering the core.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    /// Chromosome name without `chr` prefix.
    pub chrom: String,
    /// 1-based position of the first reference base.
    pub pos: i64,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
}

impl Variant {
    pub fn new(chrom: &str, pos: i64, reference: &str, alternative: &str) -> Self {
        Self {
            chrom: chrom.trim_start_matches("chr").to_string(),
            pos,
            reference: reference.to_uppercase(),
            alternative: alternative.to_uppercase(),
        }
    }

    /// Classify by allele lengths.
    pub fn kind(&self) -> VariantKind {
        let (r, a) = (self.reference.len(), self.alternative.len());
        if r == 1 && a == 1 {
            VariantKind::Snv
        } else if r == a {
            VariantKind::Mnv
        } else if a > r {
            VariantKind::Insertion
        } else {
            VariantKind::Deletion
        }
    }

    /// 1-based genomic position of the last reference base.
    pub fn end(&self) -> i64 {
        self.pos + self.reference.len() as i64 - 1
    }

    /// Position of the first base that actually differs.
    ///
    /// For VCF-style indels this skips the shared anchor base, so intron/UTR
    /// bucketing is decided by the changed bases rather than the anchor.
    pub fn effective_pos(&self) -> i64 {
        match self.kind() {
            VariantKind::Snv | VariantKind::Mnv | VariantKind::Insertion => self.pos,
            VariantKind::Deletion => {
                let shared = self
                    .reference
                    .bytes()
                    .zip(self.alternative.bytes())
                    .take_while(|(r, a)| r == a)
                    .count()
                    .min(self.reference.len() - 1);
                self.pos + shared as i64
            }
        }
    }

    /// Check the variant for well-formedness.
    ///
    /// Returns the malformed-input error that callers are expected to log and
    /// skip (the annotation pipeline continues with the next variant).
    pub fn validate(&self) -> Result<(), Error> {
        if self.pos < 1 {
            return Err(Error::NonPositivePosition(self.pos));
        }
        if self.reference.is_empty() {
            return Err(Error::EmptyAllele("reference"));
        }
        if self.alternative.is_empty() {
            return Err(Error::EmptyAllele("alternative"));
        }
        if self.alternative.contains(',') {
            return Err(Error::MultiAllelic(format!("{}", self)));
        }
        for (label, allele) in [
            ("reference", &self.reference),
            ("alternative", &self.alternative),
        ] {
            if !allele.bytes().all(|c| matches!(c, b'A' | b'C' | b'G' | b'T' | b'N')) {
                return Err(Error::InvalidBase(label, allele.clone()));
            }
        }
        Ok(())
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}{}>{}",
            self.chrom, self.pos, self.reference, self.alternative
        )
    }
}
