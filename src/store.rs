//! Append-only, queryable store of annotation results.
//!
//! One row per (variant, transcript) pair, keyed by
//! `chrom:pos:ref:alt:transcript_id`.  Writes are serialized behind the
//! single database handle; concurrent readers are allowed.  Failed appends
//! are warnings for callers, annotation output never depends on the store.

use std::path::Path;

use crate::{annotate::Annotation, variant::Variant};

pub use crate::store::error::Error;

mod error {
    /// Error type for the variant-result store.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("opening variant store failed")]
        Open(#[source] rocksdb::Error),
        #[error("variant store operation failed")]
        Rocksdb(#[from] rocksdb::Error),
        #[error("annotation (de)serialization failed")]
        Json(#[from] serde_json::Error),
    }
}

/// Column family holding the annotation rows.
const CF_ANNOTATIONS: &str = "annotations";
/// Column family reserved for store metadata.
const CF_META: &str = "meta";

/// RocksDB-backed variant-result store.
///
/// Must be cleared whenever the transcript snapshot is regenerated, because
/// stored annotations depend on transcript state.
pub struct VariantStore {
    db: rocksdb::DBWithThreadMode<rocksdb::MultiThreaded>,
}

impl VariantStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        let db = rocksdb::DB::open_cf(&options, path, [CF_META, CF_ANNOTATIONS])
            .map_err(Error::Open)?;
        Ok(Self { db })
    }

    fn cf(&self) -> std::sync::Arc<rocksdb::BoundColumnFamily<'_>> {
        self.db
            .cf_handle(CF_ANNOTATIONS)
            .expect("column family created at open")
    }

    /// Append all annotations of one variant in a single write batch.
    pub fn append(&self, variant: &Variant, annotations: &[Annotation]) -> Result<(), Error> {
        let cf = self.cf();
        let mut batch = rocksdb::WriteBatch::default();
        for annotation in annotations {
            let key = annotation_key(variant, &annotation.transcript_id);
            batch.put_cf(&cf, key.as_bytes(), serde_json::to_vec(annotation)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// All per-transcript annotations recorded for one variant.
    pub fn lookup(
        &self,
        chrom: &str,
        pos: i64,
        reference: &str,
        alternative: &str,
    ) -> Result<Vec<Annotation>, Error> {
        let prefix = format!(
            "{}:{}:{}:{}:",
            chrom.trim_start_matches("chr"),
            pos,
            reference,
            alternative
        );

        let cf = self.cf();
        let mut result = Vec::new();
        for item in self.db.iterator_cf(
            &cf,
            rocksdb::IteratorMode::From(prefix.as_bytes(), rocksdb::Direction::Forward),
        ) {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            result.push(serde_json::from_slice(&value)?);
        }
        Ok(result)
    }

    /// Filter the whole store by gene symbol.
    pub fn by_gene(&self, symbol: &str) -> Result<Vec<Annotation>, Error> {
        self.filter(|annotation| annotation.gene_symbol == symbol)
    }

    /// Filter the whole store by amino-acid-change string (e.g. `G/C`).
    pub fn by_amino_acid_change(&self, change: &str) -> Result<Vec<Annotation>, Error> {
        self.filter(|annotation| annotation.amino_acid_change.as_deref() == Some(change))
    }

    fn filter(
        &self,
        predicate: impl Fn(&Annotation) -> bool,
    ) -> Result<Vec<Annotation>, Error> {
        let cf = self.cf();
        let mut result = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item?;
            let annotation: Annotation = serde_json::from_slice(&value)?;
            if predicate(&annotation) {
                result.push(annotation);
            }
        }
        Ok(result)
    }

    /// Number of stored annotation rows.
    pub fn count(&self) -> Result<usize, Error> {
        let cf = self.cf();
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Drop all stored annotations.
    pub fn clear(&self) -> Result<(), Error> {
        self.db.drop_cf(CF_ANNOTATIONS)?;
        self.db
            .create_cf(CF_ANNOTATIONS, &rocksdb::Options::default())?;
        Ok(())
    }
}

fn annotation_key(variant: &Variant, transcript_id: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        variant.chrom, variant.pos, variant.reference, variant.alternative, transcript_id
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consequence::{Consequence, Impact};

    use pretty_assertions::assert_eq;

    fn annotation(transcript_id: &str, gene_symbol: &str, amino_acids: Option<&str>) -> Annotation {
        Annotation {
            transcript_id: transcript_id.to_string(),
            gene_id: "GENE1".to_string(),
            gene_symbol: gene_symbol.to_string(),
            gene_type: "protein_coding".to_string(),
            consequence: Consequence::MissenseVariant,
            additional_consequences: Vec::new(),
            impact: Impact::Moderate,
            canonical: true,
            cds_position: Some(34),
            protein_position: Some(12),
            amino_acid_change: amino_acids.map(String::from),
            codon_change: Some("GGT/TGT".to_string()),
            hgvs_c: "c.34G>T".to_string(),
            hgvs_p: "p.Gly12Cys".to_string(),
            exon_number: Some(2),
            intron_number: None,
            allele: "A".to_string(),
            biotype: "protein_coding".to_string(),
            alpha_missense: None,
        }
    }

    #[test]
    fn append_lookup_roundtrip() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = VariantStore::open(dir.path())?;

        let kras = Variant::new("12", 25245350, "C", "A");
        let other = Variant::new("12", 25245351, "G", "T");
        store.append(
            &kras,
            &[
                annotation("ENST00000311936", "KRAS", Some("G/C")),
                annotation("ENST00000556131", "KRAS", Some("G/C")),
            ],
        )?;
        store.append(&other, &[annotation("ENST00000311936", "KRAS", None)])?;

        let hits = store.lookup("12", 25245350, "C", "A")?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].hgvs_c, "c.34G>T");

        assert!(store.lookup("12", 25245350, "C", "G")?.is_empty());
        assert_eq!(store.lookup("chr12", 25245351, "G", "T")?.len(), 1);
        assert_eq!(store.count()?, 3);

        Ok(())
    }

    #[test]
    fn filters_by_gene_and_amino_acid_change() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = VariantStore::open(dir.path())?;

        let var = Variant::new("12", 25245350, "C", "A");
        store.append(
            &var,
            &[
                annotation("TX1", "KRAS", Some("G/C")),
                annotation("TX2", "TP53", Some("R/H")),
            ],
        )?;

        assert_eq!(store.by_gene("KRAS")?.len(), 1);
        assert_eq!(store.by_gene("BRCA1")?.len(), 0);
        assert_eq!(store.by_amino_acid_change("R/H")?.len(), 1);

        Ok(())
    }

    #[test]
    fn clear_empties_the_store() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = VariantStore::open(dir.path())?;

        let var = Variant::new("1", 100, "A", "T");
        store.append(&var, &[annotation("TX1", "G1", None)])?;
        assert_eq!(store.count()?, 1);

        store.clear()?;
        assert_eq!(store.count()?, 0);

        // The store accepts appends again after clearing.
        store.append(&var, &[annotation("TX1", "G1", None)])?;
        assert_eq!(store.count()?, 1);

        Ok(())
    }
}
