//! Reference loader: GENCODE GTF, coding-transcript FASTA, and the optional
//! canonical-override TSV.
//!
//! The GTF is authoritative and must parse; missing FASTA or canonical files
//! only cost features (sequences, overridden canonical flags) and are
//! reported as warnings.

mod canonical;
mod fasta;
mod gtf;

use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use flate2::read::MultiGzDecoder;

pub use crate::load::error::Error;
use crate::model::TranscriptStore;

mod error {
    /// Error type for reference loading.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("cannot open reference file {0}")]
        OpenFailed(String, #[source] std::io::Error),
        #[error("GTF parse error at line {0}: {1}")]
        GtfMalformed(u64, String),
        #[error("reading reference data failed")]
        Io(#[from] std::io::Error),
        #[error("reading canonical override failed")]
        Csv(#[from] csv::Error),
    }
}

/// Configuration for the reference loader.
#[derive(Debug, Clone)]
pub struct Config {
    /// GENCODE GTF, optionally gzipped.
    pub gtf_path: PathBuf,
    /// Coding-transcript FASTA with `|CDS:<start>-<end>|` headers.
    pub fasta_path: Option<PathBuf>,
    /// Canonical-override TSV (gene symbol at column 0).
    pub canonical_path: Option<PathBuf>,
    /// 0-based column of the preferred transcript id in the override TSV;
    /// source-dependent, fixed per invocation.
    pub canonical_column: usize,
}

impl Config {
    pub fn new(gtf_path: impl Into<PathBuf>) -> Self {
        Self {
            gtf_path: gtf_path.into(),
            fasta_path: None,
            canonical_path: None,
            canonical_column: 1,
        }
    }
}

/// Load all transcripts into a ready-to-query store.
pub fn load(config: &Config) -> Result<TranscriptStore, Error> {
    let mut transcripts = gtf::read_transcripts(&config.gtf_path)?;
    tracing::debug!("parsed {} transcripts from GTF", transcripts.len());

    if let Some(fasta_path) = &config.fasta_path {
        match fasta::attach_sequences(&mut transcripts, fasta_path) {
            Ok(attached) => {
                tracing::debug!("attached sequences to {} transcripts", attached)
            }
            Err(e) => tracing::warn!("skipping transcript sequences: {}", e),
        }
    }

    if let Some(canonical_path) = &config.canonical_path {
        match canonical::apply_override(&mut transcripts, canonical_path, config.canonical_column)
        {
            Ok(applied) => tracing::debug!("applied {} canonical overrides", applied),
            Err(e) => tracing::warn!("skipping canonical override: {}", e),
        }
    }

    Ok(TranscriptStore::from_transcripts(transcripts))
}

/// Open a reference file, transparently decompressing `.gz`.
pub(crate) fn open_reference(path: &Path) -> Result<Box<dyn BufRead>, Error> {
    let file = fs::File::open(path)
        .map_err(|e| Error::OpenFailed(path.display().to_string(), e))?;
    if path.extension().map(|ext| ext == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(
            file,
        )))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;
    use std::io::Write as _;
    use test_log::test;

    const GTF: &str = "\
#!genome-build GRCh38
1\tTEST\tgene\t101\t400\t.\t+\t.\tgene_id \"GENE1.1\"; gene_type \"protein_coding\"; gene_name \"G1\";
1\tTEST\ttranscript\t101\t400\t.\t+\t.\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\"; gene_type \"protein_coding\"; gene_name \"G1\"; transcript_type \"protein_coding\"; tag \"basic\";
1\tTEST\texon\t101\t200\t.\t+\t.\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\"; exon_number 1;
1\tTEST\texon\t301\t400\t.\t+\t.\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\"; exon_number 2;
1\tTEST\tCDS\t151\t200\t.\t+\t0\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\";
1\tTEST\tCDS\t301\t346\t.\t+\t1\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\";
1\tTEST\tstart_codon\t151\t153\t.\t+\t0\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\";
1\tTEST\tstop_codon\t347\t349\t.\t+\t0\tgene_id \"GENE1.1\"; transcript_id \"TX1.2\";
1\tTEST\ttranscript\t101\t400\t.\t+\t.\tgene_id \"GENE1.1\"; transcript_id \"TX2.1\"; gene_type \"protein_coding\"; gene_name \"G1\"; transcript_type \"protein_coding\"; tag \"Ensembl_canonical\";
1\tTEST\texon\t101\t400\t.\t+\t.\tgene_id \"GENE1.1\"; transcript_id \"TX2.1\"; exon_number 1;
chr2\tTEST\ttranscript\t500\t900\t.\t-\t.\tgene_id \"GENE2.1\"; transcript_id \"TX3.1\"; gene_type \"lncRNA\"; gene_name \"G2\"; transcript_type \"lncRNA\";
chr2\tTEST\texon\t500\t900\t.\t-\t.\tgene_id \"GENE2.1\"; transcript_id \"TX3.1\"; exon_number 1;
";

    const CDS: &str = "ATGGCTGGTCTGAAAGGGTTTCCCACGGATGAACACATACTTATGAACCAAAGAAGTGTCTGGTACGCCGGACTCAAGACCGTGAATGACGAGCATTAA";

    fn write_fasta(path: &Path) {
        let utr5 = "G".repeat(50);
        let utr3 = "T".repeat(51);
        let cdna = format!("{}{}{}", utr5, CDS, utr3);
        let mut out = fs::File::create(path).expect("creating FASTA");
        writeln!(
            out,
            ">TX1.2|GENE1.1|-|-|G1-201|G1|200|UTR5:1-50|CDS:51-149|UTR3:150-200|"
        )
        .expect("writing FASTA");
        writeln!(out, "{}", cdna).expect("writing FASTA");
    }

    fn write_canonical(path: &Path) {
        let mut out = fs::File::create(path).expect("creating TSV");
        writeln!(out, "hgnc_symbol\tensembl_canonical_transcript").expect("writing TSV");
        writeln!(out, "G1\tTX1").expect("writing TSV");
        writeln!(out, "G2\tnan").expect("writing TSV");
        writeln!(out, "UNKNOWN\tTX9").expect("writing TSV");
    }

    fn setup(dir: &Path) -> Config {
        let gtf_path = dir.join("anno.gtf");
        fs::write(&gtf_path, GTF).expect("writing GTF");
        let fasta_path = dir.join("coding.fa");
        write_fasta(&fasta_path);
        let canonical_path = dir.join("canonical.tsv");
        write_canonical(&canonical_path);
        Config {
            gtf_path,
            fasta_path: Some(fasta_path),
            canonical_path: Some(canonical_path),
            canonical_column: 1,
        }
    }

    #[test]
    fn loads_transcripts_with_cds_and_sequences() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = load(&setup(dir.path()))?;

        assert_eq!(store.transcript_count(), 3);

        let tx = store
            .find_overlapping("1", 160)
            .into_iter()
            .find(|tx| tx.id == "TX1.2")
            .expect("TX1.2 overlaps");
        assert_eq!(tx.gene_symbol, "G1");
        assert_eq!(tx.biotype, "protein_coding");
        // Stop codon extends the CDS beyond the last CDS record.
        assert_eq!((tx.cds_start, tx.cds_end), (151, 349));
        assert_eq!(tx.exons.len(), 2);
        assert_eq!(
            (tx.exons[0].cds_start, tx.exons[0].cds_end, tx.exons[0].frame),
            (151, 200, 0)
        );
        assert_eq!(
            (tx.exons[1].cds_start, tx.exons[1].cds_end, tx.exons[1].frame),
            (301, 349, 1)
        );
        assert_eq!(tx.genomic_to_cds(157), 7);

        // Sequences from the FASTA, keyed by version-stripped id.
        assert_eq!(tx.cds_seq.as_deref(), Some(CDS.as_bytes()));
        assert_eq!(tx.utr3_seq.as_ref().map(|s| s.len()), Some(51));
        let protein = tx.protein_seq.as_ref().expect("translated protein");
        assert_eq!(protein.len(), 32);
        assert_eq!(&protein[..3], b"MAG");

        Ok(())
    }

    #[test]
    fn canonical_override_marks_exactly_one_transcript() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = load(&setup(dir.path()))?;

        let transcripts = store.find_overlapping("1", 160);
        let tx1 = transcripts.iter().find(|t| t.id == "TX1.2").expect("TX1.2");
        let tx2 = transcripts.iter().find(|t| t.id == "TX2.1").expect("TX2.1");
        // The override replaces the GTF's Ensembl_canonical tag on TX2.
        assert!(tx1.canonical);
        assert!(!tx2.canonical);

        Ok(())
    }

    #[test]
    fn chrom_prefix_is_stripped_and_noncoding_kept() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let store = load(&setup(dir.path()))?;

        let tx = store
            .find_overlapping("2", 600)
            .into_iter()
            .next()
            .expect("TX3.1 present");
        assert_eq!(tx.id, "TX3.1");
        assert_eq!(tx.chrom, "2");
        assert!(!tx.is_coding());
        assert!(tx.cds_seq.is_none());

        Ok(())
    }

    #[test]
    fn missing_fasta_and_canonical_are_non_fatal() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let mut config = setup(dir.path());
        config.fasta_path = Some(dir.path().join("missing.fa"));
        config.canonical_path = Some(dir.path().join("missing.tsv"));

        let store = load(&config)?;
        assert_eq!(store.transcript_count(), 3);

        Ok(())
    }

    #[test]
    fn unreadable_gtf_is_fatal() {
        let config = Config::new("/nonexistent/anno.gtf");
        assert!(matches!(load(&config), Err(Error::OpenFailed(_, _))));
    }

    #[test]
    fn malformed_gtf_is_fatal() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let gtf_path = dir.path().join("broken.gtf");
        fs::write(&gtf_path, "1\tTEST\texon\tnot_a_number\t200\t.\t+\t.\tx\n")?;

        let config = Config::new(&gtf_path);
        assert!(matches!(load(&config), Err(Error::GtfMalformed(1, _))));

        Ok(())
    }

    #[test]
    fn gzipped_gtf_is_supported() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let gtf_path = dir.path().join("anno.gtf.gz");
        let file = fs::File::create(&gtf_path)?;
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(GTF.as_bytes())?;
        encoder.finish()?;

        let store = load(&Config::new(&gtf_path))?;
        assert_eq!(store.transcript_count(), 3);

        Ok(())
    }
}
