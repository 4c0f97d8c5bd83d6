//! Transcript snapshot cache keyed by source-file fingerprints.
//!
//! A snapshot directory holds two files: the serialized transcript map and a
//! sidecar `.meta` file recording size and last-modified timestamp of every
//! source file.  The snapshot is only reused when all recorded fields match
//! the current sources; rewrites are atomic (temp file + rename).

use std::{
    collections::HashMap,
    fs,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, SecondsFormat, Utc};

pub use crate::snapshot::error::Error;
use crate::model::TranscriptStore;

mod error {
    /// Error type for snapshot handling.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("snapshot I/O failed")]
        Io(#[from] std::io::Error),
        #[error("snapshot is corrupt: {0}")]
        Corrupt(String),
        #[error("loading reference files failed")]
        Load(#[from] crate::load::Error),
    }
}

/// File name of the serialized transcript map inside a snapshot directory.
pub const SNAPSHOT_FILE: &str = "transcripts.bin";

/// Size and last-modified timestamp of one source file.
///
/// Absent optional sources record size 0 with an empty timestamp, so their
/// later appearance invalidates the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileStamp {
    pub size: u64,
    /// RFC-3339 timestamp with nanosecond precision, UTC.
    pub modtime: String,
}

impl FileStamp {
    fn of(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match fs::metadata(path) {
            Ok(meta) => {
                let modtime: DateTime<Utc> = meta
                    .modified()
                    .unwrap_or(SystemTime::UNIX_EPOCH)
                    .into();
                Self {
                    size: meta.len(),
                    modtime: modtime.to_rfc3339_opts(SecondsFormat::Nanos, true),
                }
            }
            Err(_) => Self::default(),
        }
    }
}

/// Fingerprints of the three reference inputs backing a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceFingerprints {
    pub gtf: FileStamp,
    pub fasta: FileStamp,
    pub canonical: FileStamp,
}

impl SourceFingerprints {
    pub fn collect(gtf: &Path, fasta: Option<&Path>, canonical: Option<&Path>) -> Self {
        Self {
            gtf: FileStamp::of(Some(gtf)),
            fasta: FileStamp::of(fasta),
            canonical: FileStamp::of(canonical),
        }
    }
}

/// Handle to one snapshot directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
}

impl Snapshot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn data_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join(format!("{}.meta", SNAPSHOT_FILE))
    }

    /// Whether the snapshot exists and all six recorded fingerprint fields
    /// match the given sources.
    pub fn is_valid(&self, fingerprints: &SourceFingerprints) -> bool {
        if !self.data_path().exists() {
            return false;
        }
        let Ok(contents) = fs::read_to_string(self.meta_path()) else {
            return false;
        };
        let fields = contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();

        let matches = |key: &str, value: &str| fields.get(key).map(String::as_str) == Some(value);
        matches("gtf_size", &fingerprints.gtf.size.to_string())
            && matches("gtf_modtime", &fingerprints.gtf.modtime)
            && matches("fasta_size", &fingerprints.fasta.size.to_string())
            && matches("fasta_modtime", &fingerprints.fasta.modtime)
            && matches("canonical_size", &fingerprints.canonical.size.to_string())
            && matches("canonical_modtime", &fingerprints.canonical.modtime)
    }

    /// Deserialize the snapshot into a ready-to-query transcript store.
    pub fn read(&self) -> Result<TranscriptStore, Error> {
        let file = fs::File::open(self.data_path())?;
        let mut store: TranscriptStore = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::Corrupt(e.to_string()))?;
        store.finalize();
        Ok(store)
    }

    /// Serialize the store and sidecar metadata atomically.
    pub fn write(
        &self,
        store: &TranscriptStore,
        fingerprints: &SourceFingerprints,
    ) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;

        let tmp_data = self.dir.join(format!("{}.tmp", SNAPSHOT_FILE));
        let file = fs::File::create(&tmp_data)?;
        bincode::serialize_into(BufWriter::new(file), store)
            .map_err(|e| Error::Corrupt(e.to_string()))?;
        fs::rename(&tmp_data, self.data_path())?;

        let tmp_meta = self.dir.join(format!("{}.meta.tmp", SNAPSHOT_FILE));
        {
            let mut out = BufWriter::new(fs::File::create(&tmp_meta)?);
            writeln!(out, "gtf_size={}", fingerprints.gtf.size)?;
            writeln!(out, "gtf_modtime={}", fingerprints.gtf.modtime)?;
            writeln!(out, "fasta_size={}", fingerprints.fasta.size)?;
            writeln!(out, "fasta_modtime={}", fingerprints.fasta.modtime)?;
            writeln!(out, "canonical_size={}", fingerprints.canonical.size)?;
            writeln!(out, "canonical_modtime={}", fingerprints.canonical.modtime)?;
            writeln!(
                out,
                "created_at={}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
            )?;
        }
        fs::rename(&tmp_meta, self.meta_path())?;

        Ok(())
    }
}

/// Load the transcript store from the snapshot when fingerprints match, else
/// run the reference loader and rewrite the snapshot.
///
/// The boolean is `true` when the store was regenerated from source; callers
/// holding a variant-result store must clear it in that case, because stored
/// annotations depend on transcript state.
pub fn load_or_build(
    config: &crate::load::Config,
    cache_dir: &Path,
    clear: bool,
) -> Result<(TranscriptStore, bool), Error> {
    let snapshot = Snapshot::new(cache_dir);
    let fingerprints = SourceFingerprints::collect(
        &config.gtf_path,
        config.fasta_path.as_deref(),
        config.canonical_path.as_deref(),
    );

    if !clear && snapshot.is_valid(&fingerprints) {
        match snapshot.read() {
            Ok(store) => {
                tracing::debug!(
                    "loaded {} transcripts from snapshot",
                    store.transcript_count()
                );
                return Ok((store, false));
            }
            Err(e) => {
                tracing::warn!("snapshot unusable, rebuilding from source: {}", e);
            }
        }
    }

    let store = crate::load::load(config)?;
    snapshot.write(&store, &fingerprints)?;
    Ok((store, true))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Exon, Transcript};

    use pretty_assertions::assert_eq;
    use test_log::test;

    fn sample_store() -> TranscriptStore {
        let tx = Transcript {
            id: "TX1.1".to_string(),
            gene_symbol: "G1".to_string(),
            chrom: "17".to_string(),
            start: 100,
            end: 200,
            exons: vec![Exon {
                number: 1,
                start: 100,
                end: 200,
                cds_start: 0,
                cds_end: 0,
                frame: -1,
            }],
            ..Transcript::default()
        };
        TranscriptStore::from_transcripts(vec![tx])
    }

    fn touch(path: &Path, contents: &str) {
        std::fs::write(path, contents).expect("writing test file");
    }

    #[test]
    fn roundtrip_and_validation() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let gtf = dir.path().join("anno.gtf");
        let fasta = dir.path().join("seq.fa");
        touch(&gtf, "gtf contents");
        touch(&fasta, "fasta contents");

        let fingerprints = SourceFingerprints::collect(&gtf, Some(&fasta), None);
        let snapshot = Snapshot::new(dir.path().join("cache"));
        assert!(!snapshot.is_valid(&fingerprints));

        snapshot.write(&sample_store(), &fingerprints)?;
        assert!(snapshot.is_valid(&fingerprints));

        let store = snapshot.read()?;
        assert_eq!(store.transcript_count(), 1);
        assert_eq!(store.find_overlapping("17", 150).len(), 1);

        // Growing the GTF invalidates the snapshot.
        touch(&gtf, "gtf contents, now longer");
        let changed = SourceFingerprints::collect(&gtf, Some(&fasta), None);
        assert!(!snapshot.is_valid(&changed));

        Ok(())
    }

    #[test]
    fn corrupt_snapshot_is_an_error() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let snapshot = Snapshot::new(dir.path());
        std::fs::write(dir.path().join(SNAPSHOT_FILE), b"not a snapshot")?;

        assert!(matches!(snapshot.read(), Err(Error::Corrupt(_))));

        Ok(())
    }

    #[test]
    fn absent_optional_sources_are_fingerprinted_as_empty() {
        let fingerprints =
            SourceFingerprints::collect(Path::new("/nonexistent/anno.gtf"), None, None);
        assert_eq!(fingerprints.canonical, FileStamp::default());
        assert_eq!(fingerprints.fasta.size, 0);
    }
}
