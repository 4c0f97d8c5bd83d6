//! Canonical-transcript override from a gene-symbol keyed TSV.

use std::path::Path;

use ahash::AHashMap;

use super::Error;
use crate::model::Transcript;

/// Apply the override file; returns the number of genes whose canonical
/// transcript was rewritten.
///
/// Column 0 holds the gene symbol, `column` the preferred transcript id
/// (version suffixes are ignored, `nan` and empty values mean "no
/// preference").  A gene is only touched when the preferred transcript
/// actually exists for it, in which case exactly that transcript is marked
/// canonical and all its siblings are unmarked.
pub(crate) fn apply_override(
    transcripts: &mut [Transcript],
    path: &Path,
    column: usize,
) -> Result<usize, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                Error::OpenFailed(
                    path.display().to_string(),
                    std::io::Error::other(e.to_string()),
                )
            } else {
                Error::Csv(e)
            }
        })?;

    let mut by_symbol: AHashMap<String, Vec<usize>> = AHashMap::new();
    for (i, tx) in transcripts.iter().enumerate() {
        by_symbol.entry(tx.gene_symbol.clone()).or_default().push(i);
    }

    let mut applied = 0;
    for record in reader.records() {
        let record = record?;
        let Some(symbol) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(preferred) = record
            .get(column)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
        else {
            continue;
        };
        let preferred = preferred.split('.').next().unwrap_or(preferred);

        let Some(indices) = by_symbol.get(symbol) else {
            continue;
        };
        if !indices
            .iter()
            .any(|&i| transcripts[i].base_id() == preferred)
        {
            continue;
        }

        for &i in indices {
            transcripts[i].canonical = transcripts[i].base_id() == preferred;
        }
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn tx(id: &str, symbol: &str, canonical: bool) -> Transcript {
        Transcript {
            id: id.to_string(),
            gene_symbol: symbol.to_string(),
            canonical,
            ..Transcript::default()
        }
    }

    #[test]
    fn override_rewrites_only_matching_genes() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("canonical.tsv");
        std::fs::write(
            &path,
            "symbol\tpreferred\nG1\tTXB\nG2\tnan\nG3\tTX_UNKNOWN\n",
        )?;

        let mut transcripts = vec![
            tx("TXA.1", "G1", true),
            tx("TXB.3", "G1", false),
            tx("TXC.1", "G2", true),
            tx("TXD.1", "G3", true),
        ];

        let applied = apply_override(&mut transcripts, &path, 1)?;
        assert_eq!(applied, 1);

        // G1 flipped to the preferred transcript.
        assert!(!transcripts[0].canonical);
        assert!(transcripts[1].canonical);
        // G2 has no preference, G3's preferred transcript is unknown.
        assert!(transcripts[2].canonical);
        assert!(transcripts[3].canonical);

        Ok(())
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let mut transcripts = vec![tx("TXA.1", "G1", true)];
        let result = apply_override(&mut transcripts, Path::new("/nonexistent.tsv"), 1);
        assert!(matches!(result, Err(Error::OpenFailed(_, _))));
    }
}
