//! Attachment of CDS, 3'UTR and protein sequences from a coding-transcript
//! FASTA whose headers carry a `CDS:<start>-<end>` descriptor.

use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;
use regex::Regex;

use super::Error;
use crate::{
    model::Transcript,
    sequences::translate_cds,
    Sequence,
};

#[derive(Debug, Default)]
struct FastaEntry {
    cds: Sequence,
    utr3: Sequence,
    protein: Option<Sequence>,
}

/// Attach sequences to all protein-coding transcripts; returns how many
/// transcripts received a CDS.
pub(crate) fn attach_sequences(
    transcripts: &mut [Transcript],
    path: &Path,
) -> Result<usize, Error> {
    let entries = read_entries(path)?;

    // Versioned ids are authoritative; base ids are the fallback.
    let mut base_to_versioned: AHashMap<String, String> = AHashMap::new();
    for id in entries.keys() {
        let base = id.split('.').next().unwrap_or(id);
        base_to_versioned.insert(base.to_string(), id.clone());
    }

    let mut attached = 0;
    for tx in transcripts.iter_mut().filter(|tx| tx.is_coding()) {
        let entry = entries.get(&tx.id).or_else(|| {
            base_to_versioned
                .get(tx.base_id())
                .and_then(|id| entries.get(id))
        });
        let Some(entry) = entry else {
            continue;
        };
        tx.cds_seq = Some(entry.cds.clone());
        tx.utr3_seq = (!entry.utr3.is_empty()).then(|| entry.utr3.clone());
        tx.protein_seq = entry.protein.clone();
        attached += 1;
    }

    Ok(attached)
}

fn read_entries(path: &Path) -> Result<AHashMap<String, FastaEntry>, Error> {
    let reader = super::open_reference(path)?;
    let cds_re = Regex::new(r"^CDS:(\d+)-(\d+)$").expect("hard-coded pattern");

    let mut entries = AHashMap::new();
    let mut current: Option<(String, (usize, usize))> = None;
    let mut seq: Sequence = Vec::new();

    fn flush(
        current: &mut Option<(String, (usize, usize))>,
        seq: &mut Sequence,
        entries: &mut AHashMap<String, FastaEntry>,
    ) {
        if let Some((id, cds_range)) = current.take() {
            entries.insert(id, split_record(seq, cds_range));
        }
        seq.clear();
    }

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            flush(&mut current, &mut seq, &mut entries);

            let mut fields = header.split('|');
            let id = fields.next().unwrap_or_default().trim().to_string();
            let cds_range = fields.find_map(|field| {
                let captures = cds_re.captures(field)?;
                let start = captures[1].parse::<usize>().ok()?;
                let end = captures[2].parse::<usize>().ok()?;
                (start >= 1 && end >= start).then_some((start, end))
            });
            match cds_range {
                Some(range) if !id.is_empty() => current = Some((id, range)),
                _ => {
                    tracing::warn!("FASTA record without CDS descriptor: {}", id);
                    current = None;
                }
            }
        } else if current.is_some() {
            seq.extend(line.trim().bytes().map(|b| b.to_ascii_uppercase()));
        }
    }
    flush(&mut current, &mut seq, &mut entries);

    Ok(entries)
}

fn split_record(seq: &[u8], (cds_start, cds_end): (usize, usize)) -> FastaEntry {
    let cds_end = cds_end.min(seq.len());
    if cds_start > cds_end {
        return FastaEntry::default();
    }
    let cds = seq[cds_start - 1..cds_end].to_vec();
    let utr3 = seq[cds_end..].to_vec();

    let protein = if cds.len() % 3 == 0 {
        translate_cds(&cds)
            .ok()
            .map(|mut p| {
                if p.last() == Some(&b'*') {
                    p.pop();
                }
                p
            })
    } else {
        tracing::warn!("CDS length {} is not a multiple of 3", cds.len());
        None
    };

    FastaEntry { cds, utr3, protein }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn split_record_extracts_cds_utr3_and_protein() {
        let cdna = b"GGGGGATGAAATAATTTTT";
        let entry = split_record(cdna, (6, 14));
        assert_eq!(entry.cds, b"ATGAAATAA".to_vec());
        assert_eq!(entry.utr3, b"TTTTT".to_vec());
        assert_eq!(entry.protein, Some(b"MK".to_vec()));
    }

    #[test]
    fn split_record_tolerates_truncated_cds() {
        let entry = split_record(b"ATGAA", (1, 9));
        assert_eq!(entry.cds, b"ATGAA".to_vec());
        assert!(entry.utr3.is_empty());
        assert_eq!(entry.protein, None);
    }

    #[test]
    fn attach_by_versioned_and_base_id() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coding.fa");
        std::fs::write(
            &path,
            ">TXA.7|x|CDS:1-6|\nATGAAA\n>TXB.2|x|CDS:1-3|\natg\n",
        )?;

        let mut transcripts = vec![
            Transcript {
                id: "TXA.7".to_string(),
                cds_start: 1,
                cds_end: 6,
                ..Transcript::default()
            },
            // Different version than the FASTA record; base id matches.
            Transcript {
                id: "TXB.9".to_string(),
                cds_start: 1,
                cds_end: 3,
                ..Transcript::default()
            },
            // Non-coding transcripts are skipped.
            Transcript {
                id: "TXC.1".to_string(),
                ..Transcript::default()
            },
        ];

        let attached = attach_sequences(&mut transcripts, &path)?;
        assert_eq!(attached, 2);
        assert_eq!(transcripts[0].cds_seq.as_deref(), Some(b"ATGAAA".as_ref()));
        assert_eq!(transcripts[1].cds_seq.as_deref(), Some(b"ATG".as_ref()));
        assert_eq!(transcripts[2].cds_seq, None);

        Ok(())
    }
}
