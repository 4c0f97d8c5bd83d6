//! GENCODE GTF parsing into the transcript model.

use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;

use super::Error;
use crate::model::{Exon, Strand, Transcript};

/// Read all transcripts from a (possibly gzipped) GTF file.
pub(crate) fn read_transcripts(path: &Path) -> Result<Vec<Transcript>, Error> {
    let reader = super::open_reference(path)?;

    let mut builders: AHashMap<String, TxBuilder> = AHashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line_no = line_no as u64 + 1;
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() < 9 {
            return Err(Error::GtfMalformed(
                line_no,
                format!("expected 9 tab-separated columns, got {}", fields.len()),
            ));
        }
        let feature = fields[2];
        if !matches!(
            feature,
            "transcript" | "exon" | "CDS" | "start_codon" | "stop_codon"
        ) {
            continue;
        }

        let start = parse_coord(fields[3], line_no)?;
        let end = parse_coord(fields[4], line_no)?;
        let strand = match fields[6] {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            other => {
                return Err(Error::GtfMalformed(
                    line_no,
                    format!("unknown strand {:?}", other),
                ))
            }
        };
        let attrs = fields[8];
        let Some(transcript_id) = attr(attrs, "transcript_id") else {
            continue;
        };

        let builder = builders.entry(transcript_id.to_string()).or_insert_with(|| {
            order.push(transcript_id.to_string());
            TxBuilder {
                id: transcript_id.to_string(),
                chrom: fields[0].trim_start_matches("chr").to_string(),
                strand,
                ..TxBuilder::default()
            }
        });

        match feature {
            "transcript" => {
                builder.start = start;
                builder.end = end;
                builder.gene_id = attr(attrs, "gene_id").unwrap_or_default().to_string();
                builder.gene_symbol = attr(attrs, "gene_name").unwrap_or_default().to_string();
                builder.gene_type = attr(attrs, "gene_type")
                    .or_else(|| attr(attrs, "gene_biotype"))
                    .unwrap_or_default()
                    .to_string();
                builder.biotype = attr(attrs, "transcript_type")
                    .or_else(|| attr(attrs, "transcript_biotype"))
                    .unwrap_or_default()
                    .to_string();
                for tag in attr_values(attrs, "tag") {
                    match tag {
                        "Ensembl_canonical" => builder.canonical = true,
                        "MANE_Select" => builder.mane_select = true,
                        _ => {}
                    }
                }
            }
            "exon" => {
                let number = attr(attrs, "exon_number").and_then(|n| n.parse::<u32>().ok());
                builder.exons.push((start, end, number));
            }
            "CDS" => {
                let frame = fields[7].parse::<i8>().unwrap_or(-1);
                builder.cds_records.push((start, end, frame));
            }
            "start_codon" => {
                builder.start_codon = Some(merge_span(builder.start_codon, start, end));
            }
            "stop_codon" => {
                builder.stop_codon = Some(merge_span(builder.stop_codon, start, end));
            }
            _ => unreachable!("feature filtered above"),
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|id| builders.remove(&id))
        .map(TxBuilder::build)
        .collect())
}

fn parse_coord(value: &str, line_no: u64) -> Result<i64, Error> {
    value
        .parse::<i64>()
        .map_err(|_| Error::GtfMalformed(line_no, format!("invalid coordinate {:?}", value)))
}

fn merge_span(current: Option<(i64, i64)>, start: i64, end: i64) -> (i64, i64) {
    match current {
        Some((s, e)) => (s.min(start), e.max(end)),
        None => (start, end),
    }
}

/// First value of a GTF attribute, e.g. `gene_id "ENSG..."`.
fn attr<'a>(attrs: &'a str, key: &'a str) -> Option<&'a str> {
    attr_values(attrs, key).next()
}

/// All values of a (repeatable) GTF attribute, e.g. `tag`.
fn attr_values<'a>(attrs: &'a str, key: &'a str) -> impl Iterator<Item = &'a str> {
    attrs.split(';').filter_map(move |part| {
        let (k, v) = part.trim().split_once(' ')?;
        (k == key).then(|| v.trim().trim_matches('"'))
    })
}

#[derive(Debug, Default)]
struct TxBuilder {
    id: String,
    gene_id: String,
    gene_symbol: String,
    gene_type: String,
    biotype: String,
    chrom: String,
    strand: Strand,
    start: i64,
    end: i64,
    canonical: bool,
    mane_select: bool,
    exons: Vec<(i64, i64, Option<u32>)>,
    cds_records: Vec<(i64, i64, i8)>,
    start_codon: Option<(i64, i64)>,
    stop_codon: Option<(i64, i64)>,
}

impl TxBuilder {
    fn build(mut self) -> Transcript {
        self.exons.sort_by_key(|e| e.0);
        let exon_count = self.exons.len() as u32;

        // CDS bounds come from start/stop codon records when present; the
        // stop codon lies outside the CDS records in GENCODE GTFs.
        let (cds_start, cds_end) = if self.cds_records.is_empty() {
            (0, 0)
        } else {
            let cds_min = self.cds_records.iter().map(|r| r.0).min().unwrap_or(0);
            let cds_max = self.cds_records.iter().map(|r| r.1).max().unwrap_or(0);
            let (lower_codon, upper_codon) = match self.strand {
                Strand::Forward => (self.start_codon, self.stop_codon),
                Strand::Reverse => (self.stop_codon, self.start_codon),
            };
            if lower_codon.is_none() || upper_codon.is_none() {
                tracing::warn!(
                    "transcript {} lacks start/stop codon records; \
                     falling back to min/max CDS coordinates",
                    self.id
                );
            }
            (
                lower_codon.map(|c| c.0.min(cds_min)).unwrap_or(cds_min),
                upper_codon.map(|c| c.1.max(cds_max)).unwrap_or(cds_max),
            )
        };

        let cds_records = self.cds_records;
        let strand = self.strand;
        let exons = self
            .exons
            .into_iter()
            .enumerate()
            .map(|(i, (start, end, number))| {
                let number = number.unwrap_or(match strand {
                    Strand::Forward => i as u32 + 1,
                    Strand::Reverse => exon_count - i as u32,
                });
                let (exon_cds_start, exon_cds_end) = if cds_start > 0 {
                    let s = start.max(cds_start);
                    let e = end.min(cds_end);
                    if s <= e {
                        (s, e)
                    } else {
                        (0, 0)
                    }
                } else {
                    (0, 0)
                };
                let frame = cds_records
                    .iter()
                    .find(|r| r.0 >= start && r.0 <= end)
                    .map(|r| r.2)
                    .unwrap_or(-1);
                Exon {
                    number,
                    start,
                    end,
                    cds_start: exon_cds_start,
                    cds_end: exon_cds_end,
                    frame,
                }
            })
            .collect::<Vec<_>>();

        let start = if self.start > 0 {
            self.start
        } else {
            exons.first().map(|e| e.start).unwrap_or(0)
        };
        let end = if self.end > 0 {
            self.end
        } else {
            exons.last().map(|e| e.end).unwrap_or(0)
        };

        Transcript {
            id: self.id,
            gene_id: self.gene_id,
            gene_symbol: self.gene_symbol,
            gene_type: self.gene_type,
            chrom: self.chrom,
            start,
            end,
            strand,
            biotype: self.biotype,
            canonical: self.canonical,
            mane_select: self.mane_select,
            cds_start,
            cds_end,
            exons,
            ..Transcript::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn attribute_parsing() {
        let attrs = r#"gene_id "ENSG1.5"; transcript_id "ENST1.2"; exon_number 3; tag "basic"; tag "MANE_Select";"#;
        assert_eq!(attr(attrs, "gene_id"), Some("ENSG1.5"));
        assert_eq!(attr(attrs, "exon_number"), Some("3"));
        assert_eq!(attr(attrs, "missing"), None);
        assert_eq!(
            attr_values(attrs, "tag").collect::<Vec<_>>(),
            vec!["basic", "MANE_Select"]
        );
    }

    #[test]
    fn reverse_strand_exon_numbers_are_computed_when_absent() {
        let builder = TxBuilder {
            id: "TX.1".to_string(),
            strand: Strand::Reverse,
            exons: vec![(300, 400, None), (100, 200, None)],
            ..TxBuilder::default()
        };
        let tx = builder.build();
        assert_eq!(tx.exons[0].number, 2);
        assert_eq!(tx.exons[1].number, 1);
        assert_eq!((tx.start, tx.end), (100, 400));
    }

    #[test]
    fn cds_bounds_fall_back_to_minmax_without_codon_records() {
        let builder = TxBuilder {
            id: "TX.1".to_string(),
            strand: Strand::Forward,
            exons: vec![(100, 400, None)],
            cds_records: vec![(150, 250, 0), (260, 350, 2)],
            ..TxBuilder::default()
        };
        let tx = builder.build();
        assert_eq!((tx.cds_start, tx.cds_end), (150, 350));
    }
}
