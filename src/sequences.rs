//! Utility code for working with DNA and protein sequences.

pub use crate::sequences::error::Error;
use crate::Sequence;
use ahash::AHashMap;
use std::sync::LazyLock;

mod error {
    /// Error type for sequence operations.
    #[derive(thiserror::Error, Debug, Clone)]
    pub enum Error {
        #[error("invalid 1-letter aminoacid: {0} at {1}")]
        InvalidOneLetterAminoAcid(String, String),
        #[error("codon is undefined in codon table: {0}")]
        UndefinedCodon(String),
        #[error("can only translate DNA sequences whose length is multiple of 3, but is: {0}")]
        UntranslatableDnaLength(usize),
    }
}

/// Mapping for DNA characters for normalization (upper case, `U -> T`).
const DNA_ASCII_MAP: [u8; 256] = {
    let mut result = [0u8; 256];
    let mut c = 0usize;
    while c < 256 {
        let b = c as u8;
        result[c] = if b == b'u' || b == b'U' {
            b'T'
        } else {
            b.to_ascii_uppercase()
        };
        c += 1;
    }
    result
};

/// IUPAC ambiguity codes; a codon containing one translates to the unknown residue `X`.
const IUPAC_AMBIGUITY_CODES: [u8; 11] = *b"RYSWKMBDHVN";

/// The standard nuclear genetic code as (codon, 1-letter amino acid) pairs.
const DNA_TO_AA1_VEC: &[(&str, &str)] = &[
    ("AAA", "K"),
    ("AAC", "N"),
    ("AAG", "K"),
    ("AAT", "N"),
    ("ACA", "T"),
    ("ACC", "T"),
    ("ACG", "T"),
    ("ACT", "T"),
    ("AGA", "R"),
    ("AGC", "S"),
    ("AGG", "R"),
    ("AGT", "S"),
    ("ATA", "I"),
    ("ATC", "I"),
    ("ATG", "M"),
    ("ATT", "I"),
    ("CAA", "Q"),
    ("CAC", "H"),
    ("CAG", "Q"),
    ("CAT", "H"),
    ("CCA", "P"),
    ("CCC", "P"),
    ("CCG", "P"),
    ("CCT", "P"),
    ("CGA", "R"),
    ("CGC", "R"),
    ("CGG", "R"),
    ("CGT", "R"),
    ("CTA", "L"),
    ("CTC", "L"),
    ("CTG", "L"),
    ("CTT", "L"),
    ("GAA", "E"),
    ("GAC", "D"),
    ("GAG", "E"),
    ("GAT", "D"),
    ("GCA", "A"),
    ("GCC", "A"),
    ("GCG", "A"),
    ("GCT", "A"),
    ("GGA", "G"),
    ("GGC", "G"),
    ("GGG", "G"),
    ("GGT", "G"),
    ("GTA", "V"),
    ("GTC", "V"),
    ("GTG", "V"),
    ("GTT", "V"),
    ("TAA", "*"),
    ("TAC", "Y"),
    ("TAG", "*"),
    ("TAT", "Y"),
    ("TCA", "S"),
    ("TCC", "S"),
    ("TCG", "S"),
    ("TCT", "S"),
    ("TGA", "*"),
    ("TGC", "C"),
    ("TGG", "W"),
    ("TGT", "C"),
    ("TTA", "L"),
    ("TTC", "F"),
    ("TTG", "L"),
    ("TTT", "F"),
];

/// 1-letter to 3-letter amino acid names.
const AA1_TO_AA3_VEC: &[(&str, &str)] = &[
    ("A", "Ala"),
    ("C", "Cys"),
    ("D", "Asp"),
    ("E", "Glu"),
    ("F", "Phe"),
    ("G", "Gly"),
    ("H", "His"),
    ("I", "Ile"),
    ("K", "Lys"),
    ("L", "Leu"),
    ("M", "Met"),
    ("N", "Asn"),
    ("P", "Pro"),
    ("Q", "Gln"),
    ("R", "Arg"),
    ("S", "Ser"),
    ("T", "Thr"),
    ("U", "Sec"),
    ("V", "Val"),
    ("W", "Trp"),
    ("X", "Xaa"),
    ("Y", "Tyr"),
    ("*", "Ter"),
];

type Codon = [u8; 3];

static DNA_TO_AA1: LazyLock<AHashMap<Codon, u8>> = LazyLock::new(|| {
    let mut m = AHashMap::default();
    for (dna, aa1) in DNA_TO_AA1_VEC {
        assert_eq!(dna.len(), 3);
        let d = dna.as_bytes();
        m.insert([d[0], d[1], d[2]], aa1.as_bytes()[0]);
    }
    m
});

static AA1_TO_AA3: LazyLock<AHashMap<u8, &'static str>> = LazyLock::new(|| {
    let mut m = AHashMap::default();
    for (aa1, aa3) in AA1_TO_AA3_VEC {
        m.insert(aa1.as_bytes()[0], *aa3);
    }
    m
});

/// Trim the common prefix of reference and alternative allele.
///
/// Returns the number of trimmed bases together with both remainders.
pub fn trim_common_prefixes(reference: &[u8], alternative: &[u8]) -> (usize, Sequence, Sequence) {
    let trim = reference
        .iter()
        .zip(alternative)
        .take_while(|(r, a)| r == a)
        .count();

    (trim, reference[trim..].into(), alternative[trim..].into())
}

/// Trim the common suffix of reference and alternative allele.
pub fn trim_common_suffixes(reference: &[u8], alternative: &[u8]) -> (usize, Sequence, Sequence) {
    let trim = reference
        .iter()
        .rev()
        .zip(alternative.iter().rev())
        .take_while(|(r, a)| r == a)
        .count();

    (
        trim,
        reference[..reference.len() - trim].into(),
        alternative[..alternative.len() - trim].into(),
    )
}

/// Reverse complementing shortcut.
pub fn revcomp(seq: &[u8]) -> Sequence {
    bio::alphabets::dna::revcomp(seq)
}

/// Reverse complement into a caller-provided buffer, avoiding allocation on hot paths.
pub fn revcomp_into(seq: &[u8], buf: &mut Sequence) {
    buf.clear();
    buf.extend(seq.iter().rev().map(|c| bio::alphabets::dna::complement(*c)));
}

/// Complement of a single DNA base.
pub fn complement(base: u8) -> u8 {
    bio::alphabets::dna::complement(base)
}

/// Translate the given codon to a 1-letter amino acid.
///
/// Codons are normalized to upper case with `U -> T` first.  A codon that
/// contains an IUPAC ambiguity code translates to the unknown residue `X`.
///
/// # Args
///
/// * `codon` -- A codon of exactly three bases.
///
/// # Returns
///
/// The corresponding amino acid.
pub fn translate_codon(codon: &[u8]) -> Result<u8, Error> {
    if codon.len() != 3 {
        return Err(Error::UndefinedCodon(
            String::from_utf8_lossy(codon).into_owned(),
        ));
    }

    let mut normalized: Codon = [0; 3];
    for (i, c) in codon.iter().enumerate() {
        normalized[i] = DNA_ASCII_MAP[*c as usize];
    }

    DNA_TO_AA1
        .get(&normalized)
        .copied()
        .or_else(|| {
            normalized
                .iter()
                .any(|c| IUPAC_AMBIGUITY_CODES.contains(c))
                .then_some(b'X')
        })
        .ok_or_else(|| Error::UndefinedCodon(String::from_utf8_lossy(codon).into_owned()))
}

/// Translates a DNA sequence into a single-letter amino acid sequence.
///
/// # Args
///
/// * `seq` -- A nucleotide sequence whose length is a multiple of 3.
///
/// # Returns
///
/// The corresponding single letter amino acid sequence.
pub fn translate_cds(seq: &[u8]) -> Result<Sequence, Error> {
    if seq.is_empty() {
        return Ok(b"".into());
    }

    if seq.len() % 3 != 0 {
        return Err(Error::UntranslatableDnaLength(seq.len()));
    }

    let mut result = Vec::with_capacity(seq.len() / 3);
    for chunk in seq.chunks_exact(3) {
        result.push(translate_codon(chunk)?);
    }

    Ok(result)
}

/// Converts a string of 1-letter amino acids to 3-letter amino acids.
///
/// # Args
///
/// * `seq` -- An amino acid sequence as 1-letter amino acids.
///
/// # Returns
///
/// The sequence as 3-letter amino acids.
pub fn aa1_to_aa3(seq: &[u8]) -> Result<String, Error> {
    if seq.is_empty() {
        return Ok(String::new());
    }

    let mut result = String::with_capacity(seq.len() * 3);

    for (i, aa1) in seq.iter().enumerate() {
        let aa3 = AA1_TO_AA3.get(aa1).ok_or_else(|| {
            Error::InvalidOneLetterAminoAcid(format!("{:?}", *aa1 as char), format!("{}", i + 1))
        })?;
        result.push_str(aa3);
    }

    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn suffix_trimming() {
        assert_eq!(trim_common_suffixes(b"", b""), (0, vec![], vec![]));
        assert_eq!(trim_common_suffixes(b"", b"C"), (0, vec![], b"C".to_vec()));
        assert_eq!(trim_common_suffixes(b"C", b""), (0, b"C".to_vec(), vec![]));
        assert_eq!(trim_common_suffixes(b"A", b"AA"), (1, vec![], b"A".to_vec()));
        assert_eq!(
            trim_common_suffixes(b"AT", b"AG"),
            (0, b"AT".to_vec(), b"AG".to_vec())
        );
        assert_eq!(
            trim_common_suffixes(b"ATCG", b"AGCG"),
            (2, b"AT".to_vec(), b"AG".to_vec())
        );
    }

    #[test]
    fn prefix_trimming() {
        assert_eq!(trim_common_prefixes(b"", b""), (0, vec![], vec![]));
        assert_eq!(trim_common_prefixes(b"", b"C"), (0, vec![], b"C".to_vec()));
        assert_eq!(trim_common_prefixes(b"C", b""), (0, b"C".to_vec(), vec![]));
        assert_eq!(
            trim_common_prefixes(b"TA", b"GA"),
            (0, b"TA".to_vec(), b"GA".to_vec())
        );
        assert_eq!(
            trim_common_prefixes(b"CGTA", b"CGGA"),
            (2, b"TA".to_vec(), b"GA".to_vec())
        );
    }

    #[test]
    fn revcomp_cases() {
        assert_eq!(revcomp(b""), b"");
        assert_eq!(revcomp(b"A"), b"T");
        assert_eq!(revcomp(b"AG"), b"CT");
        assert_eq!(revcomp(b"CGAG"), b"CTCG");
    }

    #[test]
    fn revcomp_into_reuses_buffer() {
        let mut buf = Vec::new();
        revcomp_into(b"CGAG", &mut buf);
        assert_eq!(buf, b"CTCG".to_vec());
        revcomp_into(b"A", &mut buf);
        assert_eq!(buf, b"T".to_vec());
    }

    #[test]
    fn translate_codon_examples() -> Result<(), Error> {
        assert_eq!(translate_codon(b"ATG")?, b'M');
        assert_eq!(translate_codon(b"AUG")?, b'M');
        assert_eq!(translate_codon(b"atg")?, b'M');
        assert_eq!(translate_codon(b"TAA")?, b'*');
        assert_eq!(translate_codon(b"GGT")?, b'G');
        assert_eq!(translate_codon(b"GGN")?, b'X');
        assert_eq!(translate_codon(b"NNN")?, b'X');
        assert!(translate_codon(b"GGQ").is_err());
        assert!(translate_codon(b"GG").is_err());

        Ok(())
    }

    #[test]
    fn translate_cds_examples() -> Result<(), Error> {
        assert_eq!(translate_cds(b"ATGCGA")?, b"MR".to_vec());
        assert_eq!(translate_cds(b"AUGCGA")?, b"MR".to_vec());
        assert_eq!(translate_cds(b"")?, b"".to_vec());
        assert_eq!(translate_cds(b"ATGTAN")?, b"MX".to_vec());
        assert_eq!(translate_cds(b"ATGTGA")?, b"M*".to_vec());
        assert!(translate_cds(b"AUGCG").is_err());

        Ok(())
    }

    #[test]
    fn aa1_to_aa3_examples() -> Result<(), Error> {
        assert_eq!(aa1_to_aa3(b"")?, "");
        assert_eq!(
            aa1_to_aa3(b"CATSARELAME")?,
            "CysAlaThrSerAlaArgGluLeuAlaMetGlu"
        );
        assert_eq!(aa1_to_aa3(b"G*")?, "GlyTer");

        Ok(())
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
