//! FASTA/FASTQ parsing with automatic decompression
//!
//! Reads DNA sequences from FASTA or FASTQ files, with transparent gzip
//! decompression. Reads are cut at non-ACGT bases and the fragments shorter
//! than k are dropped, so everything handed to the compactor is valid.

use anyhow::{bail, Context, Result};
use needletail::parse_fastx_file;
use std::path::Path;

use crate::encoding::encode_base;

/// Parse a FASTA/FASTQ file and call a function for each record
///
/// # Arguments
/// * `path` - Path to input file (may be gzipped)
/// * `callback` - Function called for each record, receives (name, sequence)
///
/// # Errors
/// Returns error if the file cannot be opened or a record is malformed, or
/// if the callback fails
pub fn parse_sequences<P, F>(path: P, mut callback: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&[u8], &[u8]) -> Result<()>,
{
    let path = path.as_ref();

    // needletail automatically handles gzip decompression
    let mut reader = parse_fastx_file(path)
        .with_context(|| format!("Failed to open sequence file: {}", path.display()))?;

    while let Some(record) = reader.next() {
        let record = record
            .with_context(|| format!("Failed to parse sequence record in {}", path.display()))?;
        let seq = record.seq();
        callback(record.id(), &seq)?;
    }

    Ok(())
}

/// Parse a pair of read files in lockstep, calling `callback` with R1 then R2
/// of every pair
///
/// # Errors
/// Returns error if either file fails to parse or the files hold a different
/// number of records
pub fn parse_paired_sequences<P, F>(r1: P, r2: P, mut callback: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&[u8], &[u8]) -> Result<()>,
{
    let (r1, r2) = (r1.as_ref(), r2.as_ref());
    let mut left = parse_fastx_file(r1)
        .with_context(|| format!("Failed to open sequence file: {}", r1.display()))?;
    let mut right = parse_fastx_file(r2)
        .with_context(|| format!("Failed to open sequence file: {}", r2.display()))?;

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ok(()),
            (Some(a), Some(b)) => {
                let a = a.with_context(|| format!("Failed to parse sequence record in {}", r1.display()))?;
                let b = b.with_context(|| format!("Failed to parse sequence record in {}", r2.display()))?;
                callback(a.id(), &a.seq())?;
                callback(b.id(), &b.seq())?;
            }
            _ => bail!(
                "Paired files {} and {} hold a different number of records",
                r1.display(),
                r2.display()
            ),
        }
    }
}

/// Split a read at non-ACGT bases, keeping fragments of at least `k` bases
/// together with their offset in the read
pub fn split_valid_fragments(seq: &[u8], k: usize) -> Vec<(usize, &[u8])> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for (i, &b) in seq.iter().enumerate() {
        if encode_base(b).is_none() {
            if i - start >= k.max(1) {
                fragments.push((start, &seq[start..i]));
            }
            start = i + 1;
        }
    }
    if seq.len() - start.min(seq.len()) >= k.max(1) {
        fragments.push((start, &seq[start..]));
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_split_valid_fragments() {
        let frags = split_valid_fragments(b"ACGTNACGTACGNNTTTTTTTT", 5);
        assert_eq!(frags, vec![(5, &b"ACGTACG"[..]), (14, &b"TTTTTTTT"[..])]);
        assert!(split_valid_fragments(b"ACGT", 5).is_empty());
        assert!(split_valid_fragments(b"NNNN", 1).is_empty());
        assert!(split_valid_fragments(b"", 1).is_empty());
        assert_eq!(split_valid_fragments(b"acgtn", 3), vec![(0, &b"acgt"[..])]);
    }

    #[test]
    fn test_parse_fasta_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, ">seq1")?;
        writeln!(temp_file, "ACGT")?;
        writeln!(temp_file, ">seq2")?;
        writeln!(temp_file, "TGCA")?;
        temp_file.flush()?;

        let mut sequences = Vec::new();
        parse_sequences(temp_file.path(), |name, seq| {
            sequences.push((name.to_vec(), seq.to_vec()));
            Ok(())
        })?;

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].0, b"seq1");
        assert_eq!(sequences[0].1, b"ACGT");
        assert_eq!(sequences[1].0, b"seq2");
        assert_eq!(sequences[1].1, b"TGCA");

        Ok(())
    }

    #[test]
    fn test_parse_paired_interleaves() -> Result<()> {
        let mut r1 = NamedTempFile::new()?;
        writeln!(r1, "@a/1\nAAAA\n+\nIIII\n@b/1\nCCCC\n+\nIIII")?;
        r1.flush()?;
        let mut r2 = NamedTempFile::new()?;
        writeln!(r2, "@a/2\nGGGG\n+\nIIII\n@b/2\nTTTT\n+\nIIII")?;
        r2.flush()?;

        let mut seqs = Vec::new();
        parse_paired_sequences(r1.path(), r2.path(), |_, seq| {
            seqs.push(seq.to_vec());
            Ok(())
        })?;
        assert_eq!(
            seqs,
            vec![b"AAAA".to_vec(), b"GGGG".to_vec(), b"CCCC".to_vec(), b"TTTT".to_vec()]
        );
        Ok(())
    }

    #[test]
    fn test_parse_paired_length_mismatch() -> Result<()> {
        let mut r1 = NamedTempFile::new()?;
        writeln!(r1, ">a\nACGT\n>b\nACGT")?;
        r1.flush()?;
        let mut r2 = NamedTempFile::new()?;
        writeln!(r2, ">a\nACGT")?;
        r2.flush()?;

        let result = parse_paired_sequences(r1.path(), r2.path(), |_, _| Ok(()));
        assert!(result.is_err());
        Ok(())
    }
}
