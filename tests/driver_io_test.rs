// Driver-level tests: FASTQ input, TSV output, paired-end handling, and
// index persistence through the classify path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use taxoclass::classify::{classify_reads, ClassifyError, ClassifyOpts, DriverOpts};
use taxoclass::index::ClassifyIndex;

fn tagged(genus: u32, species: u32) -> String {
    format!("{}|synthetic", ((species as u64) << 32) | genus as u64)
}

fn random_seq(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn write_fastq(dir: &Path, name: &str, reads: &[(&str, &[u8])]) -> PathBuf {
    let mut content = String::new();
    for (id, seq) in reads {
        content.push_str(&format!(
            "@{}\n{}\n+\n{}\n",
            id,
            String::from_utf8_lossy(seq),
            "I".repeat(seq.len())
        ));
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn write_fasta(dir: &Path, name: &str, refs: &[(String, Vec<u8>)]) -> PathBuf {
    let mut content = String::new();
    for (id, seq) in refs {
        content.push_str(&format!(">{}\n{}\n", id, String::from_utf8_lossy(seq)));
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn single_end_tsv_output() {
    let dir = tempfile::tempdir().unwrap();
    let reference = random_seq(1, 800);
    let fasta = write_fasta(
        dir.path(),
        "ref.fa",
        &[(tagged(7, 42), reference.clone())],
    );
    let index = ClassifyIndex::build_from_fasta(&fasta).unwrap();

    let reads = write_fastq(
        dir.path(),
        "reads.fq",
        &[
            ("read1", &reference[100..150]),
            ("read2", b"NNNNNNNNNNNNNNNNNNNNNNNNNNNNNN"),
        ],
    );

    let mut out = Vec::new();
    let metrics = classify_reads(
        &index,
        &ClassifyOpts::default(),
        &DriverOpts::default(),
        &reads,
        None,
        &mut out,
    )
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["read1\t7\t42\t2450"]);
    assert_eq!(metrics.units, 2);
    assert_eq!(metrics.classified, 1);
}

#[test]
fn paired_end_accumulates_and_reports_once() {
    let dir = tempfile::tempdir().unwrap();
    let ref_a = random_seq(2, 800);
    let fasta = write_fasta(dir.path(), "ref.fa", &[(tagged(7, 42), ref_a.clone())]);
    let index = ClassifyIndex::build_from_fasta(&fasta).unwrap();

    let r1 = write_fastq(dir.path(), "r1.fq", &[("pair1", &ref_a[100..150])]);
    let r2 = write_fastq(dir.path(), "r2.fq", &[("pair1", &ref_a[400..450])]);

    let mut out = Vec::new();
    let metrics = classify_reads(
        &index,
        &ClassifyOpts::default(),
        &DriverOpts::default(),
        &r1,
        Some(r2.as_path()),
        &mut out,
    )
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("pair1\t7\t42\t"));
    assert_eq!(metrics.units, 1);
}

#[test]
fn paired_end_length_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let reference = random_seq(3, 800);
    let fasta = write_fasta(dir.path(), "ref.fa", &[(tagged(1, 1), reference.clone())]);
    let index = ClassifyIndex::build_from_fasta(&fasta).unwrap();

    let r1 = write_fastq(
        dir.path(),
        "r1.fq",
        &[
            ("a", &reference[0..50]),
            ("b", &reference[50..100]),
        ],
    );
    let r2 = write_fastq(dir.path(), "r2.fq", &[("a", &reference[100..150])]);

    let mut out = Vec::new();
    let err = classify_reads(
        &index,
        &ClassifyOpts::default(),
        &DriverOpts::default(),
        &r1,
        Some(r2.as_path()),
        &mut out,
    )
    .unwrap_err();
    assert!(matches!(err, ClassifyError::PairedEndMismatch { .. }));
}

#[test]
fn saved_index_classifies_identically() {
    let dir = tempfile::tempdir().unwrap();
    let reference = random_seq(4, 800);
    let fasta = write_fasta(
        dir.path(),
        "ref.fa",
        &[(tagged(9, 90), reference.clone())],
    );
    let built = ClassifyIndex::build_from_fasta(&fasta).unwrap();

    let idx_path = dir.path().join("ref.tci");
    built.save_to(&idx_path).unwrap();
    let loaded = ClassifyIndex::load_from(&idx_path).unwrap();

    let reads = write_fastq(dir.path(), "reads.fq", &[("read1", &reference[200..260])]);

    let mut out_a = Vec::new();
    let mut out_b = Vec::new();
    classify_reads(
        &built,
        &ClassifyOpts::default(),
        &DriverOpts::default(),
        &reads,
        None,
        &mut out_a,
    )
    .unwrap();
    classify_reads(
        &loaded,
        &ClassifyOpts::default(),
        &DriverOpts::default(),
        &reads,
        None,
        &mut out_b,
    )
    .unwrap();

    assert!(!out_a.is_empty());
    assert_eq!(out_a, out_b);
}
