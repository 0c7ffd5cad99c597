use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use taxoclass::classify::{Classifier, ClassifyOpts};
use taxoclass::index::ClassifyIndex;
use taxoclass::read::ReadSeq;

fn random_seq(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn bench_classify(c: &mut Criterion) {
    let refs: Vec<(String, Vec<u8>)> = (0..10u64)
        .map(|i| {
            let id = ((i + 100) << 32) | (i + 1);
            (format!("{id}|bench_ref"), random_seq(i, 20_000))
        })
        .collect();
    let index = ClassifyIndex::build(refs.clone()).unwrap();

    let reads: Vec<ReadSeq> = (0..64usize)
        .map(|i| {
            let (_, seq) = &refs[i % refs.len()];
            let start = (i * 97) % (seq.len() - 120);
            ReadSeq::from_bytes(format!("r{i}"), &seq[start..start + 100])
        })
        .collect();

    c.bench_function("classify_64x100bp", |b| {
        let mut cls = Classifier::new(ClassifyOpts::default());
        let mut records = Vec::new();
        b.iter(|| {
            let mut rnd = StdRng::seed_from_u64(7);
            for read in &reads {
                records.clear();
                cls.classify_one(&index, read, &mut rnd, &mut records)
                    .unwrap();
                black_box(&records);
            }
        })
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
