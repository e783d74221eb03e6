use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use tealeaf::codec::bitio::{BitReader, BitWriter};
use tealeaf::codec::{create_coder, Coder};

fn sorted_gaps(count: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(1..=1000u64)).collect()
}

fn bench_encode(c: &mut Criterion) {
    let values = sorted_gaps(10_000);
    for description in ["ETG:5:2", "PEG:3"] {
        let coder = create_coder(description).unwrap();
        c.bench_function(&format!("encode_{}", description), |b| {
            b.iter(|| {
                let mut w = BitWriter::new();
                coder.encode_all(black_box(&values), &mut w).unwrap();
                black_box(w.into_bytes())
            })
        });
    }
}

fn bench_decode(c: &mut Criterion) {
    let values = sorted_gaps(10_000);
    for description in ["ETG:5:2", "PEG:3"] {
        let coder = create_coder(description).unwrap();
        let mut w = BitWriter::new();
        coder.encode_all(&values, &mut w).unwrap();
        let bytes = w.into_bytes();
        c.bench_function(&format!("decode_{}", description), |b| {
            b.iter(|| {
                let mut r = BitReader::new(black_box(&bytes));
                black_box(coder.decode_all(&mut r, values.len()).unwrap())
            })
        });
    }
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
