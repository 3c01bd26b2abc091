use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use he_bootstrap::{flood, BatchEncoder, CryptoContext, Encryptor, HeParams, KeyGenerator};

fn flood_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood");

    for ring_dim in [4096usize, 8192] {
        let ctx = CryptoContext::new(HeParams::session(ring_dim)).unwrap();
        let keygen = KeyGenerator::new(ctx.clone());
        let encoder = BatchEncoder::new(ctx.clone());
        let encryptor = Encryptor::new(ctx.clone(), keygen.create_public_key());
        let ct = encryptor
            .encrypt(&encoder.encode(&[1, 2, 3]).unwrap())
            .unwrap();

        for noise_bits in [40u32, 100] {
            group.bench_with_input(
                BenchmarkId::new(format!("d{}", ring_dim), format!("{}_bits", noise_bits)),
                &noise_bits,
                |b, &bits| {
                    b.iter(|| {
                        let mut target = ct.clone();
                        flood(&mut target, &ctx, bits).unwrap();
                        target
                    });
                },
            );
        }
    }

    group.finish();
}

fn serialize_benchmark(c: &mut Criterion) {
    let ctx = CryptoContext::new(HeParams::session(8192)).unwrap();
    let keygen = KeyGenerator::new(ctx.clone());
    let encryptor = Encryptor::new(ctx.clone(), keygen.create_public_key());
    let ct = encryptor.encrypt_zero().unwrap();
    let bytes = ct.save().unwrap();

    let mut group = c.benchmark_group("ciphertext_wire");
    group.bench_function("save_d8192", |b| b.iter(|| ct.save().unwrap()));
    group.bench_function("load_unchecked_d8192", |b| {
        b.iter(|| he_bootstrap::Ciphertext::load_unchecked(&ctx, &bytes).unwrap())
    });
    group.finish();
}

criterion_group!(benches, flood_benchmark, serialize_benchmark);
criterion_main!(benches);
