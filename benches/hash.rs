use criterion::{criterion_group, criterion_main, Bencher, BenchmarkId, Criterion, Throughput};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::Rng;

use hashcore::Dict;

const CAPACITY: [usize; 3] = [512, 4096, 16384];
const LOAD_FACTOR: [f64; 3] = [0.3, 0.5, 0.8];
const TOTAL_OPERATIONS: u64 = 2000;

static RANDOM_INDEXES: Lazy<Vec<u64>> = Lazy::new(|| {
    let mut rng = rand::thread_rng();
    (0..TOTAL_OPERATIONS)
        .map(|_| rng.gen_range(0, CAPACITY[2] as u64))
        .collect()
});

fn populated(capacity: usize, load_factor: f64) -> Dict<Vec<u8>, u64> {
    let mut d = Dict::new();
    let n = (capacity as f64 * load_factor) as u64;
    for i in 0..n {
        d.replace(i.to_be_bytes().to_vec(), i);
    }
    while d.is_rehashing() {
        d.rehash_step(64);
    }
    d
}

fn hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict");
    group.throughput(Throughput::Elements(TOTAL_OPERATIONS));

    for input in CAPACITY.iter().cartesian_product(LOAD_FACTOR.iter()) {
        let (&capacity, &load_factor) = input;
        let description = format!("capacity: {}, load_factor: {}", capacity, load_factor);

        group.bench_with_input(
            BenchmarkId::new("random get", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| random_get(b, capacity, load_factor),
        );

        group.bench_with_input(
            BenchmarkId::new("insert fresh", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| insert_fresh(b, capacity, load_factor),
        );

        group.bench_with_input(
            BenchmarkId::new("replace existing", description.clone()),
            &(capacity, load_factor),
            |b, &(capacity, load_factor)| replace_existing(b, capacity, load_factor),
        );
    }
    group.finish()
}

fn random_get(b: &mut Bencher, capacity: usize, load_factor: f64) {
    let mut d = populated(capacity, load_factor);
    b.iter(|| {
        for id in RANDOM_INDEXES.iter() {
            let _ = d.find(&id.to_be_bytes().to_vec());
        }
    });
}

fn insert_fresh(b: &mut Bencher, capacity: usize, load_factor: f64) {
    b.iter(|| {
        let mut d = populated(capacity, load_factor);
        for id in RANDOM_INDEXES.iter() {
            d.replace(id.to_be_bytes().to_vec(), *id);
        }
    });
}

fn replace_existing(b: &mut Bencher, capacity: usize, load_factor: f64) {
    let mut d = populated(capacity, load_factor);
    b.iter(|| {
        for id in RANDOM_INDEXES.iter() {
            d.replace(id.to_be_bytes().to_vec(), id + 1);
        }
    });
}

criterion_group!(benches, hash);
criterion_main!(benches);
