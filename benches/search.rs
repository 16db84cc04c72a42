use criterion::{criterion_group, criterion_main, Bencher, BenchmarkId, Criterion};
use once_cell::sync::Lazy;
use rand::Rng;

use hashcore::IntSet;

const SIZES: [u32; 4] = [16, 256, 4096, 65536];

static MEMBERS: Lazy<Vec<i64>> = Lazy::new(|| {
    let mut rng = rand::thread_rng();
    let mut v: Vec<i64> = (0..*SIZES.last().unwrap() as i64).collect();
    // Spread values out so the wider encodings (I32, I64) get exercised too.
    for x in v.iter_mut() {
        *x *= rng.gen_range(1, 5);
    }
    v
});

fn populated(size: u32) -> IntSet {
    let mut set = IntSet::new();
    for v in MEMBERS.iter().take(size as usize) {
        set.add(*v);
    }
    set
}

fn search(c: &mut Criterion) {
    let mut group = c.benchmark_group("intset");

    for &size in SIZES.iter() {
        let present = *MEMBERS.get(size as usize / 2).unwrap();
        let absent = i64::from(size) * 100 + 7;

        group.bench_with_input(BenchmarkId::new("contains hit", size), &size, |b, &size| {
            contains(b, size, present)
        });

        group.bench_with_input(BenchmarkId::new("contains miss", size), &size, |b, &size| {
            contains(b, size, absent)
        });

        group.bench_with_input(BenchmarkId::new("add new member", size), &size, |b, &size| {
            add_new(b, size, absent)
        });
    }

    group.finish();
}

fn contains(b: &mut Bencher, size: u32, key: i64) {
    let set = populated(size);
    b.iter(|| set.contains(key));
}

fn add_new(b: &mut Bencher, size: u32, key: i64) {
    b.iter(|| {
        let mut set = populated(size);
        set.add(key);
    });
}

criterion_group!(benches, search);
criterion_main!(benches);
