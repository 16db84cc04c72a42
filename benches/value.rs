use criterion::{criterion_group, criterion_main, Bencher, BenchmarkId, Criterion};

use hashcore::config;
use hashcore::HashObject;

const ENTRY_COUNTS: [usize; 3] = [8, 64, 512];

fn value(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_object");

    for &n in ENTRY_COUNTS.iter() {
        group.bench_with_input(BenchmarkId::new("set packed", n), &n, |b, &n| {
            set_packed(b, n)
        });
        group.bench_with_input(BenchmarkId::new("set table", n), &n, |b, &n| set_table(b, n));
        group.bench_with_input(BenchmarkId::new("get packed", n), &n, |b, &n| {
            get_packed(b, n)
        });
        group.bench_with_input(BenchmarkId::new("get table", n), &n, |b, &n| get_table(b, n));
    }

    group.finish();
}

fn field(i: usize) -> Vec<u8> {
    format!("field-{}", i).into_bytes()
}

fn value_bytes(i: usize) -> Vec<u8> {
    format!("value-{}", i).into_bytes()
}

fn populated_packed(n: usize) -> HashObject {
    config::set_max_packed_entries(usize::max(n, 1) * 2);
    let mut h = HashObject::new();
    for i in 0..n {
        h.set(field(i), value_bytes(i));
    }
    config::set_max_packed_entries(128);
    h
}

fn populated_table(n: usize) -> HashObject {
    config::set_max_packed_entries(4);
    let mut h = HashObject::new();
    for i in 0..n {
        h.set(field(i), value_bytes(i));
    }
    assert!(!h.is_packed());
    config::set_max_packed_entries(128);
    h
}

fn set_packed(b: &mut Bencher, n: usize) {
    config::set_max_packed_entries(usize::max(n, 1) * 2);
    b.iter(|| {
        let mut h = HashObject::new();
        for i in 0..n {
            h.set(field(i), value_bytes(i));
        }
    });
    config::set_max_packed_entries(128);
}

fn set_table(b: &mut Bencher, n: usize) {
    config::set_max_packed_entries(4);
    b.iter(|| {
        let mut h = HashObject::new();
        for i in 0..n {
            h.set(field(i), value_bytes(i));
        }
    });
    config::set_max_packed_entries(128);
}

fn get_packed(b: &mut Bencher, n: usize) {
    let mut h = populated_packed(n);
    let probe = field(n / 2);
    b.iter(|| h.get(&probe));
}

fn get_table(b: &mut Bencher, n: usize) {
    let mut h = populated_table(n);
    let probe = field(n / 2);
    b.iter(|| h.get(&probe));
}

criterion_group!(benches, value);
criterion_main!(benches);
