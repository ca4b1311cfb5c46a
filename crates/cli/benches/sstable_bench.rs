use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memtable::Memtable;
use sstable::{Backend, MergeIterator, SSTable, SSTableWriter, Table};
use tempfile::{tempdir, TempDir};

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn build_memtable() -> Memtable {
    let mut mem = Memtable::new(1);
    for i in 0..N_KEYS {
        mem.upsert_at(
            format!("key{:05}", i).into_bytes(),
            vec![b'x'; VALUE_SIZE],
            i as i64,
        );
    }
    mem
}

fn write_table() -> (TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.sst");
    SSTableWriter::write_from_memtable(&path, &build_memtable()).unwrap();
    (dir, path)
}

fn sstable_write_benchmark(c: &mut Criterion) {
    c.bench_function("sstable_write_from_memtable_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let path = dir.path().join("bench.sst");
                (dir, path, build_memtable())
            },
            |(_dir, path, mem)| {
                SSTableWriter::write_from_memtable(&path, &mem).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn sstable_get_benchmark(c: &mut Criterion) {
    let (_dir, path) = write_table();
    for backend in [Backend::Mmap, Backend::Pread] {
        let table = SSTable::open(&path, backend).unwrap();
        c.bench_function(&format!("sstable_get_hit_10k_{}", backend), |b| {
            b.iter(|| {
                for i in 0..N_KEYS {
                    let key = format!("key{:05}", i).into_bytes();
                    assert!(table.get(&key).unwrap().is_some());
                }
            })
        });
        c.bench_function(&format!("sstable_get_miss_10k_{}", backend), |b| {
            b.iter(|| {
                for i in 0..N_KEYS {
                    let key = format!("missing{}", i).into_bytes();
                    assert!(table.get(&key).unwrap().is_none());
                }
            })
        });
    }
}

fn sstable_scan_benchmark(c: &mut Criterion) {
    let (_dir, path) = write_table();
    for backend in [Backend::Mmap, Backend::Pread] {
        let table = SSTable::open(&path, backend).unwrap();
        c.bench_function(&format!("sstable_full_scan_10k_{}", backend), |b| {
            b.iter(|| {
                let rows = table.scan_from(b"").unwrap().count();
                assert_eq!(rows, N_KEYS);
            })
        });
    }
}

fn merge_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let tables: Vec<SSTable> = (0..4)
        .map(|t| {
            let mut mem = Memtable::new(t + 1);
            for i in (t as usize..N_KEYS).step_by(2) {
                mem.upsert_at(format!("key{:05}", i).into_bytes(), vec![b'y'; VALUE_SIZE], t as i64);
            }
            let path = dir.path().join(format!("{}.sst", t));
            SSTableWriter::write_from_memtable(&path, &mem).unwrap();
            SSTable::open(&path, Backend::Mmap).unwrap()
        })
        .collect();
    let sources: Vec<&dyn Table> = tables.iter().rev().map(|t| t as &dyn Table).collect();

    c.bench_function("merge_4_tables_live", |b| {
        b.iter(|| {
            let live = MergeIterator::over(&sources, b"").unwrap().live().count();
            assert_eq!(live, N_KEYS);
        })
    });
}

criterion_group!(
    benches,
    sstable_write_benchmark,
    sstable_get_benchmark,
    sstable_scan_benchmark,
    merge_benchmark
);
criterion_main!(benches);
