//! Parser performance benchmarks.
//!
//! Measures delimiter detection and parsing across table sizes.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use metascribe::input::Parser;
use std::io::Write;
use tempfile::NamedTempFile;

/// Synthetic survey-like data with one column per semantic type.
fn generate_data(rows: usize, cols: usize, delimiter: char) -> String {
    let mut data = String::new();

    let headers: Vec<String> = (0..cols).map(|i| format!("column_{}", i + 1)).collect();
    data.push_str(&headers.join(&delimiter.to_string()));
    data.push('\n');

    for row in 0..rows {
        let cells: Vec<String> = (0..cols)
            .map(|col| match col % 6 {
                0 => format!("ID_{:06}", row),
                1 => format!("{:.2}", row as f64 * 1.5),
                2 => (row % 5 + 1).to_string(),
                3 => if row % 2 == 0 { "yes" } else { "no" }.to_string(),
                4 => format!("Category_{}", row % 10),
                5 => format!("\"visit {} went fine, patient stable\"", row),
                _ => unreachable!(),
            })
            .collect();
        data.push_str(&cells.join(&delimiter.to_string()));
        data.push('\n');
    }

    data
}

fn bench_parse_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_file");

    for (suffix, delimiter) in [(".csv", ','), (".tsv", '\t')] {
        for rows in [100, 1_000, 10_000] {
            let data = generate_data(rows, 12, delimiter);
            group.throughput(Throughput::Bytes(data.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(suffix.trim_start_matches('.'), rows),
                &data,
                |b, data| {
                    b.iter_with_setup(
                        || {
                            let mut temp = NamedTempFile::with_suffix(suffix).unwrap();
                            temp.write_all(data.as_bytes()).unwrap();
                            temp
                        },
                        |temp| black_box(Parser::new().parse_file(temp.path()).unwrap()),
                    )
                },
            );
        }
    }

    group.finish();
}

/// In-memory parsing, isolating detection and CSV decoding from file I/O.
fn bench_parse_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_bytes_column_scaling");

    for cols in [6, 12, 48] {
        let data = generate_data(1_000, cols, ',');
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("cols", cols), &data, |b, data| {
            let parser = Parser::new();
            b.iter(|| black_box(parser.parse_bytes(data.as_bytes()).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_file, bench_parse_bytes);
criterion_main!(benches);
