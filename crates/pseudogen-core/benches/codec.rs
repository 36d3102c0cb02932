//! Benchmarks for the rules.ini codec and the sample engine.
//!
//! Rule files are synthesized with a growing number of columns so parse and
//! render cost can be compared across sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pseudogen_core::generate::execute;
use pseudogen_core::RuleFile;

/// A rules.ini with `columns` columns cycling through the common sources.
fn make_rules(columns: usize) -> String {
    let mut text = format!("[rec]\nnum = 500\nmode = 2\ncols = {}\n", columns);
    for i in 1..=columns {
        text.push_str(&format!("\n[c{}]\nname = col_{}\n", i, i));
        match i % 4 {
            0 => text.push_str("dtype = int\ndata = increment\nstart = 1\ninterval = 3\n"),
            1 => text.push_str(
                "dtype = str\ndata = random\noptions = North,South,East,West\nweights = 4,3,2,1\n",
            ),
            2 => text.push_str(&format!(
                "dtype = str\ndata = reference\ncols = {}\nvalue = North,South,East,West\nrange = N,S,E,W\n",
                i - 1
            )),
            _ => text.push_str("dtype = str\ndata = faker\nfaker_method = first_name\n"),
        }
    }
    text.push_str("\n[a1]\noperation = replace\ncols = 1\nfind = North\nreplace = Up\n");
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("ini_parse");
    for columns in [4, 32, 256] {
        let text = make_rules(columns);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(columns), &text, |b, text| {
            b.iter(|| RuleFile::from_ini_str(text))
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("ini_render");
    for columns in [4, 32, 256] {
        let rf = match RuleFile::from_ini_str(&make_rules(columns)) {
            Ok(rf) => rf,
            Err(e) => panic!("benchmark rules do not parse: {}", e),
        };
        group.throughput(Throughput::Elements(columns as u64));
        group.bench_with_input(BenchmarkId::from_parameter(columns), &rf, |b, rf| {
            b.iter(|| rf.to_ini_string())
        });
    }
    group.finish();
}

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_500_rows");
    group.sample_size(20);
    for columns in [4, 32] {
        let rf = match RuleFile::from_ini_str(&make_rules(columns)) {
            Ok(rf) => rf,
            Err(e) => panic!("benchmark rules do not parse: {}", e),
        };
        group.throughput(Throughput::Elements(500));
        group.bench_with_input(BenchmarkId::from_parameter(columns), &rf, |b, rf| {
            b.iter(|| execute(rf, 42))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_render, bench_sample);
criterion_main!(benches);
