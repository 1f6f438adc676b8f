//! Benchmarks for message classification
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};
use chatops_ssh_bridge::domain::{AllowList, Command, CommandRequest, ParsedCommand};
use std::hint::black_box;

fn create_allow_list(size: usize) -> AllowList {
    (0..size)
        .map(|i| (format!("cmd{i}"), format!("echo {i}")))
        .chain([("df".to_string(), "df -h".to_string())])
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let small = create_allow_list(5);
    let large = create_allow_list(500);

    let inputs = [
        ("allow_listed", "/df"),
        ("unrecognized", "/reboot now please"),
        ("getlog", "/getlog /var/log/nginx/access.log"),
        ("runscript", "/runscript install-docker.sh"),
        ("plain_text", "hello"),
    ];

    let mut group = c.benchmark_group("parse");
    for (name, text) in inputs {
        let request = CommandRequest::from_user(text);
        group.bench_function(format!("{name}_small"), |b| {
            b.iter(|| Command::parse(black_box(&request), black_box(&small)));
        });
        group.bench_function(format!("{name}_large"), |b| {
            b.iter(|| Command::parse(black_box(&request), black_box(&large)));
        });
    }
    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let long_path = format!("/getlog {}", "segment/".repeat(200));

    c.bench_function("split_short", |b| {
        b.iter(|| ParsedCommand::split(black_box("/df")));
    });
    c.bench_function("split_long", |b| {
        b.iter(|| ParsedCommand::split(black_box(&long_path)));
    });
}

criterion_group!(benches, bench_parse, bench_split);
criterion_main!(benches);
