//! Decode and classify throughput for the progress feed pipeline
//!
//! Measures the full consumer path (incremental UTF-8 decode, line split,
//! JSON classification, state machine apply) over one synthetic session,
//! swept across transport chunk sizes.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use newsdeck_monitor::domain::CrawlSession;
use newsdeck_monitor::infrastructure::{EventParser, LineDecoder};

/// Builds a realistic feed: log lines with interleaved summaries, terminated
/// by the completion marker
fn synthetic_feed(events: usize) -> Vec<u8> {
    let mut feed = Vec::new();
    for i in 0..events {
        if i % 25 == 24 {
            feed.extend_from_slice(
                format!(
                    "data: {{\"type\": \"summary\", \"articles\": {i}, \"status\": \"success\"}}\n"
                )
                .as_bytes(),
            );
        } else {
            feed.extend_from_slice(
                format!(
                    "data: {{\"message\": \"Crawled article {i} from source feed\", \"status\": \"info\"}}\n"
                )
                .as_bytes(),
            );
        }
    }
    feed.extend_from_slice(b"data: {\"done\": true}\n");
    feed
}

fn run_pipeline(feed: &[u8], chunk_size: usize) -> usize {
    let mut decoder = LineDecoder::new();
    let parser = EventParser::new();
    let mut session = CrawlSession::new();
    let mut applied = 0;

    for chunk in feed.chunks(chunk_size) {
        for line in decoder.feed(chunk) {
            if let Some(event) = parser.parse(&line) {
                let _ = session.apply(event);
                applied += 1;
            }
        }
    }
    applied
}

fn decode_and_classify(c: &mut Criterion) {
    let feed = synthetic_feed(500);

    let mut group = c.benchmark_group("decode_and_classify");
    group.throughput(Throughput::Bytes(feed.len() as u64));
    for chunk_size in [64usize, 1024, 4096, 16384] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &size| b.iter(|| run_pipeline(black_box(&feed), size)),
        );
    }
    group.finish();
}

criterion_group!(benches, decode_and_classify);
criterion_main!(benches);
