//! Benchmarks for event mapping
//!
//! Measures the synchronous work done per tracked event: parsing, validation,
//! PII hashing and payload serialization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};

use capi_core::{hash_pii, ClientContext, InboundEvent, ProviderPayload};

fn sample_body() -> Value {
    json!({
        "eventName": "Purchase",
        "eventId": "evt-7f3a",
        "eventSourceUrl": "https://shop.test/checkout/complete",
        "eventTime": 1_700_000_000,
        "userData": {
            "email": "Jane.Doe@Example.com",
            "phone": "+1 555 0100",
            "firstName": "Jane",
            "lastName": "Doe",
            "fbp": "fb.1.1700000000.123456789",
            "fbc": "fb.1.1700000000.AbCdEf"
        },
        "customData": { "value": 49.99, "currency": "USD" }
    })
}

fn bench_hash_pii(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_pii");

    for len in [8usize, 32, 128] {
        let input = format!("  {}@Example.com ", "x".repeat(len));
        group.bench_with_input(BenchmarkId::from_parameter(len), &input, |b, input| {
            b.iter(|| black_box(hash_pii(Some(input.as_str()))))
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let body = sample_body();

    c.bench_function("parse_and_validate", |b| {
        b.iter(|| {
            let inbound: InboundEvent = serde_json::from_value(body.clone()).unwrap();
            black_box(inbound.validate().unwrap())
        })
    });
}

fn bench_build_payload(c: &mut Criterion) {
    let inbound: InboundEvent = serde_json::from_value(sample_body()).unwrap();
    let event = inbound.validate().unwrap().enrich(ClientContext::resolve(
        Some("203.0.113.7"),
        None,
        Some("Mozilla/5.0 (X11; Linux x86_64)"),
    ));

    c.bench_function("build_and_serialize_payload", |b| {
        b.iter(|| {
            let user_data = event.validate().unwrap();
            let payload = ProviderPayload::for_event(&event, user_data, 1_700_000_000, None);
            black_box(serde_json::to_vec(&payload).unwrap())
        })
    });
}

criterion_group!(benches, bench_hash_pii, bench_validate, bench_build_payload);

criterion_main!(benches);
