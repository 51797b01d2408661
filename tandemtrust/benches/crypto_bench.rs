// TandemTrust cryptographic benchmarks using criterion.
//
// Measures:
//   - MODP-1536 public value and shared secret computation
//   - Session key derivation
//   - Seal / open at various payload sizes
//   - Full five-message handshake

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use tandemtrust::cert::TrustAnchor;
use tandemtrust::channel::{open, seal};
use tandemtrust::credentials::LocalCredentials;
use tandemtrust::crypto::dh::{compute_public_value, DhKeyPair};
use tandemtrust::crypto::key_schedule::derive_session_keys;
use tandemtrust::crypto::keys::IdentityKeyPair;
use tandemtrust::{Initiator, Responder};

// ---------------------------------------------------------------------------
// Diffie-Hellman
// ---------------------------------------------------------------------------

fn bench_dh(c: &mut Criterion) {
    let exponent = [0x0au8; 32];
    c.bench_function("modp1536_public_value", |b| {
        b.iter(|| black_box(compute_public_value(black_box(&exponent))));
    });

    let peer = *DhKeyPair::generate().public_value();
    c.bench_function("modp1536_shared_secret", |b| {
        b.iter(|| {
            let pair = DhKeyPair::from_private_exponent(exponent);
            black_box(pair.diffie_hellman(black_box(&peer)).unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// Key schedule
// ---------------------------------------------------------------------------

fn bench_key_schedule(c: &mut Criterion) {
    let a = DhKeyPair::generate();
    let b_pair = DhKeyPair::generate();
    let shared = a.diffie_hellman(b_pair.public_value()).unwrap();
    let nonce = [0x11u8; 32];
    c.bench_function("derive_session_keys", |b| {
        b.iter(|| black_box(derive_session_keys(black_box(&nonce), &shared).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Seal / open
// ---------------------------------------------------------------------------

fn bench_channel(c: &mut Criterion) {
    let key = [0x42u8; 16];
    let iv = [0x24u8; 16];
    let mac_key = [0x99u8; 16];
    let sizes: &[usize] = &[64, 1024, 16384];

    let mut group = c.benchmark_group("seal");
    for &size in sizes {
        let payload = vec![0xABu8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}B")),
            &payload,
            |b, payload| b.iter(|| black_box(seal(payload, &key, &iv, &mac_key).unwrap())),
        );
    }
    group.finish();

    let mut group = c.benchmark_group("open");
    for &size in sizes {
        let ct = seal(&vec![0xABu8; size], &key, &iv, &mac_key).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}B")),
            &ct,
            |b, ct| b.iter(|| black_box(open(ct, &key, &iv, &mac_key).unwrap())),
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Full handshake
// ---------------------------------------------------------------------------

fn bench_handshake(c: &mut Criterion) {
    let ca = IdentityKeyPair::generate();
    let anchor = TrustAnchor::from_identity("Bench CA", &ca);
    let client = Arc::new(LocalCredentials::issue(&ca, "Bench CA", "client").unwrap());
    let server = Arc::new(LocalCredentials::issue(&ca, "Bench CA", "server").unwrap());

    c.bench_function("full_handshake", |b| {
        b.iter(|| {
            let mut initiator = Initiator::new(client.clone(), anchor.clone());
            let mut responder = Responder::new(server.clone(), anchor.clone());
            let m1 = initiator.start().unwrap();
            let m2 = responder.process_nonce(&m1).unwrap();
            let m3 = initiator.process_credentials(&m2).unwrap();
            let m4 = responder.process_credentials(&m3).unwrap();
            let m5 = initiator.process_finished(&m4).unwrap();
            responder.process_finished(&m5).unwrap();
            black_box(initiator.into_channel().unwrap());
        });
    });
}

criterion_group! {
    name = crypto_benches;
    config = Criterion::default()
        .sample_size(30)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_dh,
        bench_key_schedule,
        bench_channel,
        bench_handshake
}

criterion_main!(crypto_benches);
