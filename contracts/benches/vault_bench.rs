// Vault throughput benchmarks.
//
// Covers a full deposit/withdraw cycle against the reference token, the
// native cycle, and the cost of the conservation audit as the number of
// depositors grows.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use custody_contracts::{AssetBook, Host, InMemoryBank, ReturnConvention, Token, Vault};
use custody_protocol::{Address, AssetId, EventLog};

fn setup() -> (Host, Arc<Token>, Arc<InMemoryBank>, Address) {
    let owner = Address::derive("owner");
    let book = Arc::new(AssetBook::new());
    let token = Arc::new(Token::new("Bench", "BNC", 18, owner, ReturnConvention::NoReturn));
    book.bind(token.id(), token.clone());
    let bank = Arc::new(InMemoryBank::new());
    let vault = Arc::new(Vault::new(
        Address::derive("vault"),
        owner,
        book,
        bank.clone(),
        Arc::new(EventLog::with_capacity(1_024)),
    ));
    let host = Host::new(vault, bank.clone());
    host.set_allowed(owner, token.id(), true).unwrap();
    host.set_allowed(owner, AssetId::NATIVE, true).unwrap();
    (host, token, bank, owner)
}

fn bench_token_cycle(c: &mut Criterion) {
    let (host, token, _bank, owner) = setup();
    let d = Address::derive("depositor");
    token.mint(owner, d, u64::MAX as u128).unwrap();
    token.approve(d, host.vault().address(), u64::MAX as u128);

    c.bench_function("vault_token_deposit_withdraw", |b| {
        b.iter(|| {
            host.deposit(d, token.id(), 1_000).unwrap();
            host.withdraw(d, token.id(), 1_000).unwrap();
        })
    });
}

fn bench_native_cycle(c: &mut Criterion) {
    let (host, _token, bank, _owner) = setup();
    let d = Address::derive("depositor");
    bank.mint(d, u64::MAX as u128).unwrap();

    c.bench_function("vault_native_deposit_withdraw", |b| {
        b.iter(|| {
            host.deposit_native(d, 1_000).unwrap();
            host.withdraw_native(d, 1_000).unwrap();
        })
    });
}

fn bench_conservation_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault_conservation_audit");

    for depositors in [10usize, 100, 1_000] {
        let (host, token, _bank, owner) = setup();
        for i in 0..depositors {
            let d = Address::derive(&format!("d{}", i));
            token.mint(owner, d, 10).unwrap();
            token.approve(d, host.vault().address(), 10);
            host.deposit(d, token.id(), 10).unwrap();
        }
        group.bench_with_input(
            BenchmarkId::from_parameter(depositors),
            &depositors,
            |b, _| b.iter(|| assert!(host.vault().is_conserved(&token.id()))),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_token_cycle,
    bench_native_cycle,
    bench_conservation_audit
);
criterion_main!(benches);
