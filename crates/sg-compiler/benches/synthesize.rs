use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sg_compiler::{plan_update, synthesize_rules, ExtensionContext};
use sg_core::settings::Settings;
use sg_core::types::MAX_BLOCKED_SITES;

fn full_site_list() -> Vec<String> {
    (0..MAX_BLOCKED_SITES)
        .map(|i| {
            if i % 4 == 0 {
                format!("https://site{}.example/*", i)
            } else {
                format!("site{}.example", i)
            }
        })
        .collect()
}

fn bench_synthesize(c: &mut Criterion) {
    let sites = full_site_list();
    let ctx = ExtensionContext::new("abcdefghijklmnop");

    c.bench_function("synthesize_full_range", |b| {
        b.iter(|| synthesize_rules(black_box(sites.as_slice()), black_box("https://focus.example/"), &ctx))
    });

    let settings = Settings {
        blocked_sites: sites.clone(),
        redirect_url: "notaurl".to_string(),
        challenge_text: String::new(),
    };
    c.bench_function("plan_update_full_range_fallback", |b| {
        b.iter(|| plan_update(black_box(&settings), &ctx))
    });
}

criterion_group!(benches, bench_synthesize);
criterion_main!(benches);
