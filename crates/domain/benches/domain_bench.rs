use chrono::NaiveDate;
use common::{BookId, Money, PromotionId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    DateRange, DiscountKind, Promotion, PromotionWindow, compute_discount, conflicting_books,
    overlapping_windows,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn make_windows(count: i64) -> Vec<PromotionWindow> {
    (0..count)
        .map(|i| {
            let start = date(2025, 1, 1) + chrono::Duration::days(i * 7);
            PromotionWindow {
                promotion_id: PromotionId::new(i),
                range: DateRange::new(start, start + chrono::Duration::days(6)).unwrap(),
                book_ids: (i * 10..i * 10 + 10).map(BookId::new).collect(),
            }
        })
        .collect()
}

fn bench_overlap_resolution(c: &mut Criterion) {
    let windows = make_windows(500);
    let candidate = DateRange::new(date(2025, 6, 1), date(2025, 6, 30)).unwrap();

    c.bench_function("domain/overlapping_windows_500", |b| {
        b.iter(|| {
            let hits = overlapping_windows(&candidate, &windows, None);
            std::hint::black_box(hits.len());
        });
    });
}

fn bench_conflict_intersection(c: &mut Criterion) {
    let windows = make_windows(500);
    let candidate = DateRange::new(date(2025, 1, 1), date(2025, 12, 31)).unwrap();
    let requested: Vec<BookId> = (0..100).map(BookId::new).collect();

    c.bench_function("domain/conflicting_books_500_windows", |b| {
        b.iter(|| {
            let hits = overlapping_windows(&candidate, &windows, None);
            let conflicts = conflicting_books(&requested, &hits);
            std::hint::black_box(conflicts.len());
        });
    });
}

fn bench_discount(c: &mut Criterion) {
    let promo = Promotion {
        id: PromotionId::new(1),
        name: "BENCH".to_string(),
        kind: DiscountKind::Percent,
        value: 15,
        start_date: date(2025, 1, 1),
        end_date: date(2025, 12, 31),
        book_ids: vec![BookId::new(1)],
    };

    c.bench_function("domain/compute_discount", |b| {
        b.iter(|| {
            let outcome = compute_discount(Some(&promo), Money::new(1_234_567));
            std::hint::black_box(outcome.final_amount);
        });
    });
}

criterion_group!(
    benches,
    bench_overlap_resolution,
    bench_conflict_intersection,
    bench_discount
);
criterion_main!(benches);
