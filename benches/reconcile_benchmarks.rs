//! Performance benchmarks for attendance reconciliation.
//!
//! - Pure batch reconciliation for 100 and 1000 employees
//! - The reconcile endpoint end to end over the in-memory store
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use axum::{body::Body, http::Request};
use chrono::{DateTime, NaiveDate, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tower::ServiceExt;

use attendance_engine::api::{AppState, create_router};
use attendance_engine::calculation::{BatchInputs, reconcile_batch};
use attendance_engine::config::EngineConfig;
use attendance_engine::engine::{AttendanceEngine, FixedTimeSource};
use attendance_engine::models::{Employee, PunchEvent};
use attendance_engine::store::MemoryStore;

const SHIFTS: [&str; 3] = ["MORNING", "EVENING", "NIGHT"];

fn business_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn local(config: &EngineConfig, day: u32, minutes: i64) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
    config.offset().instant_at_minute(date, minutes)
}

/// Creates `count` employees spread across the three default shifts.
fn create_employees(count: usize) -> Vec<Employee> {
    (0..count)
        .map(|i| Employee {
            emp_code: format!("E-{:04}", i),
            name: format!("Employee {}", i),
            department: "Operations".to_string(),
            designation: "Agent".to_string(),
            monthly_salary: Decimal::new(60000, 0),
            shift_id: None,
            shift_code: Some(SHIFTS[i % 3].to_string()),
        })
        .collect()
}

/// Two or three punches per employee, night shifts spilling into the next day.
fn create_punches(config: &EngineConfig, employees: &[Employee]) -> (Vec<PunchEvent>, Vec<PunchEvent>) {
    let mut window = Vec::new();
    let mut next_day = Vec::new();
    for (i, employee) in employees.iter().enumerate() {
        let jitter = (i % 30) as i64;
        match i % 3 {
            0 => {
                window.push(PunchEvent::valid(&employee.emp_code, local(config, 15, 540 + jitter)));
                window.push(PunchEvent::valid(&employee.emp_code, local(config, 15, 780)));
                window.push(PunchEvent::valid(&employee.emp_code, local(config, 15, 1080 - jitter)));
            }
            1 => {
                window.push(PunchEvent::valid(&employee.emp_code, local(config, 15, 840 + jitter)));
                window.push(PunchEvent::valid(&employee.emp_code, local(config, 15, 1380 - jitter)));
            }
            _ => {
                window.push(PunchEvent::valid(&employee.emp_code, local(config, 15, 1320 + jitter)));
                let checkout = PunchEvent::valid(&employee.emp_code, local(config, 16, 360 + jitter));
                window.push(checkout.clone());
                next_day.push(checkout);
            }
        }
    }
    (window, next_day)
}

/// Benchmark: pure batch reconciliation.
fn bench_reconcile_batch(c: &mut Criterion) {
    let config = EngineConfig::default();
    let now = local(&config, 20, 720);

    let mut group = c.benchmark_group("reconcile_batch");
    for count in [100usize, 1000] {
        let employees = create_employees(count);
        let (window_punches, next_day_punches) = create_punches(&config, &employees);
        let inputs = BatchInputs {
            window_punches,
            next_day_punches,
            ..BatchInputs::default()
        };

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &inputs, |b, inputs| {
            b.iter(|| {
                black_box(reconcile_batch(
                    business_date(),
                    &employees,
                    inputs,
                    &config,
                    now,
                ))
            })
        });
    }
    group.finish();
}

/// Benchmark: POST /attendance/reconcile for 500 employees.
fn bench_reconcile_endpoint(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = EngineConfig::default();
    let employees = create_employees(500);
    let (punches, _) = create_punches(&config, &employees);

    let store = Arc::new(MemoryStore::with_employees(employees));
    let engine = AttendanceEngine::new(
        config.clone(),
        store,
        Arc::new(FixedTimeSource::new(local(&config, 20, 720))),
    );
    for punch in punches {
        engine.record_punch(&punch.emp_code, punch.event_time).unwrap();
    }
    let router = create_router(AppState::new(engine));

    let mut group = c.benchmark_group("reconcile_endpoint");
    group.sample_size(20);
    group.bench_function("employees_500", |b| {
        b.to_async(&rt).iter(|| async {
            let response = router
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/attendance/reconcile")
                        .header("Content-Type", "application/json")
                        .body(Body::from(r#"{"date":"2026-01-15"}"#))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_reconcile_batch, bench_reconcile_endpoint);
criterion_main!(benches);
