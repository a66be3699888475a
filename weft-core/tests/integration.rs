//! Integration Tests for the Reactive Engine
//!
//! These tests verify that cells, derived values, effects, and reactive
//! containers work together correctly across module boundaries.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use weft_core::reactive::{make_reactive, unwrap_reactive, Value};
use weft_core::signal::{scheduler, Computed, Effect, SignalSource, State};

/// The canonical chain: two cells feeding a derived sum.
#[test]
fn derived_sum_follows_its_cells() {
    let a = State::new(2);
    let b = State::new(3);

    let a_clone = a.clone();
    let b_clone = b.clone();
    let sum = Computed::new(move || a_clone.get() + b_clone.get());

    assert!(sum.dirty());
    assert_eq!(sum.value(), 5);
    assert!(!sum.dirty());

    a.set(5);
    assert!(sum.dirty());
    assert_eq!(sum.value(), 8);
}

/// A derived value depending on another derived value, transitively on
/// the cells underneath.
#[test]
fn derived_values_chain() {
    let base = State::new(5);

    let base_clone = base.clone();
    let doubled = Computed::new(move || base_clone.get() * 2);

    let doubled_clone = doubled.clone();
    let plus_ten = Computed::new(move || doubled_clone.value() + 10);

    assert_eq!(doubled.value(), 10);
    assert_eq!(plus_ten.value(), 20);

    base.set(10);
    assert!(doubled.dirty());
    assert!(plus_ten.dirty());
    assert_eq!(plus_ten.value(), 30);
    assert_eq!(doubled.value(), 20);
}

/// An effect observes a cell; a cell write reruns it when driven.
#[test]
fn effect_observes_cell_writes() {
    let cell = State::new(0);
    let observed = Arc::new(AtomicI32::new(-1));

    let cell_clone = cell.clone();
    let observed_clone = observed.clone();
    let effect = Effect::new(move || {
        observed_clone.store(cell_clone.get(), Ordering::SeqCst);
    });

    assert_eq!(observed.load(Ordering::SeqCst), 0);

    cell.set(42);
    assert!(effect.dirty());
    effect.reevaluate();
    assert_eq!(observed.load(Ordering::SeqCst), 42);
}

/// The auto-rerunning effect coalesces a burst of writes into one
/// deferred rerun.
#[test]
fn immediate_effect_coalesces_writes() {
    let first = State::new(1);
    let second = State::new(2);
    let runs = Arc::new(AtomicI32::new(0));
    let total = Arc::new(AtomicI32::new(0));

    let first_clone = first.clone();
    let second_clone = second.clone();
    let runs_clone = runs.clone();
    let total_clone = total.clone();
    let _effect = Effect::new_immediate(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        total_clone.store(first_clone.get() + second_clone.get(), Ordering::SeqCst);
    });

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(total.load(Ordering::SeqCst), 3);

    first.set(10);
    second.set(20);
    scheduler::drain();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(total.load(Ordering::SeqCst), 30);
}

/// Disposal severs the whole chain: no dirtying, no notifications.
#[test]
fn disposal_is_permanent() {
    let cell = State::new(1);

    let cell_clone = cell.clone();
    let doubled = Computed::new(move || cell_clone.get() * 2);
    assert_eq!(doubled.value(), 2);

    let notifications = Arc::new(AtomicI32::new(0));
    let notifications_clone = notifications.clone();
    doubled.changed().subscribe(move |_| {
        notifications_clone.fetch_add(1, Ordering::SeqCst);
    });

    doubled.dispose();
    cell.set(7);

    assert!(!doubled.dirty());
    assert_eq!(doubled.value(), 2);
    assert_eq!(notifications.load(Ordering::SeqCst), 0);
}

/// A derived value over a reactive container: per-key precision across
/// the module boundary.
#[test]
fn derived_value_over_reactive_map() {
    let proxy = make_reactive(Value::map([("a", Value::Int(1)), ("b", Value::Int(2))]));
    let map = proxy.as_reactive_map().unwrap();

    let map_a = map.clone();
    let double_a = Computed::new(move || map_a.get("a").unwrap().as_int().unwrap() * 2);
    let map_b = map.clone();
    let double_b = Computed::new(move || map_b.get("b").unwrap().as_int().unwrap() * 2);

    assert_eq!(double_a.value(), 2);
    assert_eq!(double_b.value(), 4);

    map.insert("a", Value::Int(3));
    assert!(double_a.dirty());
    assert!(!double_b.dirty());
    assert_eq!(double_a.value(), 6);
    assert_eq!(double_b.value(), 4);
}

/// The splice scenario end to end: a sum over a reactive list.
#[test]
fn derived_sum_over_reactive_list() {
    let proxy = make_reactive(Value::list((0..5).map(Value::Int)));
    let list = proxy.as_reactive_list().unwrap();

    let list_clone = list.clone();
    let sum = Computed::new(move || {
        list_clone
            .to_vec()
            .iter()
            .map(|value| value.as_int().unwrap())
            .sum::<i64>()
    });

    assert_eq!(sum.value(), 10);
    assert!(!sum.dirty());

    list.splice(1, 3, vec![Value::Int(-1)]);
    assert!(sum.dirty());
    assert_eq!(sum.value(), 3);
    assert_eq!(list.len(), 3);
}

/// An effect driven by a reactive container key.
#[test]
fn effect_over_reactive_map() {
    let proxy = make_reactive(Value::map([("count", Value::Int(0))]));
    let map = proxy.as_reactive_map().unwrap();
    let seen = Arc::new(AtomicI32::new(-1));

    let map_clone = map.clone();
    let seen_clone = seen.clone();
    let effect = Effect::new(move || {
        let count = map_clone.get("count").unwrap().as_int().unwrap();
        seen_clone.store(count as i32, Ordering::SeqCst);
    });

    assert_eq!(seen.load(Ordering::SeqCst), 0);

    map.insert("count", Value::Int(5));
    assert!(effect.dirty());
    effect.reevaluate();
    assert_eq!(seen.load(Ordering::SeqCst), 5);

    // A sibling key leaves the effect untouched.
    map.insert("other", Value::Int(9));
    assert!(!effect.dirty());
}

/// Unwrapping gives back the untracked container while cached values
/// stay valid.
#[test]
fn unwrapped_mutations_do_not_invalidate() {
    let proxy = make_reactive(Value::map([("a", Value::Int(1))]));
    let map = proxy.as_reactive_map().unwrap();

    let map_clone = map.clone();
    let double_a = Computed::new(move || map_clone.get("a").unwrap().as_int().unwrap() * 2);
    assert_eq!(double_a.value(), 2);

    let unwrapped = match unwrap_reactive(proxy) {
        Value::Map(target) => target,
        other => panic!("expected the plain map back, got {other:?}"),
    };
    unwrapped.write().insert("a".to_string(), Value::Int(100));

    assert!(!double_a.dirty());
    assert_eq!(double_a.value(), 2);
}
