//! Crate-level properties of the value runtime.

use proptest::prelude::*;

use crate::runtime::test_support::expect_panic;
use crate::runtime::{
    AllocPolicy, Checked, FloatOps, IntOps, ManagedPtr, PanicKind, Runtime, RuntimeConfig, Str,
    operator,
};

fn bump_runtime() -> Runtime {
    let mut config = RuntimeConfig::default();
    config.heap.policy = AllocPolicy::Bump;
    Runtime::with_config(config)
}

proptest! {
    #[test]
    fn hash_is_cached_and_never_zero(len in 0usize..256) {
        let rt = Runtime::new();
        let s = Str::alloc(&rt, len);
        let first = s.hash();
        prop_assert_eq!(first, s.hash());
        prop_assert_ne!(first, 0);
        prop_assert_ne!(first, -1);
    }

    #[test]
    fn add_concatenates_without_mutating(a in ".{0,40}", b in ".{0,40}") {
        let rt = bump_runtime();
        let (sa, sb) = (Str::new(&rt, &a), Str::new(&rt, &b));
        let joined = sa.add(&rt, sb);
        prop_assert_eq!(joined, Str::new(&rt, &format!("{a}{b}")));
        prop_assert_eq!(sa.to_str().unwrap(), a.as_str());
        prop_assert_eq!(sb.to_str().unwrap(), b.as_str());
    }

    #[test]
    fn mul_multiplies_length(a in "[a-z]{0,16}", n in 0i32..32) {
        let rt = Runtime::new();
        let s = Str::new(&rt, &a);
        let repeated = s.mul(&rt, n);
        prop_assert_eq!(repeated.len(), a.len() * n as usize);
        prop_assert_eq!(repeated.to_str().unwrap(), a.repeat(n as usize));
        prop_assert!(s.mul(&rt, 0).is_empty());
    }

    #[test]
    fn i32_decimal_roundtrip(x in any::<i32>()) {
        let rt = Runtime::new();
        let text = Str::from_i32(&rt, x);
        prop_assert_eq!(text.to_str().unwrap().parse::<i32>().unwrap(), x);
    }

    #[test]
    fn i8_decimal_roundtrip(x in any::<i8>()) {
        let rt = Runtime::new();
        let text = Str::from_i8(&rt, x);
        prop_assert_eq!(text.to_str().unwrap().parse::<i8>().unwrap(), x);
    }

    #[test]
    fn floordiv_mod_law(x in any::<i32>(), y in any::<i32>().prop_filter("non-zero", |y| *y != 0)) {
        let rt = Runtime::new();
        let q = x.floordiv(&rt, y);
        let r = x.modulo(&rt, y);
        prop_assert_eq!(q.wrapping_mul(y).wrapping_add(r), x);
        prop_assert!(r == 0 || (r < 0) == (y < 0));
        prop_assert!(r.unsigned_abs() < y.unsigned_abs());
    }

    #[test]
    fn float_mod_takes_divisor_sign(x in -1e6f64..1e6, y in -1e3f64..1e3) {
        prop_assume!(y != 0.0);
        let rt = Runtime::new();
        let r = x.modulo(&rt, y);
        prop_assert!(r == 0.0 || (r < 0.0) == (y < 0.0));
        prop_assert!(r.abs() <= y.abs());
    }

    #[test]
    fn checked_ptr_roundtrips_in_bounds(values in prop::collection::vec(any::<i32>(), 1..32)) {
        let rt = Runtime::new();
        let p = ManagedPtr::<i32, Checked>::alloc(&rt, values.len());
        for (i, v) in values.iter().enumerate() {
            unsafe { p.store(&rt, i as i32, *v) };
        }
        for (i, v) in values.iter().enumerate() {
            prop_assert_eq!(unsafe { p.load(&rt, i as i32) }, *v);
        }
    }
}

#[test]
fn division_by_zero_never_returns() {
    let int_ops: [fn(&Runtime); 3] = [
        |rt| {
            let _ = 5i32.truediv(rt, 0);
        },
        |rt| {
            let _ = 5i32.modulo(rt, 0);
        },
        |rt| {
            let _ = 5i32.floordiv(rt, 0);
        },
    ];
    for op in int_ops {
        assert_eq!(expect_panic(op).kind, PanicKind::ZeroDivisionError);
    }
    assert_eq!(
        expect_panic(|rt| 5.0f64.floordiv(rt, 0.0)).kind,
        PanicKind::ZeroDivisionError
    );
}

#[test]
fn saturating_conversion() {
    assert_eq!(operator::f64_to_i32(f64::NAN), 0);
    assert_eq!(operator::f64_to_i32(1e30), i32::MAX);
    assert_eq!(operator::f64_to_i32(-1e30), i32::MIN);
    assert_eq!(operator::f64_to_i32(3.7), 3);
}

#[test]
fn checked_ptr_one_past_end() {
    let record = expect_panic(|rt| {
        let p = ManagedPtr::<i32, Checked>::alloc(rt, 3);
        unsafe {
            for i in 0..3 {
                p.store(rt, i, i);
            }
            p.load(rt, 3)
        }
    });
    assert_eq!(record.kind, PanicKind::IndexError);
}

#[test]
fn replace_with_empty_needle() {
    let rt = Runtime::new();
    let out = Str::new(&rt, "ab").replace(&rt, Str::new(&rt, ""), Str::new(&rt, "X"));
    assert_eq!(out.to_str().unwrap(), "XaXbX");
    assert_eq!(out.len(), 5);
}

#[test]
fn get_item_negative_index() {
    let rt = Runtime::new();
    let s = Str::new(&rt, "hello");
    assert_eq!(s.get_item(&rt, -1).to_str().unwrap(), "o");

    let record = expect_panic(|rt| Str::new(rt, "hello").get_item(rt, -6));
    assert_eq!(record.kind, PanicKind::IndexError);
}

#[test]
fn heap_policies_are_interchangeable() {
    let leak = Runtime::new();
    let bump = bump_runtime();
    for rt in [&leak, &bump] {
        let s = Str::new(rt, "abc").mul(rt, 1000);
        let t = s.replace(rt, Str::new(rt, "b"), Str::new(rt, ""));
        assert_eq!(t.len(), 2000);
        assert_eq!(t.get_item(rt, -1).to_str().unwrap(), "c");
    }
    assert_eq!(leak.heap().name(), "leak");
    assert_eq!(bump.heap().name(), "bump");
}
