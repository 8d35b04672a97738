//! Concurrent access to a shared type registry.

use pipeline_ir::{Error, PropertyKind, PropertySchema, TypeRegistry};
use std::sync::Arc;
use std::thread;

fn schema(kind: PropertyKind) -> PropertySchema {
    [("span".to_string(), kind)].into_iter().collect()
}

#[test]
fn registry_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TypeRegistry>();
}

#[test]
fn concurrent_identical_registrations_agree() {
    let registry = Arc::new(TypeRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.register("Examples", schema(PropertyKind::Int)))
        })
        .collect();

    let registered: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert_eq!(registry.len(), 1);
    for ty in &registered {
        assert!(Arc::ptr_eq(ty, &registered[0]));
    }
}

#[test]
fn concurrent_conflicting_registrations_keep_one_schema() {
    let registry = Arc::new(TypeRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let kind = if i % 2 == 0 {
                PropertyKind::Int
            } else {
                PropertyKind::String
            };
            thread::spawn(move || (kind, registry.register("Examples", schema(kind))))
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let winner = registry
        .lookup("Examples")
        .unwrap()
        .property_kind("span")
        .unwrap();

    for (kind, result) in results {
        if kind == winner {
            assert!(result.is_ok());
        } else {
            assert_eq!(result.unwrap_err(), Error::duplicate_type("Examples"));
        }
    }
}

#[test]
fn readers_see_registered_types() {
    let registry = Arc::new(TypeRegistry::new());
    for i in 0..16 {
        registry
            .register(&format!("Type{i}"), PropertySchema::new())
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..16).all(|i| registry.lookup(&format!("Type{i}")).is_ok())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
