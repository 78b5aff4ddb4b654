//! Concurrency test: parallel upserts and lookups against one store.
//!
//! Validates that the store is shareable across threads, that racing
//! creations of the same key surface as conflicts rather than duplicates,
//! and that readers never observe a partially written record.

use std::sync::{Arc, Barrier};
use std::thread;

use trustdir::{DomSid, MemoryDirectory, StoreError, TrustStore, TrustedDomain};

const DOMAIN_DN: &str = "dc=example,dc=com";

fn record(name: &str, rid: u32) -> TrustedDomain {
    TrustedDomain {
        netbios_name: Some(name.to_string()),
        security_identifier: Some(DomSid::new(1, 5, vec![21, 1, 2, rid]).unwrap()),
        trust_direction: Some(3),
        trust_type: Some(2),
        ..Default::default()
    }
}

#[test]
fn stress_50_threads_distinct_keys() {
    let directory = Arc::new(MemoryDirectory::new());
    let store = TrustStore::new(directory.clone(), DOMAIN_DN);

    let mut handles = Vec::new();
    for thread_id in 0..50u32 {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            for i in 0..20u32 {
                let name = format!("DOM{thread_id}X{i}");
                store
                    .upsert(&name, &record(&name, thread_id * 100 + i))
                    .expect("upsert of a fresh key should succeed");
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(directory.len(), 1_000);
    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 1_000);

    let sid = DomSid::new(1, 5, vec![21, 1, 2, 4_207]).unwrap();
    let td = store.get_by_sid(&sid).unwrap();
    assert_eq!(td.netbios_name.as_deref(), Some("DOM42X7"));
}

#[test]
fn stress_racing_creates_of_one_key() {
    for _round in 0..20 {
        let directory = Arc::new(MemoryDirectory::new());
        let store = TrustStore::new(directory.clone(), DOMAIN_DN);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.upsert("RACE", &record("RACE", t))
                })
            })
            .collect();

        let results: Vec<Result<(), StoreError>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.iter().any(Result::is_ok));
        for result in &results {
            if let Err(e) = result {
                assert!(e.is_conflict(), "only conflicts are expected, got {e}");
            }
        }
        assert_eq!(directory.len(), 1, "exactly one entry per key");
        assert!(store.get("RACE").is_ok());
    }
}

#[test]
fn stress_readers_during_updates() {
    let directory = Arc::new(MemoryDirectory::new());
    let store = TrustStore::new(directory, DOMAIN_DN);
    store.upsert("SHARED", &record("SHARED", 1)).unwrap();

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for rid in 2..500u32 {
                store.upsert("SHARED", &record("SHARED", rid)).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let td = store.get("SHARED").unwrap();
                    assert_eq!(td.trust_direction, Some(3));
                    assert_eq!(td.trust_type, Some(2));
                    assert!(td.security_identifier.is_some());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let final_sid = store.get("SHARED").unwrap().sid_or_null();
    assert_eq!(final_sid.rid(), Some(499));
}
