//! Integration test: trusted-domain lifecycle through the IPA backend.
//!
//! Tests the complete lifecycle:
//! 1. Build the backend from the registry
//! 2. Create trusts by DNS name and by NetBIOS name
//! 3. Look them up by every alternate key and by SID
//! 4. Update a trust sparsely
//! 5. Enumerate full records and summaries
//! 6. Persist to a snapshot and reload
//! 7. Delete

use std::sync::Arc;

use trustdir::trust::schema::{attributes, direction, trust_type};
use trustdir::{
    AccountBackend, AccountRecord, BackendContext, BackendRegistry, DirectoryClient,
    DirectoryLayout, DomSid, Entry, Filter, MemoryDirectory, PassdbBackend, Scope, StoreError,
    TrustStore, TrustSummary, TrustedDomain, IPA_BACKEND,
};

const DOMAIN_DN: &str = "dc=ipa,dc=example,dc=com";

#[derive(Debug)]
struct NoAccounts;

impl AccountBackend for NoAccounts {
    fn add_account(&self, _: &AccountRecord) -> trustdir::Result<()> {
        Ok(())
    }
    fn update_account(&self, _: &AccountRecord) -> trustdir::Result<()> {
        Ok(())
    }
}

fn backend(directory: Arc<MemoryDirectory>) -> Arc<dyn PassdbBackend> {
    let layout = DirectoryLayout::new(DOMAIN_DN, "IPA.EXAMPLE.COM")
        .with_domain_sid("S-1-5-21-1000-2000-3000".parse().unwrap());
    BackendRegistry::with_defaults()
        .create(
            IPA_BACKEND,
            BackendContext {
                directory,
                layout,
                base: Arc::new(NoAccounts),
            },
        )
        .expect("backend should build")
}

fn ad_trust() -> TrustedDomain {
    TrustedDomain {
        security_identifier: Some("S-1-5-21-3623811015-3361044348-30300820".parse().unwrap()),
        netbios_name: Some("AD".into()),
        domain_name: Some("ad.example.org".into()),
        trust_direction: Some(direction::BIDIRECTIONAL),
        trust_type: Some(trust_type::UPLEVEL),
        trust_attributes: Some(attributes::FOREST_TRANSITIVE),
        trust_auth_incoming: Some(b"incoming-secret".to_vec()),
        trust_auth_outgoing: Some(b"outgoing-secret".to_vec()),
        forest_trust_info: None,
    }
}

#[test]
fn full_trust_lifecycle() {
    let directory = Arc::new(MemoryDirectory::new());
    let sam = backend(directory.clone());

    // ── Step 1: Empty directory ─────────────────────────────────────────
    assert!(sam.enum_trusted_domains().unwrap().is_empty());
    assert!(matches!(
        sam.get_trusted_domain("AD"),
        Err(StoreError::NotFound(_))
    ));

    // ── Step 2: Create trusts ───────────────────────────────────────────
    sam.set_trusted_domain("ad.example.org", &ad_trust()).unwrap();
    sam.set_trusted_domain(
        "EXAMPLE",
        &TrustedDomain {
            netbios_name: Some("EXAMPLE".into()),
            trust_direction: Some(3),
            ..Default::default()
        },
    )
    .unwrap();

    let entry = directory
        .entry(&format!("cn=ad.example.org,ou=system,{DOMAIN_DN}"))
        .expect("entry should be created under the trust container");
    assert!(entry.has_value("objectClass", "sambaTrustedDomain"));
    assert_eq!(entry.first("sambaTrustAttributes"), Some("8"));

    // ── Step 3: Lookups ─────────────────────────────────────────────────
    let expected = ad_trust();
    for key in ["AD", "ad.example.org", "AD.EXAMPLE.ORG"] {
        assert_eq!(sam.get_trusted_domain(key).unwrap(), expected, "key {key}");
    }
    let sid = expected.security_identifier.clone().unwrap();
    assert_eq!(sam.get_trusted_domain_by_sid(&sid).unwrap(), expected);

    let example = sam.get_trusted_domain("EXAMPLE").unwrap();
    assert!(example.sid_or_null().is_null());
    assert_eq!(example.trust_direction, Some(3));
    assert!(example.domain_name.is_none());

    // ── Step 4: Sparse update ───────────────────────────────────────────
    sam.set_trusted_domain(
        "AD",
        &TrustedDomain {
            trust_auth_outgoing: Some(b"rotated".to_vec()),
            ..Default::default()
        },
    )
    .unwrap();
    let updated = sam.get_trusted_domain("AD").unwrap();
    assert_eq!(updated.trust_auth_outgoing.as_deref(), Some(&b"rotated"[..]));
    assert_eq!(updated.trust_auth_incoming, expected.trust_auth_incoming);
    assert_eq!(updated.trust_type, Some(trust_type::UPLEVEL));
    assert_eq!(directory.len(), 2, "updates must not create entries");

    // ── Step 5: Enumeration ─────────────────────────────────────────────
    let all = sam.enum_trusted_domains().unwrap();
    assert_eq!(all.len(), 2);
    let summaries = sam.enum_trust_summaries().unwrap();
    assert!(summaries.contains(&TrustSummary {
        name: Some("EXAMPLE".into()),
        security_identifier: DomSid::null(),
    }));
    assert!(summaries.contains(&TrustSummary {
        name: Some("AD".into()),
        security_identifier: sid.clone(),
    }));

    // ── Step 6: Snapshot round trip ─────────────────────────────────────
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("directory.json");
    directory.save_snapshot(&path).unwrap();

    let reloaded = Arc::new(MemoryDirectory::load_snapshot(&path).unwrap());
    let sam2 = backend(reloaded);
    assert_eq!(sam2.get_trusted_domain("AD").unwrap(), updated);

    // ── Step 7: Delete ──────────────────────────────────────────────────
    sam.delete_trusted_domain("ad.example.org").unwrap();
    assert!(matches!(
        sam.get_trusted_domain_by_sid(&sid),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        sam.delete_trusted_domain("AD"),
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(sam.enum_trusted_domains().unwrap().len(), 1);
}

#[test]
fn example_scenario_without_sid() {
    let directory = Arc::new(MemoryDirectory::new());
    let store = TrustStore::new(directory.clone(), DOMAIN_DN);

    store
        .upsert(
            "EXAMPLE",
            &TrustedDomain {
                netbios_name: Some("EXAMPLE".into()),
                trust_direction: Some(3),
                ..Default::default()
            },
        )
        .unwrap();

    let td = store.get("EXAMPLE").unwrap();
    assert!(td.security_identifier.is_none());
    assert_eq!(td.trust_direction, Some(3));
    assert_eq!(
        store.list_summaries().unwrap(),
        vec![TrustSummary {
            name: Some("EXAMPLE".into()),
            security_identifier: DomSid::null(),
        }]
    );

    store.delete("EXAMPLE").unwrap();
    assert!(matches!(store.get("EXAMPLE"), Err(StoreError::NotFound(_))));
}

#[test]
fn hostile_keys_stay_inside_the_trust_container() {
    let directory = Arc::new(MemoryDirectory::new());
    let store = TrustStore::new(directory.clone(), DOMAIN_DN);

    // Filter metacharacters must not widen the search.
    store
        .upsert(
            "REAL",
            &TrustedDomain {
                netbios_name: Some("REAL".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(matches!(store.get("*"), Err(StoreError::NotFound(_))));
    assert!(matches!(
        store.get("REAL)(cn=*"),
        Err(StoreError::NotFound(_))
    ));

    // DN metacharacters must not escape the container.
    store
        .upsert(
            "evil,ou=admins",
            &TrustedDomain {
                netbios_name: Some("EVIL".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let entries = directory
        .search(
            &format!("ou=system,{DOMAIN_DN}"),
            Scope::OneLevel,
            &Filter::present("objectClass"),
        )
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(store.get("evil,ou=admins").unwrap().netbios_name.as_deref(), Some("EVIL"));
}

#[test]
fn malformed_entry_poisons_enumeration_only() {
    let directory = Arc::new(MemoryDirectory::with_entries([Entry::new(format!(
        "cn=BROKEN,ou=system,{DOMAIN_DN}"
    ))
    .with("objectClass", "sambaTrustedDomain")
    .with("cn", "BROKEN")
    .with("sambaTrustType", "-1")]));
    let sam = backend(directory);

    sam.set_trusted_domain(
        "GOOD",
        &TrustedDomain {
            netbios_name: Some("GOOD".into()),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(sam.get_trusted_domain("GOOD").is_ok());
    assert!(matches!(
        sam.get_trusted_domain("BROKEN"),
        Err(StoreError::DecodeError(_))
    ));
    assert!(matches!(
        sam.enum_trusted_domains(),
        Err(StoreError::DecodeError(_))
    ));
}
