//! Integration test: account creation and password changes through the IPA
//! backend.
//!
//! The base backend here writes a minimal account entry, standing in for the
//! generic account store the IPA extensions are layered on.

use std::sync::{Arc, Mutex};

use trustdir::account::PASSWD_MODIFY_OID;
use trustdir::directory::ResultCode;
use trustdir::{
    dn, AccountBackend, AccountRecord, BackendContext, BackendRegistry, DirectoryClient,
    DirectoryLayout, Entry, MemoryDirectory, PassdbBackend, StoreError, IPA_BACKEND,
};

#[derive(Debug)]
struct MinimalAccounts {
    directory: Arc<MemoryDirectory>,
    layout: DirectoryLayout,
    updates: Mutex<Vec<String>>,
}

impl AccountBackend for MinimalAccounts {
    fn add_account(&self, account: &AccountRecord) -> trustdir::Result<()> {
        let dn = dn::account_dn(&self.layout, &account.username)?;
        let entry = Entry::new(&dn)
            .with("objectClass", "sambaSamAccount")
            .with("uid", &account.username);
        self.directory.add(&entry).map_err(|e| StoreError::StoreUnavailable {
            operation: "add",
            dn,
            source: e,
        })
    }

    fn update_account(&self, account: &AccountRecord) -> trustdir::Result<()> {
        self.updates.lock().unwrap().push(account.username.clone());
        Ok(())
    }
}

fn setup() -> (Arc<MemoryDirectory>, Arc<MinimalAccounts>, Arc<dyn PassdbBackend>) {
    let directory = Arc::new(MemoryDirectory::new());
    let layout = DirectoryLayout::new("dc=ipa,dc=example,dc=com", "IPA.EXAMPLE.COM");
    let base = Arc::new(MinimalAccounts {
        directory: directory.clone(),
        layout: layout.clone(),
        updates: Mutex::new(Vec::new()),
    });
    let sam = BackendRegistry::with_defaults()
        .create(
            IPA_BACKEND,
            BackendContext {
                directory: directory.clone(),
                layout,
                base: base.clone(),
            },
        )
        .expect("backend should build");
    (directory, base, sam)
}

#[test]
fn machine_account_is_augmented_and_keyed() {
    let (directory, _base, sam) = setup();
    let account = AccountRecord::new("ws01$")
        .with_domain("ws01.ipa.example.com")
        .with_new_password("machine-secret");

    sam.add_account(&account).unwrap();

    let dn = "uid=ws01$,cn=computers,cn=accounts,dc=ipa,dc=example,dc=com";
    let entry = directory.entry(dn).expect("base backend should create the entry");
    for class in ["sambaSamAccount", "krbPrincipal", "krbPrincipalAux", "ipaHost", "posixAccount"] {
        assert!(entry.has_value("objectClass", class), "missing {class}");
    }
    assert_eq!(entry.first("krbPrincipalName"), Some("ws01$@IPA.EXAMPLE.COM"));
    assert_eq!(entry.first("fqdn"), Some("ws01.ipa.example.com"));
    assert_eq!(entry.first("gidNumber"), Some("12345"));
    assert_eq!(entry.first("homeDirectory"), Some("/dev/null"));
    assert!(entry.has_value("uid", "ws01.ipa.example.com."));

    let requests = directory.extended_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].oid, PASSWD_MODIFY_OID);
    assert_eq!(requests[0].value[0], 0x30);
    let tail = &requests[0].value[requests[0].value.len() - 14..];
    assert_eq!(tail, b"machine-secret");
}

#[test]
fn update_changes_password_without_augmenting() {
    let (directory, base, sam) = setup();
    sam.update_account(&AccountRecord::new("alice").with_new_password("new-pw"))
        .unwrap();

    assert_eq!(*base.updates.lock().unwrap(), ["alice"]);
    let counts = directory.counts();
    assert_eq!(counts.modifies, 0);
    assert_eq!(counts.extended, 1);
}

#[test]
fn update_without_password_change_is_base_only() {
    let (directory, _base, sam) = setup();
    sam.update_account(&AccountRecord::new("alice")).unwrap();
    assert_eq!(directory.counts().total(), 0);
}

#[test]
fn duplicate_add_stops_before_augmentation() {
    let (directory, _base, sam) = setup();
    let account = AccountRecord::new("bob").with_domain("example.com");
    sam.add_account(&account).unwrap();
    directory.reset_counts();

    let err = sam.add_account(&account).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(directory.counts().modifies, 0);
}

#[test]
fn rejected_password_change_reports_account_dn() {
    let (directory, _base, sam) = setup();
    directory.fail_next(ResultCode::UNWILLING_TO_PERFORM, "password policy");

    let err = sam
        .update_account(&AccountRecord::new("carol").with_new_password("weak"))
        .unwrap_err();
    match err {
        StoreError::RotationFailed { dn, source } => {
            assert_eq!(dn, "uid=carol,cn=users,cn=accounts,dc=ipa,dc=example,dc=com");
            assert_eq!(source.code, ResultCode::UNWILLING_TO_PERFORM);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_password_is_rejected_without_directory_calls() {
    let (directory, _base, sam) = setup();
    let err = sam
        .update_account(&AccountRecord::new("alice").with_new_password(""))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    assert_eq!(directory.counts().total(), 0);
}
