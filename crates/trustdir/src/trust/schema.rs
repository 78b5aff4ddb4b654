//! Trusted-domain directory schema and MS-LSAD trust constants.

/// Object class marking trusted-domain entries.
pub const OBJECT_CLASS: &str = "sambaTrustedDomain";

pub const ATTR_OBJECT_CLASS: &str = "objectClass";
pub const ATTR_CN: &str = "cn";
pub const ATTR_SECURITY_IDENTIFIER: &str = "sambaSecurityIdentifier";
pub const ATTR_FLAT_NAME: &str = "sambaFlatName";
pub const ATTR_TRUST_PARTNER: &str = "sambaTrustPartner";
pub const ATTR_TRUST_TYPE: &str = "sambaTrustType";
pub const ATTR_TRUST_DIRECTION: &str = "sambaTrustDirection";
pub const ATTR_TRUST_ATTRIBUTES: &str = "sambaTrustAttributes";
pub const ATTR_TRUST_AUTH_INCOMING: &str = "sambaTrustAuthIncoming";
pub const ATTR_TRUST_AUTH_OUTGOING: &str = "sambaTrustAuthOutgoing";
pub const ATTR_FOREST_TRUST_INFO: &str = "sambaTrustForestTrustInfo";

/// `trust_direction` bits.
pub mod direction {
    pub const DISABLED: u32 = 0;
    pub const INBOUND: u32 = 0x1;
    pub const OUTBOUND: u32 = 0x2;
    pub const BIDIRECTIONAL: u32 = INBOUND | OUTBOUND;
}

/// `trust_type` values.
pub mod trust_type {
    /// Windows NT 4 style (NetBIOS only).
    pub const DOWNLEVEL: u32 = 1;
    /// Active Directory.
    pub const UPLEVEL: u32 = 2;
    /// Non-Windows Kerberos realm.
    pub const MIT: u32 = 3;
    pub const DCE: u32 = 4;
}

/// `trust_attributes` bits.
pub mod attributes {
    pub const NON_TRANSITIVE: u32 = 0x0000_0001;
    pub const UPLEVEL_ONLY: u32 = 0x0000_0002;
    pub const QUARANTINED_DOMAIN: u32 = 0x0000_0004;
    pub const FOREST_TRANSITIVE: u32 = 0x0000_0008;
    pub const CROSS_ORGANIZATION: u32 = 0x0000_0010;
    pub const WITHIN_FOREST: u32 = 0x0000_0020;
    pub const TREAT_AS_EXTERNAL: u32 = 0x0000_0040;
}
