//! trustdir CLI: `trustdir` command.
//!
//! Inspects and edits trusted-domain records held in a JSON snapshot of a
//! directory, through the same backend a password database would use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use trustdir::backend::capabilities;
use trustdir::trust::schema::{attributes, direction, trust_type};
use trustdir::{
    AccountBackend, AccountRecord, BackendContext, BackendRegistry, DirectoryLayout, DomSid,
    MemoryDirectory, PassdbBackend, StoreError, TrustedDomain, IPA_BACKEND,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn trustdir_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| anyhow!("HOME not set; pass --directory"))?;
    Ok(PathBuf::from(home).join(".trustdir"))
}

fn default_snapshot_path() -> Result<PathBuf> {
    Ok(trustdir_home()?.join("directory.json"))
}

/// Load the snapshot, or start from an empty directory if it does not exist.
fn open_directory(path: &Path) -> Result<Arc<MemoryDirectory>> {
    if !path.exists() {
        log::debug!("snapshot {} not found, starting empty", path.display());
        return Ok(Arc::new(MemoryDirectory::new()));
    }
    let directory = MemoryDirectory::load_snapshot(path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;
    log::debug!(
        "loaded {} entries from {}",
        directory.len(),
        path.display()
    );
    Ok(Arc::new(directory))
}

fn save_directory(directory: &MemoryDirectory, path: &Path) -> Result<()> {
    directory
        .save_snapshot(path)
        .with_context(|| format!("failed to save snapshot {}", path.display()))
}

// ── Hex helpers ───────────────────────────────────────────────────────────────

fn parse_hex(field: &str, s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim()).map_err(|e| anyhow!("invalid hex for {field}: {e}"))
}

fn blob_hex(blob: &Option<Vec<u8>>) -> Option<String> {
    blob.as_ref().map(hex::encode)
}

// ── Flag name helpers ─────────────────────────────────────────────────────────

fn direction_name(d: u32) -> &'static str {
    match d {
        direction::DISABLED => "disabled",
        direction::INBOUND => "inbound",
        direction::OUTBOUND => "outbound",
        direction::BIDIRECTIONAL => "bidirectional",
        _ => "unknown",
    }
}

fn parse_direction(s: &str) -> Result<u32> {
    match s.to_ascii_lowercase().as_str() {
        "disabled" => Ok(direction::DISABLED),
        "inbound" => Ok(direction::INBOUND),
        "outbound" => Ok(direction::OUTBOUND),
        "bidirectional" | "both" => Ok(direction::BIDIRECTIONAL),
        other => other
            .parse()
            .map_err(|_| anyhow!("invalid trust direction: {s}")),
    }
}

fn trust_type_name(t: u32) -> &'static str {
    match t {
        trust_type::DOWNLEVEL => "downlevel",
        trust_type::UPLEVEL => "uplevel",
        trust_type::MIT => "mit",
        trust_type::DCE => "dce",
        _ => "unknown",
    }
}

fn parse_trust_type(s: &str) -> Result<u32> {
    match s.to_ascii_lowercase().as_str() {
        "downlevel" => Ok(trust_type::DOWNLEVEL),
        "uplevel" | "ad" => Ok(trust_type::UPLEVEL),
        "mit" => Ok(trust_type::MIT),
        "dce" => Ok(trust_type::DCE),
        other => other.parse().map_err(|_| anyhow!("invalid trust type: {s}")),
    }
}

fn attribute_names(bits: u32) -> Vec<&'static str> {
    const NAMES: [(u32, &str); 7] = [
        (attributes::NON_TRANSITIVE, "non_transitive"),
        (attributes::UPLEVEL_ONLY, "uplevel_only"),
        (attributes::QUARANTINED_DOMAIN, "quarantined_domain"),
        (attributes::FOREST_TRANSITIVE, "forest_transitive"),
        (attributes::CROSS_ORGANIZATION, "cross_organization"),
        (attributes::WITHIN_FOREST, "within_forest"),
        (attributes::TREAT_AS_EXTERNAL, "treat_as_external"),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

// ── Base account backend ──────────────────────────────────────────────────────

/// The CLI only edits trusts; account writes have no base backend behind them.
#[derive(Debug)]
struct ReadOnlyAccounts;

impl AccountBackend for ReadOnlyAccounts {
    fn add_account(&self, account: &AccountRecord) -> trustdir::Result<()> {
        Err(StoreError::Unsupported(format!(
            "account add for {}",
            account.username
        )))
    }

    fn update_account(&self, account: &AccountRecord) -> trustdir::Result<()> {
        Err(StoreError::Unsupported(format!(
            "account update for {}",
            account.username
        )))
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// trustdir CLI: inspect and edit cross-realm trust records.
#[derive(Parser, Debug)]
#[command(
    name = "trustdir",
    about = "trustdir CLI",
    version,
    long_about = "trustdir: trusted-domain records for IPA password databases\n\nReads and writes sambaTrustedDomain entries in a directory snapshot file."
)]
struct Cli {
    /// Directory snapshot file (default: ~/.trustdir/directory.json)
    #[arg(long, global = true)]
    directory: Option<PathBuf>,

    /// Directory layout file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Domain root DN, used when no layout file is given
    #[arg(long, global = true)]
    domain_dn: Option<String>,

    /// Kerberos realm, used when no layout file is given
    #[arg(long, global = true)]
    realm: Option<String>,

    /// Local domain SID, used when no layout file is given
    #[arg(long, global = true)]
    domain_sid: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage trusted domains
    Trust {
        #[command(subcommand)]
        subcommand: TrustCommands,
    },

    /// Show backend and local domain information
    Info,
}

#[derive(Subcommand, Debug)]
enum TrustCommands {
    /// List every trusted domain
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one trusted domain by NetBIOS name, DNS name or cn
    Show {
        key: String,
        #[arg(long)]
        json: bool,
    },

    /// Show the trusted domain with the given SID
    ShowSid {
        sid: String,
        #[arg(long)]
        json: bool,
    },

    /// Create or update a trusted domain (only the given fields are written)
    Set {
        key: String,
        #[command(flatten)]
        fields: TrustFields,
    },

    /// Delete a trusted domain
    Delete { key: String },

    /// List name and SID of every trusted domain
    Summaries {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct TrustFields {
    /// NetBIOS (flat) name
    #[arg(long)]
    netbios_name: Option<String>,

    /// DNS name of the partner domain
    #[arg(long)]
    domain_name: Option<String>,

    /// Partner domain SID (S-1-5-21-...)
    #[arg(long)]
    sid: Option<String>,

    /// inbound, outbound, bidirectional, disabled, or a number
    #[arg(long)]
    direction: Option<String>,

    /// downlevel, uplevel, mit, dce, or a number
    #[arg(long = "type")]
    trust_type: Option<String>,

    /// Trust attribute bits (decimal or 0x-prefixed hex)
    #[arg(long)]
    attributes: Option<String>,

    /// Incoming trust secret, hex
    #[arg(long)]
    auth_incoming: Option<String>,

    /// Outgoing trust secret, hex
    #[arg(long)]
    auth_outgoing: Option<String>,

    /// Forest trust information blob, hex
    #[arg(long)]
    forest_info: Option<String>,
}

impl TrustFields {
    fn into_record(self) -> Result<TrustedDomain> {
        let attributes = self
            .attributes
            .map(|s| {
                let s = s.trim();
                match s.strip_prefix("0x") {
                    Some(hex) => u32::from_str_radix(hex, 16),
                    None => s.parse(),
                }
                .map_err(|_| anyhow!("invalid trust attributes: {s}"))
            })
            .transpose()?;

        Ok(TrustedDomain {
            security_identifier: self.sid.as_deref().map(parse_sid).transpose()?,
            netbios_name: self.netbios_name,
            domain_name: self.domain_name,
            trust_direction: self.direction.as_deref().map(parse_direction).transpose()?,
            trust_type: self.trust_type.as_deref().map(parse_trust_type).transpose()?,
            trust_attributes: attributes,
            trust_auth_outgoing: self
                .auth_outgoing
                .as_deref()
                .map(|s| parse_hex("auth-outgoing", s))
                .transpose()?,
            trust_auth_incoming: self
                .auth_incoming
                .as_deref()
                .map(|s| parse_hex("auth-incoming", s))
                .transpose()?,
            forest_trust_info: self
                .forest_info
                .as_deref()
                .map(|s| parse_hex("forest-info", s))
                .transpose()?,
        })
    }
}

fn parse_sid(s: &str) -> Result<DomSid> {
    s.parse().map_err(|e| anyhow!("invalid SID '{s}': {e}"))
}

// ── Output view ───────────────────────────────────────────────────────────────

/// JSON shape of a trusted domain; blobs are hex.
#[derive(Debug, Serialize)]
struct TrustView {
    netbios_name: Option<String>,
    domain_name: Option<String>,
    security_identifier: Option<String>,
    trust_direction: Option<u32>,
    trust_type: Option<u32>,
    trust_attributes: Option<u32>,
    trust_auth_incoming: Option<String>,
    trust_auth_outgoing: Option<String>,
    forest_trust_info: Option<String>,
}

impl From<&TrustedDomain> for TrustView {
    fn from(td: &TrustedDomain) -> Self {
        Self {
            netbios_name: td.netbios_name.clone(),
            domain_name: td.domain_name.clone(),
            security_identifier: td.security_identifier.as_ref().map(DomSid::to_string),
            trust_direction: td.trust_direction,
            trust_type: td.trust_type,
            trust_attributes: td.trust_attributes,
            trust_auth_incoming: blob_hex(&td.trust_auth_incoming),
            trust_auth_outgoing: blob_hex(&td.trust_auth_outgoing),
            forest_trust_info: blob_hex(&td.forest_trust_info),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

fn print_trust(td: &TrustedDomain, verbose: bool) {
    let dash = || "-".to_string();
    println!(
        "Trusted domain: {}",
        td.netbios_name.clone().unwrap_or_else(dash)
    );
    println!(
        "  DNS name:   {}",
        td.domain_name.clone().unwrap_or_else(dash)
    );
    println!("  SID:        {}", td.sid_or_null());
    println!(
        "  Direction:  {} ({})",
        direction_name(td.trust_direction_or_zero()),
        td.trust_direction_or_zero()
    );
    println!(
        "  Type:       {} ({})",
        trust_type_name(td.trust_type_or_zero()),
        td.trust_type_or_zero()
    );
    let attrs = attribute_names(td.trust_attributes_or_zero());
    println!(
        "  Attributes: {:#x}{}",
        td.trust_attributes_or_zero(),
        if attrs.is_empty() {
            String::new()
        } else {
            format!(" ({})", attrs.join(", "))
        }
    );

    let secret = |b: &Option<Vec<u8>>| match b {
        Some(b) if verbose => hex::encode(b),
        Some(b) => format!("set ({} bytes)", b.len()),
        None => "not set".to_string(),
    };
    println!("  Incoming secret: {}", secret(&td.trust_auth_incoming));
    println!("  Outgoing secret: {}", secret(&td.trust_auth_outgoing));
    if let Some(info) = &td.forest_trust_info {
        println!("  Forest trust info: {} bytes", info.len());
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let snapshot = match &cli.directory {
        Some(path) => path.clone(),
        None => default_snapshot_path()?,
    };
    let layout = resolve_layout(&cli)?;
    let directory = open_directory(&snapshot)?;

    let registry = BackendRegistry::with_defaults();
    let backend = registry.create(
        IPA_BACKEND,
        BackendContext {
            directory: directory.clone(),
            layout,
            base: Arc::new(ReadOnlyAccounts),
        },
    )?;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Info => cmd_info(backend.as_ref(), &snapshot, &directory),
        Commands::Trust { subcommand } => match subcommand {
            TrustCommands::List { json } => cmd_trust_list(backend.as_ref(), json, verbose),
            TrustCommands::Show { key, json } => {
                cmd_trust_show(backend.as_ref(), &key, json, verbose)
            }
            TrustCommands::ShowSid { sid, json } => {
                cmd_trust_show_sid(backend.as_ref(), &sid, json, verbose)
            }
            TrustCommands::Set { key, fields } => {
                cmd_trust_set(backend.as_ref(), &key, fields)?;
                save_directory(&directory, &snapshot)
            }
            TrustCommands::Delete { key } => {
                cmd_trust_delete(backend.as_ref(), &key)?;
                save_directory(&directory, &snapshot)
            }
            TrustCommands::Summaries { json } => cmd_trust_summaries(backend.as_ref(), json),
        },
    }
}

/// Layout from `--config`, or from `--domain-dn` and `--realm`.
fn resolve_layout(cli: &Cli) -> Result<DirectoryLayout> {
    if let Some(path) = &cli.config {
        return DirectoryLayout::load(path)
            .with_context(|| format!("failed to load layout {}", path.display()));
    }
    let (Some(domain_dn), Some(realm)) = (&cli.domain_dn, &cli.realm) else {
        return Err(anyhow!(
            "no directory layout: pass --config, or --domain-dn and --realm"
        ));
    };
    let mut layout = DirectoryLayout::new(domain_dn.clone(), realm.clone());
    if let Some(sid) = &cli.domain_sid {
        layout = layout.with_domain_sid(parse_sid(sid)?);
    }
    Ok(layout)
}

// ── Command implementations ───────────────────────────────────────────────────

fn cmd_info(backend: &dyn PassdbBackend, snapshot: &Path, directory: &MemoryDirectory) -> Result<()> {
    println!("Backend:   {}", backend.name());
    let caps = [
        (capabilities::STORE_RIDS, "store_rids"),
        (capabilities::ADS, "ads"),
        (capabilities::TRUSTED_DOMAINS_EX, "trusted_domains_ex"),
    ];
    let names: Vec<&str> = caps
        .iter()
        .filter(|(flag, _)| backend.has_capability(*flag))
        .map(|(_, name)| *name)
        .collect();
    println!(
        "  Capabilities: {:#x} ({})",
        backend.capabilities(),
        names.join(", ")
    );

    match backend.domain_info() {
        Ok(info) => {
            println!("Domain:    {}", info.name);
            println!("  DNS domain: {}", info.dns_domain);
            println!("  DNS forest: {}", info.dns_forest);
            println!("  SID:        {}", info.sid);
        }
        Err(StoreError::Config(msg)) => println!("Domain:    ({msg})"),
        Err(e) => return Err(e.into()),
    }

    println!("Snapshot:  {}", snapshot.display());
    println!("  Entries: {}", directory.len());
    Ok(())
}

fn cmd_trust_list(backend: &dyn PassdbBackend, json: bool, verbose: bool) -> Result<()> {
    let domains = backend
        .enum_trusted_domains()
        .context("failed to enumerate trusted domains")?;

    if json {
        let views: Vec<TrustView> = domains.iter().map(TrustView::from).collect();
        return print_json(&views);
    }

    if domains.is_empty() {
        println!("No trusted domains");
        return Ok(());
    }

    println!(
        "{:<16} {:<28} {:<36} {:<14} TYPE",
        "NAME", "DNS NAME", "SID", "DIRECTION"
    );
    println!("{}", "-".repeat(104));
    for td in &domains {
        println!(
            "{:<16} {:<28} {:<36} {:<14} {}",
            td.netbios_name.as_deref().unwrap_or("-"),
            td.domain_name.as_deref().unwrap_or("-"),
            td.sid_or_null().to_string(),
            direction_name(td.trust_direction_or_zero()),
            trust_type_name(td.trust_type_or_zero()),
        );
    }
    if verbose {
        println!("\n{} trusted domain(s)", domains.len());
    }
    Ok(())
}

fn cmd_trust_show(backend: &dyn PassdbBackend, key: &str, json: bool, verbose: bool) -> Result<()> {
    let td = backend
        .get_trusted_domain(key)
        .with_context(|| format!("failed to look up trusted domain '{key}'"))?;
    if json {
        return print_json(&TrustView::from(&td));
    }
    print_trust(&td, verbose);
    Ok(())
}

fn cmd_trust_show_sid(
    backend: &dyn PassdbBackend,
    sid: &str,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let sid = parse_sid(sid)?;
    let td = backend
        .get_trusted_domain_by_sid(&sid)
        .with_context(|| format!("failed to look up trusted domain with SID {sid}"))?;
    if json {
        return print_json(&TrustView::from(&td));
    }
    print_trust(&td, verbose);
    Ok(())
}

fn cmd_trust_set(backend: &dyn PassdbBackend, key: &str, fields: TrustFields) -> Result<()> {
    let record = fields.into_record()?;
    if record.to_attributes().is_empty() {
        log::warn!("no fields given for '{key}'; only the entry itself is ensured");
    }
    backend
        .set_trusted_domain(key, &record)
        .with_context(|| format!("failed to store trusted domain '{key}'"))?;
    println!("Stored trusted domain '{key}'");
    Ok(())
}

fn cmd_trust_delete(backend: &dyn PassdbBackend, key: &str) -> Result<()> {
    backend
        .delete_trusted_domain(key)
        .with_context(|| format!("failed to delete trusted domain '{key}'"))?;
    println!("Deleted trusted domain '{key}'");
    Ok(())
}

fn cmd_trust_summaries(backend: &dyn PassdbBackend, json: bool) -> Result<()> {
    let summaries = backend
        .enum_trust_summaries()
        .context("failed to enumerate trusted domains")?;

    if json {
        return print_json(&summaries);
    }
    for summary in &summaries {
        println!(
            "{:<16} {}",
            summary.name.as_deref().unwrap_or("-"),
            summary.security_identifier
        );
    }
    Ok(())
}
