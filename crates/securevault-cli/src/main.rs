//! `securevault` — a thin command-line driver over `securevault-vault`.
//!
//! Exposes a 1:1 subcommand per `VaultManager` operation (SPEC_FULL.md §6):
//! this binary owns no cryptographic logic of its own, only argument
//! parsing, secret prompting, and human-readable output. It exists to
//! exercise and confirm the library's operation surface is complete and
//! independently callable without a GUI.

mod config;

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use securevault_vault::{FsObjectStore, LockType, VaultError, VaultId, VaultManager};

#[derive(Parser, Debug)]
#[command(
    name = "securevault",
    about = "On-device encrypted file locker — command-line driver",
    long_about = "securevault drives the SecureVault cryptographic core from the command \
                  line: initialize a vault, unlock it with a PIN or password, import and \
                  export files, rotate credentials, and manage a plausible-deniability \
                  decoy identity. Secrets are always prompted interactively, never taken \
                  as a command-line argument."
)]
struct Cli {
    /// Path to the vault's private root directory. Overrides the config
    /// file's `root` and the built-in platform default.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path to a TOML config file. Defaults to the platform config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// KDF preset for this invocation (fast, balanced, maximum).
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether the vault has been initialized.
    Status,
    /// Create a new vault. Prompts for the real secret.
    Init {
        /// Treat the secret as a 6-digit PIN instead of a password.
        #[arg(long)]
        pin: bool,
    },
    /// Unlock the vault. Prompts for the secret; reports REAL or DECOY.
    Unlock,
    /// Lock the vault, zeroing the in-memory session.
    Lock,
    /// Encrypt a file from disk into the vault. Requires an unlocked session.
    Import {
        /// Path to the plaintext file to import.
        path: PathBuf,
        /// MIME type recorded in the item's metadata.
        #[arg(long, default_value = "application/octet-stream")]
        mime: String,
    },
    /// List items in the current identity's vault.
    List,
    /// Decrypt an item and write it to stdout.
    Export {
        /// 32-character hex item id, as printed by `list`.
        id: String,
    },
    /// Decrypt an item just long enough to report its size and a short
    /// printable preview, without writing any plaintext to disk.
    Preview {
        /// 32-character hex item id, as printed by `list`.
        id: String,
    },
    /// Remove an item from the vault.
    Delete {
        /// 32-character hex item id, as printed by `list`.
        id: String,
    },
    /// Change the vault's secret, re-encrypting every item. Prompts for
    /// both the current and the new secret.
    Rotate {
        /// Treat the new secret as a 6-digit PIN instead of a password.
        #[arg(long)]
        pin: bool,
    },
    /// Configure a plausible-deniability decoy identity under the same
    /// salt. Requires an unlocked REAL session. Prompts for the decoy secret.
    SetDecoy,
    /// Remove the decoy identity and sweep its unreferenced files.
    /// Requires an unlocked REAL session.
    RemoveDecoy,
    /// Irrecoverably wipe the vault. Prompts for the real secret to confirm.
    Reset,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().or_else(config::default_config_path);
    let vault_config = config::resolve(
        config_path.as_deref(),
        cli.root.clone(),
        cli.preset.as_deref(),
    )
    .map_err(CliError::Config)?;

    let store = FsObjectStore::open(&vault_config.root)?;
    let manager = VaultManager::open(vault_config, Box::new(store))?;

    match &cli.command {
        Command::Status => {
            println!("initialized: {}", manager.is_initialized());
            println!("state: {:?}", manager.state());
        }
        Command::Init { pin } => {
            let secret = prompt_secret("Create vault secret: ")?;
            let lock_type = if *pin { LockType::Pin } else { LockType::Password };
            manager.init(secret.as_bytes(), lock_type)?;
            println!("vault initialized");
        }
        Command::Unlock => {
            let secret = prompt_secret("Unlock secret: ")?;
            let identity = manager.unlock(secret.as_bytes())?;
            println!("unlocked as {identity:?}");
        }
        Command::Lock => {
            manager.lock();
            println!("locked");
        }
        Command::Import { path, mime } => {
            let bytes = std::fs::read(path).map_err(VaultError::Io)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unnamed")
                .to_string();
            let item = manager.import(&bytes, &name, mime)?;
            println!("imported {} ({} bytes) as {}", item.original_name, item.size, item.id);
        }
        Command::List => {
            for item in manager.list()? {
                println!(
                    "{}  {:>10}  {}  {}",
                    item.id, item.size, item.mime_type, item.original_name
                );
            }
        }
        Command::Export { id } => {
            let id = parse_id(id)?;
            let plaintext = manager.export(id)?;
            std::io::stdout()
                .write_all(&plaintext)
                .map_err(VaultError::Io)?;
        }
        Command::Preview { id } => {
            let id = parse_id(id)?;
            let handle = manager.preview(id)?;
            let snippet: String = String::from_utf8_lossy(handle.bytes())
                .chars()
                .take(120)
                .map(|c| if c.is_control() { '.' } else { c })
                .collect();
            println!("{} bytes", handle.bytes().len());
            println!("{snippet}");
        }
        Command::Delete { id } => {
            let id = parse_id(id)?;
            manager.delete(id)?;
            println!("deleted {id}");
        }
        Command::Rotate { pin } => {
            let old_secret = prompt_secret("Current secret: ")?;
            let new_secret = prompt_secret("New secret: ")?;
            let new_lock_type = if *pin { LockType::Pin } else { LockType::Password };
            manager.rotate(
                old_secret.as_bytes(),
                new_secret.as_bytes(),
                new_lock_type,
                Some(&|progress| {
                    eprint!("\rrotating: {}/{}", progress.done, progress.total);
                    let _ = std::io::stderr().flush();
                }),
                None,
            )?;
            eprintln!();
            println!("rotation complete, vault relocked under the new secret");
        }
        Command::SetDecoy => {
            let secret = prompt_secret("Decoy secret: ")?;
            manager.set_decoy(secret.as_bytes())?;
            println!("decoy identity configured");
        }
        Command::RemoveDecoy => {
            manager.remove_decoy()?;
            println!("decoy identity removed");
        }
        Command::Reset => {
            let secret = prompt_secret("Confirm real secret to wipe vault: ")?;
            manager.reset(secret.as_bytes())?;
            println!("vault wiped");
        }
    }

    Ok(())
}

fn parse_id(raw: &str) -> Result<VaultId, CliError> {
    raw.parse()
        .map_err(|_| CliError::Vault(VaultError::ConstraintViolated(format!("not a valid item id: {raw}"))))
}

/// Prompt for a secret without echoing it to the terminal. Falls back to a
/// plain stdin read when stdin is not a TTY (e.g. piped input in scripts).
fn prompt_secret(label: &str) -> Result<String, CliError> {
    if let Ok(secret) = rpassword::prompt_password(label) {
        return Ok(secret);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(VaultError::Io)?;
    Ok(buf.trim_end_matches(['\n', '\r']).to_string())
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Vault(#[from] VaultError),
    #[error("configuration error: {0}")]
    Config(String),
}
