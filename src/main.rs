use anyhow::Result;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::runtime::Runtime;

use annals::auth;
use annals::config::{Config, DEFAULT_LOG_FILTER};
use annals::models::{Capabilities, Newsgroup};
use annals::server;
use annals::storage;

#[derive(Parser)]
struct Args {
    /// Path to the configuration file
    #[arg(long, env = "ANNALS_CONFIG", default_value = "/etc/annals.toml")]
    config: String,
    /// Initialize databases and exit
    #[arg(long)]
    init: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Administrative actions
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(ClapArgs)]
struct CapabilityFlags {
    #[arg(long)]
    can_approve_any: bool,
    #[arg(long)]
    can_cancel: bool,
    #[arg(long)]
    can_inject: bool,
    #[arg(long)]
    can_create_group: bool,
    #[arg(long)]
    can_delete_group: bool,
    #[arg(long)]
    can_check_groups: bool,
    /// Restrict the account to loopback connections
    #[arg(long)]
    local_only: bool,
}

impl From<&CapabilityFlags> for Capabilities {
    fn from(flags: &CapabilityFlags) -> Self {
        Capabilities {
            can_approve_any: flags.can_approve_any,
            can_cancel: flags.can_cancel,
            can_inject: flags.can_inject,
            can_create_group: flags.can_create_group,
            can_delete_group: flags.can_delete_group,
            can_check_groups: flags.can_check_groups,
            local_only: flags.local_only,
        }
    }
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Create a newsgroup
    AddGroup {
        group: String,
        #[arg(long)]
        moderated: bool,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        creator: String,
    },
    /// Remove a newsgroup
    RemoveGroup { group: String },
    /// Set moderation status for a group
    SetModerated { group: String, moderated: String },
    /// Add an administrator account
    AddUser {
        user: String,
        pass: String,
        #[command(flatten)]
        caps: CapabilityFlags,
    },
    /// Update an account password
    UpdatePassword { user: String, new_pass: String },
    /// Remove an account
    RemoveUser { user: String },
    /// Replace an account's capability flags
    SetCapabilities {
        user: String,
        #[command(flatten)]
        caps: CapabilityFlags,
    },
    /// Assign a moderator to a group
    AddModerator { user: String, group: String },
    /// Remove a moderator from a group
    RemoveModerator { user: String, group: String },
    /// List administrator accounts
    ListUsers,
}

async fn run_admin(cmd: AdminCommand, cfg: &Config) -> Result<()> {
    let store = storage::open(&cfg.db_path).await?;
    let directory = auth::open(&cfg.auth_db_path).await?;
    match cmd {
        AdminCommand::AddGroup {
            group,
            moderated,
            description,
            creator,
        } => {
            store
                .create_group(&Newsgroup::new(&group, &description, &creator, moderated))
                .await?;
        }
        AdminCommand::RemoveGroup { group } => {
            store.remove_group(&group).await?;
        }
        AdminCommand::SetModerated { group, moderated } => {
            let is_moderated = match moderated.to_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid boolean value: '{moderated}'. Use 'true' or 'false'."
                    ));
                }
            };
            store.set_group_moderated(&group, is_moderated).await?;
        }
        AdminCommand::AddUser { user, pass, caps } => {
            let caps = Capabilities::from(&caps);
            directory.add_user(&user, &pass, &caps).await?;
        }
        AdminCommand::UpdatePassword { user, new_pass } => {
            directory.update_password(&user, &new_pass).await?;
        }
        AdminCommand::RemoveUser { user } => {
            directory.remove_user(&user).await?;
        }
        AdminCommand::SetCapabilities { user, caps } => {
            let caps = Capabilities::from(&caps);
            directory.set_capabilities(&user, &caps).await?;
        }
        AdminCommand::AddModerator { user, group } => {
            directory.add_moderator(&user, &group).await?;
        }
        AdminCommand::RemoveModerator { user, group } => {
            directory.remove_moderator(&user, &group).await?;
        }
        AdminCommand::ListUsers => {
            for admin in directory.list_administrators().await? {
                println!("{} {:?}", admin.username, admin.caps);
            }
        }
    }
    Ok(())
}

async fn run_init(cfg: &Config) -> Result<()> {
    storage::open(&cfg.db_path).await?;
    auth::open(&cfg.auth_db_path).await?;
    Ok(())
}

fn init_tracing(cfg: &Config) {
    use tracing_subscriber::EnvFilter;
    let filter = cfg
        .log_level
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
        });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg_path = args.config.clone();

    let cfg_initial = match Config::from_file(&cfg_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&cfg_initial);

    let runtime_threads = match cfg_initial.get_runtime_threads() {
        Ok(threads) => threads,
        Err(e) => {
            eprintln!("Error determining runtime threads: {e}");
            std::process::exit(1);
        }
    };

    let runtime = if runtime_threads == 1 {
        Runtime::new()?
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(runtime_threads)
            .enable_all()
            .build()?
    };

    runtime.block_on(async {
        if args.init {
            if let Err(e) = run_init(&cfg_initial).await {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            return Ok(());
        }

        if let Some(Command::Admin(cmd)) = args.command {
            if let Err(e) = run_admin(cmd, &cfg_initial).await {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            return Ok(());
        }

        if let Err(e) = server::run(cfg_initial, cfg_path).await {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }

        Ok(())
    })
}
