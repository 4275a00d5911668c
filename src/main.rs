use anyhow::Result;
use clap::Parser;
use pkgdep::commands::{
    self, Context,
    combine::CombineOptions,
    config::ConfigUpdate,
    deploy::{DeployMode, DeployOptions},
    print::PrintOptions,
    repositories, services,
};
use pkgdep::config::ListingMode;
use pkgdep::process::RealProcessRunner;
use std::path::PathBuf;

/// pkgdep - multi-repository package deployer
///
/// Clones and syncs your GitHub repositories, orders their npm packages by
/// dependency, and publishes what changed to a private registry.
///
/// Examples:
///   pkgdep print --build-order      # Show the order packages build in
///   pkgdep deploy --incremental     # Publish changed packages and dependents
///   pkgdep sync                     # Pull/push repositories, then deploy
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGDEP_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// App folder (overrides the saved location; also via PKGDEP_APP_PATH)
    #[arg(
        long = "app-path",
        env = "PKGDEP_APP_PATH",
        value_name = "PATH",
        global = true
    )]
    pub app_path: Option<PathBuf>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show or change the deployer configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print packages, build order, repositories and more
    Print(PrintArgs),

    /// Install, build and publish packages in dependency order
    Deploy(DeployArgs),

    /// Manage the repositories under the packages path
    #[command(subcommand)]
    Repositories(RepositoriesCommands),

    /// Refresh repositories, pull or push them, then deploy what changed
    Sync,

    /// Switch npm packages to pnpm
    Switch,

    /// Undo an uncommitted switch by discarding changes in pnpm packages
    RevertSwitch,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigCommands {
    /// Print the configuration
    Show,

    /// Set configuration values
    Set(SetArgs),
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    #[arg(long, value_name = "PATH")]
    pub packages_path: Option<PathBuf>,

    #[arg(long, value_name = "TOKEN")]
    pub github_token: Option<String>,

    #[arg(long, value_name = "URL")]
    pub github_user_link: Option<String>,

    #[arg(long, value_name = "URL")]
    pub registry_url: Option<String>,

    #[arg(long, value_name = "NAME")]
    pub registry_username: Option<String>,

    #[arg(long, value_name = "PASSWORD")]
    pub registry_password: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    #[arg(long)]
    pub packages: bool,

    #[arg(long)]
    pub build_order: bool,

    #[arg(long)]
    pub configuration: bool,

    #[arg(long)]
    pub user_repositories: bool,

    #[arg(long)]
    pub remote_packages: bool,

    #[arg(long)]
    pub incremental_build_packages: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeployArgs {
    /// Deploy every package, ignoring the repository listing
    #[arg(long, conflicts_with = "incremental")]
    pub all: bool,

    /// Deploy only changed packages and their dependents
    #[arg(long)]
    pub incremental: bool,

    /// Skip private packages
    #[arg(long)]
    pub ignore_apps: bool,

    /// Compare against the registry instead of the local ledger
    #[arg(long, requires = "incremental")]
    pub use_remote: bool,
}

#[derive(clap::Subcommand, Debug)]
enum RepositoriesCommands {
    /// Choose which list is active
    Select {
        #[arg(value_name = "whitelist|blacklist")]
        mode: ListingMode,
    },

    /// Edit the whitelist
    #[command(subcommand)]
    Whitelist(ListCommands),

    /// Edit the blacklist
    #[command(subcommand)]
    Blacklist(ListCommands),

    /// Delete local repositories that are on the blacklist
    DeleteBlacklisted,

    /// Clone repositories that are missing locally
    Clone {
        /// Only clone whitelisted repositories
        #[arg(long)]
        use_whitelist: bool,
    },

    /// Pull every local repository
    Pull,

    /// Push every local repository
    Push,

    /// Push or pull repositories by their last commit date
    Update {
        /// Refresh the repository list from GitHub first
        #[arg(long)]
        sync_info: bool,
    },

    /// Copy every package into a single monorepo
    Combine {
        /// Packages to combine (defaults to the configured packages path)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Where the monorepo is created (defaults to <app>/monorepo)
        #[arg(long, value_name = "PATH")]
        monorepo_path: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ListCommands {
    /// Add repository names
    Add {
        #[arg(required = true, value_delimiter = ',')]
        names: Vec<String>,
    },
}

impl From<SetArgs> for ConfigUpdate {
    fn from(args: SetArgs) -> Self {
        ConfigUpdate {
            packages_path: args.packages_path,
            github_token: args.github_token,
            github_user_link: args.github_user_link,
            registry_url: args.registry_url,
            registry_username: args.registry_username,
            registry_password: args.registry_password,
            app_path: None,
        }
    }
}

impl From<&DeployArgs> for DeployOptions {
    fn from(args: &DeployArgs) -> Self {
        let mode = if args.all {
            DeployMode::All
        } else if args.incremental {
            DeployMode::Incremental
        } else {
            DeployMode::Filtered
        };
        DeployOptions {
            mode,
            ignore_apps: args.ignore_apps,
            use_remote: args.use_remote,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let runtime = pkgdep::runtime::RealRuntime;
    let mut ctx = Context::load(runtime, cli.app_path.clone())?;
    let api_url = cli.api_url.as_deref();

    match cli.command {
        Commands::Config(ConfigCommands::Show) => commands::config::show(&ctx)?,
        Commands::Config(ConfigCommands::Set(args)) => {
            // `config set --app-path` records the global flag as the new default
            let update = ConfigUpdate {
                app_path: cli.app_path,
                ..ConfigUpdate::from(args)
            };
            commands::config::set(&mut ctx, update)?
        }
        Commands::Print(args) => {
            let options = PrintOptions {
                configuration: args.configuration,
                packages: args.packages,
                build_order: args.build_order,
                incremental_build_packages: args.incremental_build_packages,
                remote_packages: args.remote_packages,
                user_repositories: args.user_repositories,
            };
            let registry = if options.remote_packages {
                Some(services::build_registry(&ctx.config)?)
            } else {
                None
            };
            let source = if options.user_repositories {
                Some(services::build_provider(&ctx.config, api_url)?)
            } else {
                None
            };
            commands::print::print(&ctx, options, registry.as_ref(), source.as_ref()).await?
        }
        Commands::Deploy(args) => {
            let options = DeployOptions::from(&args);
            let registry = if options.mode == DeployMode::Incremental && options.use_remote {
                Some(services::build_registry(&ctx.config)?)
            } else {
                None
            };
            commands::deploy::deploy(&ctx, &RealProcessRunner, registry.as_ref(), options).await?;
        }
        Commands::Repositories(command) => {
            run_repositories(&mut ctx, command, api_url).await?
        }
        Commands::Sync => {
            let source = services::build_provider(&ctx.config, api_url)?;
            commands::sync(&ctx, &services::build_git(), &source, &RealProcessRunner).await?;
        }
        Commands::Switch => commands::switch(&ctx, &RealProcessRunner).await?,
        Commands::RevertSwitch => commands::revert_switch(&ctx, &services::build_git()).await?,
    }
    Ok(())
}

async fn run_repositories(
    ctx: &mut Context<pkgdep::runtime::RealRuntime>,
    command: RepositoriesCommands,
    api_url: Option<&str>,
) -> Result<()> {
    let git = services::build_git();
    match command {
        RepositoriesCommands::Select { mode } => repositories::select(ctx, mode),
        RepositoriesCommands::Whitelist(ListCommands::Add { names }) => {
            repositories::whitelist_add(ctx, &names)
        }
        RepositoriesCommands::Blacklist(ListCommands::Add { names }) => {
            repositories::blacklist_add(ctx, &names)
        }
        RepositoriesCommands::DeleteBlacklisted => repositories::delete_blacklisted(ctx),
        RepositoriesCommands::Clone { use_whitelist } => {
            let source = services::build_provider(&ctx.config, api_url)?;
            repositories::clone(ctx, &git, &source, use_whitelist).await
        }
        RepositoriesCommands::Pull => repositories::pull(ctx, &git).await,
        RepositoriesCommands::Push => repositories::push(ctx, &git).await,
        RepositoriesCommands::Update { sync_info } => {
            let source = services::build_provider(&ctx.config, api_url)?;
            repositories::update(ctx, &git, &source, sync_info).await
        }
        RepositoriesCommands::Combine {
            path,
            monorepo_path,
        } => {
            let options = CombineOptions {
                packages_path: path,
                monorepo_path,
            };
            commands::combine::combine(ctx, options).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_deploy_parsing() {
        let cli = Cli::try_parse_from(["pkgdep", "deploy", "--incremental", "--use-remote"]).unwrap();
        match cli.command {
            Commands::Deploy(args) => {
                let options = DeployOptions::from(&args);
                assert_eq!(options.mode, DeployMode::Incremental);
                assert!(options.use_remote);
                assert!(!options.ignore_apps);
            }
            _ => panic!("Expected Deploy command"),
        }
        assert_eq!(cli.app_path, None);
    }

    #[test]
    fn test_cli_deploy_defaults_to_filtered() {
        let cli = Cli::try_parse_from(["pkgdep", "deploy", "--ignore-apps"]).unwrap();
        match cli.command {
            Commands::Deploy(args) => {
                let options = DeployOptions::from(&args);
                assert_eq!(options.mode, DeployMode::Filtered);
                assert!(options.ignore_apps);
            }
            _ => panic!("Expected Deploy command"),
        }
    }

    #[test]
    fn test_cli_deploy_all_conflicts_with_incremental() {
        assert!(Cli::try_parse_from(["pkgdep", "deploy", "--all", "--incremental"]).is_err());
        assert!(Cli::try_parse_from(["pkgdep", "deploy", "--use-remote"]).is_err());
    }

    #[test]
    fn test_cli_global_app_path_parsing() {
        let cli = Cli::try_parse_from(["pkgdep", "--app-path", "/tmp/app", "sync"]).unwrap();
        assert_eq!(cli.app_path, Some(PathBuf::from("/tmp/app")));

        let cli = Cli::try_parse_from(["pkgdep", "switch", "--app-path", "/tmp/app"]).unwrap();
        assert_eq!(cli.app_path, Some(PathBuf::from("/tmp/app")));
    }

    #[test]
    fn test_cli_repositories_select() {
        let cli = Cli::try_parse_from(["pkgdep", "repositories", "select", "blacklist"]).unwrap();
        match cli.command {
            Commands::Repositories(RepositoriesCommands::Select { mode }) => {
                assert_eq!(mode, ListingMode::Blacklist)
            }
            _ => panic!("Expected repositories select"),
        }
        assert!(Cli::try_parse_from(["pkgdep", "repositories", "select", "greylist"]).is_err());
    }

    #[test]
    fn test_cli_whitelist_add_splits_commas() {
        let cli =
            Cli::try_parse_from(["pkgdep", "repositories", "whitelist", "add", "core,lib", "app"])
                .unwrap();
        match cli.command {
            Commands::Repositories(RepositoriesCommands::Whitelist(ListCommands::Add { names })) => {
                assert_eq!(names, vec!["core", "lib", "app"])
            }
            _ => panic!("Expected repositories whitelist add"),
        }
    }

    #[test]
    fn test_cli_config_set_parsing() {
        let cli = Cli::try_parse_from([
            "pkgdep",
            "config",
            "set",
            "--registry-username",
            "admin",
            "--packages-path",
            "/work/repos",
            "--app-path",
            "/data/app",
        ])
        .unwrap();
        match cli.command {
            Commands::Config(ConfigCommands::Set(args)) => {
                let update = ConfigUpdate::from(args);
                assert_eq!(update.registry_username.as_deref(), Some("admin"));
                assert_eq!(update.packages_path, Some(PathBuf::from("/work/repos")));
                assert_eq!(update.app_path, None);
            }
            _ => panic!("Expected config set"),
        }
        assert_eq!(cli.app_path, Some(PathBuf::from("/data/app")));
    }

    #[test]
    fn test_cli_repositories_combine() {
        let cli = Cli::try_parse_from([
            "pkgdep",
            "repositories",
            "combine",
            "--monorepo-path",
            "/work/mono",
        ])
        .unwrap();
        match cli.command {
            Commands::Repositories(RepositoriesCommands::Combine {
                path,
                monorepo_path,
            }) => {
                assert_eq!(path, None);
                assert_eq!(monorepo_path, Some(PathBuf::from("/work/mono")));
            }
            _ => panic!("Expected repositories combine"),
        }
    }

    #[test]
    fn test_cli_revert_switch() {
        let cli = Cli::try_parse_from(["pkgdep", "revert-switch"]).unwrap();
        assert!(matches!(cli.command, Commands::RevertSwitch));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["pkgdep"]).is_err());
    }
}
