// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! modelplug - administer model provider plugins.
//!
//! Binary entry point. Every subcommand builds a [`PluginRuntime`] from the
//! layered configuration and runs one administrative operation against it.
//! Enabled plugins are only re-activated with `--restore`, since a restore
//! marks plugins that fail to load as `FAILED`.

mod plugins;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use modelplug_config::ModelplugConfig;
use modelplug_core::RuntimeError;
use modelplug_runtime::PluginRuntime;

/// modelplug - administer model provider plugins.
#[derive(Parser, Debug)]
#[command(name = "modelplug", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors.
    #[arg(long, global = true)]
    plain: bool,

    /// Re-activate enabled plugins before running the command.
    #[arg(long, global = true)]
    restore: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List installed plugins.
    List {
        /// Only enabled plugins.
        #[arg(long)]
        enabled: bool,
    },
    /// Show one plugin record.
    Get { plugin_id: String },
    /// Install a plugin bundle.
    #[command(group(
        ArgGroup::new("source")
            .required(true)
            .args(["path", "file", "url", "marketplace"])
    ))]
    Install {
        /// Bundle directory or archive used in place.
        #[arg(long)]
        path: Option<PathBuf>,
        /// Archive copied into the plugins directory, as an upload would be.
        #[arg(long)]
        file: Option<PathBuf>,
        /// HTTP(S) URL of a bundle archive.
        #[arg(long)]
        url: Option<String>,
        /// Expected SHA-256 of the downloaded archive, in hex.
        #[arg(long, requires = "url")]
        sha256: Option<String>,
        /// Marketplace reference.
        #[arg(long)]
        marketplace: Option<String>,
        /// Replace an installed plugin with the same id.
        #[arg(long)]
        replace: bool,
    },
    /// Uninstall a plugin.
    Uninstall { plugin_id: String },
    /// Enable a plugin.
    Enable { plugin_id: String },
    /// Disable a plugin.
    Disable { plugin_id: String },
    /// Show the status of a plugin.
    Status { plugin_id: String },
    /// Show counts across installed plugins.
    Stats,
    /// Write a plugin's icon to a file.
    Icon {
        plugin_id: String,
        /// Output file; defaults to `<plugin_id>-icon.<ext>`.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the access path of a plugin's icon.
    IconPath { plugin_id: String },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => modelplug_config::load_and_validate_path(path),
        None => modelplug_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            modelplug_config::render_errors(&errors);
            std::process::exit(2);
        }
    };
    init_tracing(&config.runtime.log_level);

    if let Err(err) = run(cli, config).await {
        match err.downcast_ref::<RuntimeError>() {
            Some(runtime_err) => eprintln!("error [{}]: {err:#}", runtime_err.kind()),
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ModelplugConfig) -> anyhow::Result<()> {
    let output = plugins::Output::new(cli.json, cli.plain);

    if let Commands::Config = cli.command {
        return plugins::show_config(&config);
    }

    let runtime = if cli.restore {
        let (runtime, report) = PluginRuntime::start(config).await?;
        if !report.failed.is_empty() {
            tracing::warn!(failed = ?report.failed, "some enabled plugins failed to restore");
        }
        runtime
    } else {
        PluginRuntime::new(config).await?
    };
    let admin = runtime.admin();

    let result = match cli.command {
        Commands::List { enabled } => plugins::list(&admin, &output, enabled).await,
        Commands::Get { plugin_id } => plugins::get(&admin, &output, &plugin_id).await,
        Commands::Install {
            path,
            file,
            url,
            sha256,
            marketplace,
            replace,
        } => {
            let source = plugins::SourceArg::from_flags(path, file, url, sha256, marketplace)?;
            plugins::install(&admin, &output, source, replace).await
        }
        Commands::Uninstall { plugin_id } => plugins::uninstall(&admin, &output, &plugin_id).await,
        Commands::Enable { plugin_id } => plugins::enable(&admin, &output, &plugin_id).await,
        Commands::Disable { plugin_id } => plugins::disable(&admin, &output, &plugin_id).await,
        Commands::Status { plugin_id } => plugins::status(&admin, &output, &plugin_id).await,
        Commands::Stats => plugins::stats(&admin, &output).await,
        Commands::Icon { plugin_id, output: path } => {
            plugins::icon(&admin, &output, &plugin_id, path).await
        }
        Commands::IconPath { plugin_id } => plugins::icon_path(&admin, &output, &plugin_id).await,
        Commands::Config => Ok(()),
    };

    runtime.shutdown().await;
    result
}

/// `RUST_LOG` wins over `runtime.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("modelplug={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["modelplug", "install"]).is_err());
        assert!(
            Cli::try_parse_from(["modelplug", "install", "--path", "a", "--url", "http://x/a.zip"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["modelplug", "install", "--file", "a.zip", "--replace"]).unwrap();
        assert!(matches!(cli.command, Commands::Install { replace: true, .. }));
    }

    #[test]
    fn sha256_only_with_url() {
        assert!(
            Cli::try_parse_from(["modelplug", "install", "--path", "a", "--sha256", "00"]).is_err()
        );
        assert!(
            Cli::try_parse_from([
                "modelplug",
                "install",
                "--url",
                "https://plugins.example.com/a.zip",
                "--sha256",
                "00"
            ])
            .is_ok()
        );
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["modelplug", "stats", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn restore_is_opt_in() {
        let cli = Cli::try_parse_from(["modelplug", "list"]).unwrap();
        assert!(!cli.restore);
        let cli = Cli::try_parse_from(["modelplug", "list", "--restore"]).unwrap();
        assert!(cli.restore);
    }

    #[tokio::test]
    async fn read_only_commands_leave_unloadable_plugins_alone() {
        use modelplug_config::model::RegistryBackend;
        use modelplug_core::PluginStatus;
        use modelplug_runtime::InstallOptions;
        use modelplug_test_utils::bundle::{BundleBuilder, HEALTHY_UNIT_WAT};

        let dir = tempfile::tempdir().unwrap();
        let mut config = ModelplugConfig::default();
        config.storage.backend = RegistryBackend::Sqlite;
        config.storage.database_path = dir.path().join("registry.db").to_string_lossy().into_owned();
        config.storage.wal_mode = false;
        config.install.plugins_dir = dir.path().join("plugins").to_string_lossy().into_owned();
        config.install.icons_dir = dir.path().join("icons").to_string_lossy().into_owned();

        let bundle = BundleBuilder::new()
            .file(
                "manifest.yaml",
                "id: tool\nname: Tool\nversion: 1.0.0\nauthor: acme\ntype: TOOL\nplugin_class: tool.Main\n",
            )
            .wasm("units/tool/Main.wasm", HEALTHY_UNIT_WAT)
            .write_dir(&dir.path().join("tool"));
        {
            let runtime = PluginRuntime::new(config.clone()).await.unwrap();
            runtime
                .admin()
                .install_path(&bundle, InstallOptions::default())
                .await
                .unwrap();
            runtime.admin().enable("tool").await.unwrap();
        }
        std::fs::remove_file(bundle.join("units/tool/Main.wasm")).unwrap();

        let cli = Cli::try_parse_from(["modelplug", "list", "--plain"]).unwrap();
        run(cli, config.clone()).await.unwrap();

        let runtime = PluginRuntime::new(config).await.unwrap();
        let record = runtime.admin().get("tool").await.unwrap();
        assert_eq!(record.status, PluginStatus::InstalledEnabled);
    }
}
