// CLI module - User-facing command-line interface

mod interactive;
pub mod output;

use crate::config::PanelConfig;
use crate::daemon::{check_args, DaemonManager, DaemonOptions, LaunchMode};
use crate::desktop::KWinBridge;
use crate::error::{Result, SigPanelError};
use crate::process::{current_uid, ProcessFilter, ProcessLister, SigRun, SigRunner, SignalAction};
use crate::settings::JsonSettingsStore;
use crate::state::{record_send, AutoToggleList, PreviousSelections};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter
pub const LOG_ENV: &str = "SIGPANEL_LOG";

/// sigpanel - Send signals to your desktop processes
#[derive(Parser)]
#[command(name = "sigpanel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Stop the running daemon and remove its lock and PID files
    #[arg(long, conflicts_with_all = ["daemon", "no_daemon"])]
    stop_daemon: bool,

    /// Run the daemon in the foreground
    #[arg(long, conflicts_with = "no_daemon")]
    daemon: bool,

    /// Do not start a background daemon
    #[arg(long)]
    no_daemon: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lock file path, overriding the configuration
    #[arg(long, global = true)]
    lock_file: Option<PathBuf>,

    /// PID file path, overriding the configuration
    #[arg(long, global = true)]
    pid_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the daemon is running
    Status,

    /// List processes that can be signalled
    List {
        /// Case-insensitive substring of the process name
        search: Option<String>,

        /// Include processes of other users
        #[arg(short, long)]
        all_users: bool,
    },

    /// Send a signal to processes by name
    Send {
        /// toggle, stop, cont, KILL, TERM, HUP, INT, QUIT, USR1 or USR2
        signal: String,

        /// Process names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Click a window and print its process name
    Pick {
        /// Send this signal to the picked process
        #[arg(short, long)]
        signal: Option<String>,
    },

    /// Show details for a PID or process name
    Details {
        /// PID or exact process name
        target: String,
    },

    /// Manage processes toggled on desktop switch
    AutoToggle {
        #[command(subcommand)]
        command: AutoToggleCommands,
    },
}

#[derive(Subcommand)]
enum AutoToggleCommands {
    /// Flag a process name
    Add { name: String },
    /// Unflag a process name
    Remove { name: String },
    /// Show flagged names
    List,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        init_logging(if cli.daemon { "info" } else { "warn" });
        cli.execute()
    }

    fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let options = DaemonOptions::from_config(&config);

        if self.stop_daemon {
            check_args(LaunchMode::StopDaemon, &options)?;
            return Ok(());
        }
        if self.daemon {
            check_args(LaunchMode::Daemon, &options)?;
            return Ok(());
        }

        match &self.command {
            Some(command) => self.execute_command(command, &config, &options),
            None => {
                let mode = LaunchMode::Interactive {
                    spawn_daemon: !self.no_daemon,
                };
                if check_args(mode, &options)? {
                    let mut store = JsonSettingsStore::open(&options.settings_path)?;
                    interactive::run(&config, &mut store)?;
                }
                Ok(())
            }
        }
    }

    fn load_config(&self) -> Result<PanelConfig> {
        self.load_config_from(PanelConfig::load(self.config.as_deref())?)
    }

    /// Apply the path flags on top of `config`
    fn load_config_from(&self, mut config: PanelConfig) -> Result<PanelConfig> {
        if let Some(path) = &self.lock_file {
            config.daemon.lock_file = path.clone();
        }
        if let Some(path) = &self.pid_file {
            config.daemon.pid_file = path.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn execute_command(
        &self,
        command: &Commands,
        config: &PanelConfig,
        options: &DaemonOptions,
    ) -> Result<()> {
        match command {
            Commands::Status => {
                let status = DaemonManager::from_options(options).status();
                output::print_daemon_status(&status);
                Ok(())
            }

            Commands::List { search, all_users } => {
                let store = JsonSettingsStore::open(&options.settings_path)?;
                let previous = PreviousSelections::load(&store);
                let filter = build_filter(config, search.as_deref().unwrap_or(""), *all_users);
                let entries = ProcessLister::new().list(&filter, &previous);
                output::print_process_table(&entries);
                Ok(())
            }

            Commands::Send { signal, names } => {
                let signal: SignalAction = signal.parse()?;
                let mut store = JsonSettingsStore::open(&options.settings_path)?;
                let run = send_signal(config, &mut store, signal, names)?;
                finish_send(&run)
            }

            Commands::Pick { signal } => {
                // Parse before asking the user to click anything
                let signal = signal
                    .as_deref()
                    .map(str::parse::<SignalAction>)
                    .transpose()?;

                output::print_info("Click on a window to select its process");
                let name = KWinBridge::default().pick_process_name()?;
                output::print_success_msg(&format!("Picked {}", name));

                if let Some(signal) = signal {
                    let mut store = JsonSettingsStore::open(&options.settings_path)?;
                    let run = send_signal(config, &mut store, signal, &[name])?;
                    finish_send(&run)?;
                }
                Ok(())
            }

            Commands::Details { target } => {
                let details = ProcessLister::new().details(target)?;
                output::print_process_details(&details);
                Ok(())
            }

            Commands::AutoToggle { command } => {
                let mut store = JsonSettingsStore::open(&options.settings_path)?;
                let mut list = AutoToggleList::load(&store);

                match command {
                    AutoToggleCommands::Add { name } => {
                        if list.add(name) {
                            list.save(&mut store)?;
                            output::print_success_msg(&format!("{} will be auto-toggled", name));
                        } else {
                            output::print_info(&format!("{} is already flagged", name));
                        }
                    }
                    AutoToggleCommands::Remove { name } => {
                        if list.remove(name) {
                            list.save(&mut store)?;
                            output::print_success_msg(&format!("{} removed", name));
                        } else {
                            output::print_info(&format!("{} was not flagged", name));
                        }
                    }
                    AutoToggleCommands::List => output::print_auto_toggle(&list),
                }
                Ok(())
            }
        }
    }
}

/// Install the global tracing subscriber. `SIGPANEL_LOG` overrides
/// `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Filter for the current user unless `all_users`
fn build_filter(config: &PanelConfig, search: &str, all_users: bool) -> ProcessFilter {
    let uid = if all_users { None } else { current_uid() };
    ProcessFilter::new(search, uid).with_extra_ignored(config.signals.ignored_processes.clone())
}

/// Remember the selection, then run the `sig` helper and echo its output.
/// The selection is kept even when the helper fails or cannot be started.
pub(crate) fn send_signal(
    config: &PanelConfig,
    store: &mut JsonSettingsStore,
    signal: SignalAction,
    names: &[String],
) -> Result<SigRun> {
    if names.is_empty() {
        return Err(SigPanelError::NothingSelected);
    }
    if let Err(e) = record_send(store, signal, names) {
        tracing::warn!("{}", e);
    }

    let runner = SigRunner::new(config.signals.sig_command.clone());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(runner.run(signal, names, output::print_sig_line))
}

fn finish_send(run: &SigRun) -> Result<()> {
    output::print_sig_result(run);
    if run.success() {
        Ok(())
    } else {
        Err(SigPanelError::SigCommandError(
            run.command.join(" "),
            match run.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by a signal".to_string(),
            },
        ))
    }
}
