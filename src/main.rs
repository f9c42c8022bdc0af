// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::PathBuf;

use dynrtl::app_config::{self, Config};
use dynrtl::app_controller::{Controller, ProcessOptions};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply RTL markers to HTML pages and optionally translate them
    Process(ProcessArgs),

    /// Manage per-site enablement
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Manage the custom font
    Font {
        #[command(subcommand)]
        action: FontAction,
    },

    /// Manage the Gemini API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Generate shell completions for dynrtl
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input HTML file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Translate eligible paragraphs to Persian
    #[arg(short, long)]
    translate: bool,

    /// Remove previous translations before translating
    #[arg(long, requires = "translate")]
    retranslate: bool,

    /// Site the pages belong to, for the enablement policy
    #[arg(long)]
    hostname: Option<String>,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(Subcommand, Debug)]
enum SiteAction {
    /// Enable RTL handling for a site
    Enable { hostname: String },
    /// Disable RTL handling for a site
    Disable { hostname: String },
    /// Set whether sites are enabled unless listed
    Default {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Show the current policy, or one site's status
    Status { hostname: Option<String> },
}

#[derive(Subcommand, Debug)]
enum FontAction {
    /// Use a TrueType font file (.ttf, up to 5 MB)
    Set { file: PathBuf },
    /// Revert to the bundled font
    Clear,
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Store an API key; an empty key removes it
    Set { key: String },
    /// Check the stored key against the API
    Test,
}

/// dynrtl - dynamic RTL detection and Persian translation for web pages
#[derive(Parser, Debug)]
#[command(name = "dynrtl")]
#[command(version)]
#[command(about = "Dynamic RTL detection and Persian page translation")]
#[command(long_about = "dynrtl marks Persian and Arabic text in HTML pages for right-to-left display and can translate English paragraphs to Persian with Gemini.

EXAMPLES:
    dynrtl process page.html                        # Mark RTL content
    dynrtl process -t page.html                     # Mark and translate
    dynrtl process -t --retranslate -f pages/       # Retranslate a directory
    dynrtl site disable example.com                 # Turn off a site
    dynrtl font set Vazir-Bold.ttf                  # Use a custom font
    dynrtl key set <KEY>                            # Store the API key
    dynrtl completions bash > dynrtl.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace-capable logger; the effective level is applied once config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "dynrtl", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Process(args) => {
            let options = ProcessOptions {
                translate: args.translate,
                retranslate: args.retranslate,
                hostname: args.hostname,
                output_dir: args.output,
                force_overwrite: args.force_overwrite,
            };
            controller.run(args.input_path, &options).await?;
        }
        Commands::Site { action } => run_site(&controller, action)?,
        Commands::Font { action } => match action {
            FontAction::Set { file } => {
                let upload = controller.set_font(&file)?;
                info!("Using custom font '{}' from {}", upload.family, upload.file_name);
            }
            FontAction::Clear => {
                controller.clear_font()?;
                info!("Reverted to the bundled font");
            }
        },
        Commands::Key { action } => match action {
            KeyAction::Set { key } => {
                controller.set_api_key(&key)?;
                if key.trim().is_empty() {
                    info!("API key removed");
                } else {
                    info!("API key stored");
                }
            }
            KeyAction::Test => {
                controller.test_api_key(&controller.page_backend()).await?;
                info!("API key is valid");
            }
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn run_site(controller: &Controller, action: SiteAction) -> Result<()> {
    match action {
        SiteAction::Enable { hostname } => {
            controller.set_site_enabled(&hostname, true)?;
        }
        SiteAction::Disable { hostname } => {
            controller.set_site_enabled(&hostname, false)?;
        }
        SiteAction::Default { enabled } => {
            controller.set_default_enabled(enabled)?;
            info!("Sites are now {} by default", if enabled { "enabled" } else { "disabled" });
        }
        SiteAction::Status { hostname } => {
            let policy = controller.site_policy()?;
            match hostname {
                Some(hostname) => {
                    let state = if policy.is_enabled_for(&hostname) { "enabled" } else { "disabled" };
                    println!("{}: {}", hostname, state);
                }
                None => {
                    println!("default: {}", if policy.default_enabled { "enabled" } else { "disabled" });
                    for site in policy.exceptions() {
                        println!("  {}", site);
                    }
                }
            }
        }
    }
    Ok(())
}
