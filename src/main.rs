use anyhow::Result;
use arena_display::arena::{AllianceStation, MatchState, StationUpdate};
use arena_display::client::{self, AdminClient, ViewerState};
use arena_display::config::{DisplayConfig, ENV_ADMIN_TOKEN};
use arena_display::{logging, server, DisplayMessage};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "arena-display")]
#[command(about = "Live field status feed for FTA diagnostic displays", version)]
#[command(after_help = "Displays connect to ws://<host>:<port>/displays/fta/websocket and receive
{\"type\": \"status\" | \"reload\", \"payload\": ...} messages as the arena changes.")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the display server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Connect as a display and print every message
    Watch {
        #[arg(
            short,
            long,
            default_value = "ws://127.0.0.1:8080/displays/fta/websocket"
        )]
        url: String,
    },

    /// Tell every connected display to reload
    Reload {
        #[command(flatten)]
        target: Target,
    },

    /// Close every display session
    Disconnect {
        #[command(flatten)]
        target: Target,
    },

    /// Print the current arena status
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Push a station update
    Station {
        station: AllianceStation,

        #[arg(long)]
        ds: Option<bool>,

        #[arg(long)]
        radio: Option<bool>,

        #[arg(long)]
        robot: Option<bool>,

        #[arg(long)]
        battery: Option<f64>,

        #[arg(long)]
        bypass: Option<bool>,

        #[arg(long)]
        estop: Option<bool>,

        #[command(flatten)]
        target: Target,
    },

    /// Change the match state
    Match {
        #[arg(value_enum)]
        state: MatchStateArg,

        #[arg(short, long)]
        number: Option<u32>,

        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Server base URL
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// Admin bearer token
    #[arg(long, env = ENV_ADMIN_TOKEN)]
    token: Option<String>,
}

impl Target {
    fn client(self) -> AdminClient {
        AdminClient::new(self.server, self.token)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchStateArg {
    PreMatch,
    StartMatch,
    WarmupPeriod,
    AutoPeriod,
    PausePeriod,
    TeleopPeriod,
    PostMatch,
    TimeoutActive,
    PostTimeout,
}

impl From<MatchStateArg> for MatchState {
    fn from(arg: MatchStateArg) -> Self {
        match arg {
            MatchStateArg::PreMatch => MatchState::PreMatch,
            MatchStateArg::StartMatch => MatchState::StartMatch,
            MatchStateArg::WarmupPeriod => MatchState::WarmupPeriod,
            MatchStateArg::AutoPeriod => MatchState::AutoPeriod,
            MatchStateArg::PausePeriod => MatchState::PausePeriod,
            MatchStateArg::TeleopPeriod => MatchState::TeleopPeriod,
            MatchStateArg::PostMatch => MatchState::PostMatch,
            MatchStateArg::TimeoutActive => MatchState::TimeoutActive,
            MatchStateArg::PostTimeout => MatchState::PostTimeout,
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = DisplayConfig::load(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        bind: None,
    });

    match command {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }
            let _guard = logging::init(&config)?;
            println!(
                "{}",
                format!("🌐 Starting display server on port {}...", config.port)
                    .cyan()
                    .bold()
            );
            server::start(&config).await?;
        }

        Commands::Watch { url } => {
            let _guard = logging::init(&config)?;
            println!("{} {}", "👁  Watching".cyan().bold(), url.bright_blue());
            let mut viewer = client::connect(&url).await?;
            let mut state = ViewerState::default();
            while let Some(message) = viewer.next_message().await {
                let message = message?;
                state.apply(&message);
                match &message {
                    DisplayMessage::Status(status) => {
                        println!(
                            "{} match {} {:?}",
                            "status".green(),
                            status.match_number,
                            status.match_state
                        );
                        for (station, s) in &status.stations {
                            println!(
                                "  {} team={} ds={} radio={} robot={} battery={:.2}V{}{}",
                                station.to_string().bright_white(),
                                s.team.map_or("-".to_string(), |t| t.to_string()),
                                flag(s.ds_linked),
                                flag(s.radio_linked),
                                flag(s.robot_linked),
                                s.battery_voltage,
                                if s.bypass { " BYPASS".yellow() } else { "".normal() },
                                if s.estop { " ESTOP".red() } else { "".normal() },
                            );
                        }
                    }
                    DisplayMessage::Reload => {
                        println!("{} (#{})", "reload".yellow(), state.reloads);
                    }
                }
            }
            println!("{}", "Connection closed".bright_black());
        }

        Commands::Reload { target } => {
            let report = target.client().reload().await?;
            println!("{} Reload sent to {} displays", "✓".green(), report.listeners);
        }

        Commands::Disconnect { target } => {
            let report = target.client().disconnect_all().await?;
            println!("{} Closed {} listeners", "✓".green(), report.listeners);
        }

        Commands::Status { target } => {
            let status = target.client().status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Station {
            station,
            ds,
            radio,
            robot,
            battery,
            bypass,
            estop,
            target,
        } => {
            let update = StationUpdate {
                ds_linked: ds,
                radio_linked: radio,
                robot_linked: robot,
                battery_voltage: battery,
                bypass,
                estop,
                ..StationUpdate::default()
            };
            if update.is_empty() {
                eprintln!("{} nothing to update", "!".yellow());
                return Ok(());
            }
            let result = target.client().update_station(station, &update).await?;
            println!("{} {} updated", "✓".green(), station);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Match {
            state,
            number,
            target,
        } => {
            target.client().set_match_state(state.into(), number).await?;
            println!("{} Match state updated", "✓".green());
        }
    }

    Ok(())
}

fn flag(value: bool) -> ColoredString {
    if value {
        "up".green()
    } else {
        "down".red()
    }
}
