#[macro_use]
extern crate log;

use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
};

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use futures::{StreamExt, stream};
use nightwatch::{
    ChannelSource, DatabaseHandler, SessionRecorder, SignalIngestor, SleepMonitor,
    algo::{SignificanceFilter, SignificanceMode, WeeklySummary, helpers::format_hm::FormatHM},
    replay::{LiveReading, read_recording},
    types::{AccelerationEvent, BrightnessEvent, SensorEvent},
};

#[derive(Parser)]
pub struct NightwatchCli {
    #[arg(env, long, default_value = "sqlite://nightwatch.sqlite?mode=rwc")]
    pub database_url: String,
    #[arg(env = "NIGHTWATCH_USER", long, default_value = "local")]
    pub user_id: String,
    /// `raw` compares the total acceleration, `gravity` removes gravity first
    #[arg(env = "NIGHTWATCH_SIGNIFICANCE", long, default_value_t = SignificanceMode::default())]
    pub significance: SignificanceMode,
    #[clap(subcommand)]
    pub subcommand: NightwatchCommand,
}

#[derive(Subcommand)]
pub enum NightwatchCommand {
    ///
    /// Runs sleep detection over a recorded JSON-lines sensor file
    ///
    Replay { file: PathBuf },
    ///
    /// Monitors JSON-lines readings from stdin until EOF or Ctrl-C
    ///
    Monitor,
    ///
    /// Records a manual sleep session
    ///
    Record {
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: NaiveDateTime,
    },
    ///
    /// Prints the sleep recorded for a day
    ///
    Session { date: NaiveDate },
    ///
    /// Prints the seven days ending at `ending` (default today)
    ///
    Week {
        #[arg(long)]
        ending: Option<NaiveDate>,
    },
    ///
    /// Generates shell completions
    ///
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("sqlx::query", log::LevelFilter::Off)
        .filter_module("sea_orm_migration::migrator", log::LevelFilter::Off)
        .init();

    let cli = NightwatchCli::parse();

    if let NightwatchCommand::Completions { shell } = cli.subcommand {
        let mut command = NightwatchCli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut io::stdout());
        return Ok(());
    }

    let db_handler = DatabaseHandler::new(cli.database_url).await?;

    match cli.subcommand {
        NightwatchCommand::Replay { file } => {
            let events = read_recording(&file)?;
            info!("replaying {} events from {}", events.len(), file.display());

            let mut monitor = SleepMonitor::new(cli.user_id, db_handler, cli.significance);
            let ingestor = SignalIngestor::from_stream(
                stream::iter(events).boxed(),
                SignificanceFilter::new(cli.significance),
            );
            monitor.attach(ingestor)?;

            let sessions = monitor.run().await;
            monitor.flush().await;

            for session in &sessions {
                println!(
                    "{} -> {}  {}  quality {:.1}  movements {}  restless {}",
                    session.sleep_start(),
                    session.sleep_end(),
                    session.duration().format_hm(),
                    session.quality(),
                    session.total_movements(),
                    session.restless_periods(),
                );
            }
            println!("Sessions detected: {}", sessions.len());
            Ok(())
        }
        NightwatchCommand::Monitor => {
            let (motion_tx, mut motion) = ChannelSource::<AccelerationEvent>::new();
            let (light_tx, mut light) = ChannelSource::<BrightnessEvent>::new();

            let mut monitor = SleepMonitor::new(cli.user_id, db_handler, cli.significance);
            monitor.start_monitoring(&mut motion, &mut light)?;

            if let Some(stop) = monitor.stop_handle() {
                ctrlc::set_handler(move || stop.abort())?;
            }

            thread::spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else {
                        break;
                    };

                    let reading = match LiveReading::parse(&line) {
                        Ok(Some(reading)) => reading,
                        Ok(None) => continue,
                        Err(error) => {
                            warn!("ignoring input line: {}", error);
                            continue;
                        }
                    };

                    let sent = match reading.into_event(Local::now().naive_local()) {
                        SensorEvent::Acceleration(event) => motion_tx.unbounded_send(event).is_ok(),
                        SensorEvent::Brightness(event) => light_tx.unbounded_send(event).is_ok(),
                    };
                    if !sent {
                        break;
                    }
                }
            });

            monitor.run().await;
            monitor.flush().await;
            Ok(())
        }
        NightwatchCommand::Record { start, end } => {
            let mut monitor = SleepMonitor::new(cli.user_id, db_handler, cli.significance);
            monitor.start_manual_sleep(start)?;
            let record = monitor.stop_manual_sleep(end).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        NightwatchCommand::Session { date } => {
            let recorder = SessionRecorder::new(db_handler);
            match recorder.get_session(&cli.user_id, date).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("No sleep recorded for {}", date),
            }
            Ok(())
        }
        NightwatchCommand::Week { ending } => {
            let ending = ending.unwrap_or_else(|| Local::now().date_naive());
            let recorder = SessionRecorder::new(db_handler);
            let days = recorder.get_weekly_sessions(&cli.user_id, ending).await;
            println!("{}", WeeklySummary::new(days));
            Ok(())
        }
        NightwatchCommand::Completions { .. } => Ok(()),
    }
}
