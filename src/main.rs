use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use clap::{ArgGroup, Parser, Subcommand};

mod attendance;
mod data;
mod error;
mod geo;
mod leave;
mod models;
mod report;
mod tracker;

use models::{Coordinate, MonthAttendance, TransportConfig};

#[derive(Parser)]
#[command(name = "parent-dashboard-core")]
#[command(about = "Attendance aggregation and bus tracking core for the parent dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a deterministic demo month and write it as CSV
    Seed {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "attendance.csv")]
        out: PathBuf,
    },
    /// Summarize attendance from a CSV file
    Summary {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 75)]
        threshold: u32,
    },
    /// Print a month as a 7-column calendar
    Calendar {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        month: Option<String>,
    },
    /// Export the summary row for one month
    Export {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        month: Option<String>,
        #[arg(long, default_value = "summary.csv")]
        out: PathBuf,
    },
    /// Generate a markdown attendance report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        month: Option<String>,
        #[arg(long, default_value_t = 75)]
        threshold: u32,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// File a leave request for one day
    RequestLeave {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        file: Option<String>,
    },
    /// Attach a teacher remark to a date and rewrite that month's CSV
    Remark {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        text: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compute the ETA from the route start to a stop or coordinate
    #[command(group(
        ArgGroup::new("target")
            .args(["stop", "to_lat"])
            .multiple(false)
    ))]
    Eta {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        stop: Option<String>,
        #[arg(long, requires = "to_lon")]
        to_lat: Option<f64>,
        #[arg(long, requires = "to_lat")]
        to_lon: Option<f64>,
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Run the simulated bus and print live positions
    Track {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        ticks: u32,
        #[arg(long)]
        stop: Option<String>,
    },
    /// Generate a markdown transport sheet with ETAs per student
    TransportReport {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "transport.md")]
        out: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TransportConfig> {
    match path {
        Some(path) => data::load_transport_config(path),
        None => Ok(data::sample_transport_config()?),
    }
}

fn parse_month_key(key: &str) -> anyhow::Result<(i32, u32)> {
    let (year, month) = key
        .split_once('-')
        .context("month must look like YYYY-MM")?;
    Ok((year.parse()?, month.parse()?))
}

fn select_month(
    months: Vec<MonthAttendance>,
    key: Option<&str>,
) -> anyhow::Result<MonthAttendance> {
    match key {
        Some(key) => {
            parse_month_key(key)?;
            months
                .into_iter()
                .find(|m| m.month_key() == key)
                .with_context(|| format!("no records for {key}"))
        }
        None => months
            .into_iter()
            .next()
            .context("no attendance records in file"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed {
            year,
            month,
            seed,
            out,
        } => {
            let students = data::sample_students()?;
            let records = data::seed_month(students[0].id, year, month, seed)?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_month_csv(file, &records)?;
            println!(
                "Wrote {} days for {} to {}.",
                records.len(),
                records.month_key(),
                out.display()
            );
        }
        Commands::Summary { csv, threshold } => {
            let students = data::sample_students()?;
            let months = data::import_attendance_csv(&csv, students[0].id)?;

            if months.is_empty() {
                println!("No attendance records in {}.", csv.display());
                return Ok(());
            }

            for month in &months {
                let summary = attendance::summarize(month);
                println!(
                    "{}: total {}, present {}, absent {}, leave {}, holiday {}, {}%",
                    month.month_key(),
                    summary.total,
                    summary.present,
                    summary.absent,
                    summary.leave,
                    summary.holiday,
                    summary.percent
                );
                if attendance::is_low_attendance(&summary, threshold) {
                    println!("  Low attendance: below {threshold}%.");
                }
            }
        }
        Commands::Calendar { csv, month } => {
            let students = data::sample_students()?;
            let months = data::import_attendance_csv(&csv, students[0].id)?;
            let selected = select_month(months, month.as_deref())?;
            print!("{}", report::render_text_calendar(&selected)?);
        }
        Commands::Export { csv, month, out } => {
            let students = data::sample_students()?;
            let months = data::import_attendance_csv(&csv, students[0].id)?;
            let selected = select_month(months, month.as_deref())?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_summary_csv(file, &students[0], &selected)?;
            println!(
                "Summary for {} written to {}.",
                selected.month_key(),
                out.display()
            );
        }
        Commands::Report {
            csv,
            month,
            threshold,
            out,
        } => {
            let students = data::sample_students()?;
            let months = data::import_attendance_csv(&csv, students[0].id)?;
            let selected = select_month(months, month.as_deref())?;
            let rendered = report::build_attendance_report(&students[0], &selected, threshold);
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
        Commands::RequestLeave { date, reason, file } => {
            let students = data::sample_students()?;
            let mut log = leave::LeaveLog::new();
            let id = {
                let request = log.submit(students[0].id, date, &reason, file)?;
                println!(
                    "Leave request {} for student {} on {}: {} ({})",
                    request.id, request.student_id, request.date, request.reason, request.status
                );
                if let Some(name) = &request.file_name {
                    println!("Attached document: {name}");
                }
                println!("Submitted at {}.", request.submitted_at);
                request.id
            };
            log.notify(format!("Request {id} queued for school review"));
            println!("{} request(s) pending.", log.requests().len());
            for note in log.notifications() {
                println!("- {note}");
            }
        }
        Commands::Remark {
            csv,
            date,
            text,
            out,
        } => {
            let students = data::sample_students()?;
            let months = data::import_attendance_csv(&csv, students[0].id)?;
            let key = format!("{}-{:02}", date.year(), date.month());
            let mut selected = select_month(months, Some(&key))?;
            selected.set_remark(date, &text)?;

            let out = out.unwrap_or(csv);
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_month_csv(file, &selected)?;
            println!("Remark saved for {date}; {} rewritten.", out.display());
        }
        Commands::Eta {
            config,
            stop,
            to_lat,
            to_lon,
            speed,
        } => {
            let config = load_config(config.as_ref())?;
            let speed = speed.unwrap_or(config.speed_kmh);
            let origin = config.route.point(0);

            let (name, target) = match (to_lat, to_lon) {
                (Some(lat), Some(lon)) => ("target".to_string(), Coordinate::new(lat, lon)),
                _ => {
                    let stop = match stop.as_deref() {
                        Some(id) => data::find_stop(&config.stops, id)?,
                        None => config
                            .stops
                            .first()
                            .context("transport config has no stops")?,
                    };
                    (stop.name.clone(), stop.coords)
                }
            };

            let eta = geo::eta_minutes(origin, target, speed)?;
            println!("ETA to {name}: {eta} mins");
        }
        Commands::Track {
            config,
            ticks,
            stop,
        } => {
            let config = load_config(config.as_ref())?;
            let stop = match stop.as_deref() {
                Some(id) => data::find_stop(&config.stops, id)?.clone(),
                None => config
                    .stops
                    .first()
                    .context("transport config has no stops")?
                    .clone(),
            };

            let handle = tracker::start(
                config.route.clone(),
                Duration::from_millis(config.tick_ms),
            );
            let mut positions = handle.subscribe();

            println!(
                "Bus {} on a {}-point loop, one move every {}ms.",
                config.bus.bus_no,
                config.route.len(),
                config.tick_ms
            );
            for tick in 1..=ticks {
                positions.changed().await?;
                let position = handle.current();
                let eta = geo::eta_minutes(position.coords, stop.coords, config.speed_kmh)?;
                println!(
                    "tick {tick}: bus at waypoint {} ({:.4}, {:.4}), ETA to {}: {eta} mins",
                    position.index, position.coords.lat, position.coords.lon, stop.name
                );
            }
            handle.stop();
            let last = handle.current_position();
            println!("Tracker stopped; bus last seen at ({:.4}, {:.4}).", last.lat, last.lon);
        }
        Commands::TransportReport { config, out } => {
            let config = load_config(config.as_ref())?;
            let students = data::sample_students()?;
            let rendered =
                report::build_transport_report(&config, &students, config.route.point(0))?;
            std::fs::write(&out, rendered)?;
            println!("Transport sheet written to {}.", out.display());
        }
    }

    Ok(())
}
