use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rusqlite::Connection;

use pbsrun::config::RunnerConfig;
use pbsrun::db::job::load::{get_active_jobs, get_job};
use pbsrun::db::open::{open_db, release_or_rollback};
use pbsrun::pbs::command::{CancelOutcome, PbsCommands};
use pbsrun::pbs::diagnostics::LogDiagnostics;
use pbsrun::pbs::evidence::FileEvidence;
use pbsrun::pbs::monitor::{LifecycleMonitor, Submission};
use pbsrun::pbs::sniff::ErrorSniffer;
use pbsrun::WorkingDirectory;

#[derive(Parser, Debug)]
#[command(name = "pbsrun")]
#[command(version = "0.1")]
#[command(about = "Submit, monitor and cancel PBS jobs")]
struct Args {
    /// Path to the JSON runner configuration
    #[arg(short, long, default_value = "pbsrun.json")]
    config: PathBuf,
    /// Directory holding the job tracking database
    #[arg(short, long, default_value = ".")]
    work_dir: PathBuf,
    /// Roll back every database change before exiting
    #[arg(long)]
    dry_run: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Submit a rendered job script with qsub and start tracking it
    Submit {
        #[arg(long)]
        script: PathBuf,
        /// Job working directory, the epilogue is written to <job-dir>/.pbs/.epilogue.pbs
        #[arg(long)]
        job_dir: PathBuf,
        /// stderr file of the job, defaults to <job-dir>/<stderr_file from the configuration>
        #[arg(long)]
        stderr: Option<PathBuf>,
    },
    /// Check the status of one tracked job
    Status { id: String },
    /// Check every job that hasn't finished yet
    Poll,
    /// Delete a job with qdel
    Cancel { id: String },
}

fn main() -> Result<()> {
    env_logger::init();
    info!("terve! starting up :)");

    let args = Args::parse();
    let config = RunnerConfig::load(&args.config)?;

    let wd = WorkingDirectory { path: args.work_dir.clone() };
    fs::create_dir_all(&wd.path)
        .with_context(|| format!("Can't create working directory {}", wd.path.display()))?;
    let conn = open_db(&wd).context("Can't open job database")?;
    let max_pending_polls = config.max_pending_polls;

    let scheduler = PbsCommands::new(config.commands);
    let evidence = FileEvidence;
    let diagnostics = LogDiagnostics;
    let monitor = LifecycleMonitor {
        scheduler: &scheduler,
        evidence: &evidence,
        sniffer: ErrorSniffer::new(config.error_markers.as_slice()),
        diagnostics: &diagnostics,
        pbs_host: config.pbs_host,
    };

    let result = match args.command {
        Cmd::Submit { script, job_dir, stderr } => {
            let stderr_path = stderr.unwrap_or_else(|| job_dir.join(&config.stderr_file));
            let submission = Submission { script, working_dir: job_dir, stderr_path: Some(stderr_path) };
            submit(&conn, &monitor, &submission)
        }
        Cmd::Status { id } => status(&conn, &monitor, &id, max_pending_polls),
        Cmd::Poll => poll(&conn, &monitor, max_pending_polls),
        Cmd::Cancel { id } => cancel(&monitor, &id),
    };

    release_or_rollback(&conn, args.dry_run).context("Can't finish database transaction")?;
    info!("finished :)");
    result
}

fn submit(conn: &Connection, monitor: &LifecycleMonitor, submission: &Submission) -> Result<()> {
    let record = monitor.submit(submission)?;
    record.track(conn)?;
    println!("{}", record.external_id);
    Ok(())
}

fn status(conn: &Connection, monitor: &LifecycleMonitor, external_id: &str, max_pending_polls: u32) -> Result<()> {
    let job = get_job(conn, external_id)?
        .ok_or_else(|| anyhow!("{external_id} is not tracked in the job database"))?;
    let status = monitor.status(&job.record);
    status.record(conn, max_pending_polls)?;
    println!("{}", serde_json::to_string_pretty(&status.summary())?);
    Ok(())
}

fn poll(conn: &Connection, monitor: &LifecycleMonitor, max_pending_polls: u32) -> Result<()> {
    let jobs = get_active_jobs(conn)?;
    if jobs.is_empty() {
        info!("No active jobs to poll");
    }
    for job in jobs {
        let status = monitor.status(&job.record);
        match status.record(conn, max_pending_polls)? {
            Some(state) if state != job.state => info!("{}: {} -> {state}", job.record.external_id, job.state),
            Some(_) => {}
            None => warn!("{} disappeared from the job database", job.record.external_id),
        }
        println!("{}", serde_json::to_string(&status.summary())?);
    }
    Ok(())
}

fn cancel(monitor: &LifecycleMonitor, external_id: &str) -> Result<()> {
    match monitor.cancel(external_id)? {
        CancelOutcome::Cancelled => println!("{external_id} cancelled"),
        CancelOutcome::AlreadyTerminal => {
            warn!("{external_id} had already finished");
            println!("{external_id} already finished");
        }
        CancelOutcome::TransportFailure(cause) => bail!("Can't cancel {external_id}: {cause}"),
    }
    Ok(())
}
