use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use battery_additive_mixer::config::ControllerConfig;
use battery_additive_mixer::logging::init_tracing;
use battery_additive_mixer::report::{format_experiment, format_log, format_parameters};
use battery_additive_mixer::run::CancelToken;
use battery_additive_mixer::session::{ApprovedRun, Mode, PendingRun, RunStep, Session};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    init_tracing();

    let mut config_path: Option<PathBuf> = None;
    let mut iterations: Option<String> = None;
    let mut total = String::new();
    let mut compounds: Vec<(String, String)> = Vec::new();
    let mut mode = Mode::Automatic;
    let mut scale: Option<f64> = None;
    let mut runs = 1usize;
    let mut assume_yes = false;
    let mut seed: Option<u64> = None;
    let mut pause_ms: Option<u64> = None;
    let mut json = false;
    let mut params = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(args.get(i).ok_or_else(|| anyhow!("missing config path"))?));
            }
            "--iterations" => {
                i += 1;
                iterations = Some(args.get(i).cloned().ok_or_else(|| anyhow!("missing iterations"))?);
            }
            "--total" => {
                i += 1;
                total = args.get(i).cloned().ok_or_else(|| anyhow!("missing total"))?;
            }
            "--compound" => {
                i += 1;
                let raw = args.get(i).cloned().ok_or_else(|| anyhow!("missing compound"))?;
                let (name, pct) = raw
                    .rsplit_once('=')
                    .ok_or_else(|| anyhow!("compound must look like NAME=PCT, got {}", raw))?;
                compounds.push((name.to_string(), pct.to_string()));
            }
            "--manual" => {
                mode = Mode::Manual;
            }
            "--automatic" => {
                mode = Mode::Automatic;
            }
            "--scale" => {
                i += 1;
                scale = Some(args.get(i).ok_or_else(|| anyhow!("missing scale factor"))?.parse::<f64>()?);
            }
            "--runs" => {
                i += 1;
                runs = args.get(i).ok_or_else(|| anyhow!("missing runs"))?.parse::<usize>()?;
            }
            "--yes" => {
                assume_yes = true;
            }
            "--seed" => {
                i += 1;
                seed = Some(args.get(i).ok_or_else(|| anyhow!("missing seed"))?.parse::<u64>()?);
            }
            "--pause-ms" => {
                i += 1;
                pause_ms = Some(args.get(i).ok_or_else(|| anyhow!("missing pause"))?.parse::<u64>()?);
            }
            "--json" => {
                json = true;
            }
            "--params" => {
                params = true;
            }
            other => {
                return Err(anyhow!("unknown arg: {}", other));
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => ControllerConfig::load(&path)?,
        None => ControllerConfig::load_or_default()?,
    };
    let pause = Duration::from_millis(pause_ms.unwrap_or(config.iteration_pause_ms));
    let iterations = iterations.unwrap_or_else(|| config.default_iterations.to_string());

    let mut session = Session::new(config);
    session.set_mode(mode);
    for (name, pct) in &compounds {
        if mode == Mode::Automatic && pct.trim().is_empty() {
            session.add_automatic(name)?;
        } else {
            session.add_compound_text(name, pct)?;
        }
    }
    if let Some(factor) = scale {
        session.scale_concentrations(factor)?;
    }

    if params {
        print!("{}", format_parameters(session.selections(), session.config()));
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let recorded = run_experiments(
        &mut session,
        &BatchPlan { runs, iterations, total, pause, echo: !json },
        &mut rng,
        |pending| confirm_all(pending, assume_yes),
        &mut out,
    )?;
    if recorded < runs {
        eprintln!("Run aborted after {} of {} experiment(s).", recorded, runs);
    }

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(session.log())?)?;
    }
    Ok(())
}

struct BatchPlan {
    runs: usize,
    iterations: String,
    total: String,
    pause: Duration,
    /// Print each experiment and the log as it is recorded.
    echo: bool,
}

/// Runs up to `plan.runs` experiments back to back and returns how many were
/// recorded. A declined advisory ends the batch; earlier records stay in the
/// session log.
fn run_experiments<F, W>(
    session: &mut Session,
    plan: &BatchPlan,
    rng: &mut StdRng,
    mut confirm: F,
    out: &mut W,
) -> Result<usize>
where
    F: FnMut(PendingRun) -> Result<Option<ApprovedRun>>,
    W: Write,
{
    let mut recorded = 0;
    for _ in 0..plan.runs {
        let approved = match session.request_run(&plan.iterations, &plan.total)? {
            RunStep::Ready(approved) => approved,
            RunStep::Confirm(pending) => match confirm(pending)? {
                Some(approved) => approved,
                None => break,
            },
        };

        let mut run = approved.start(StdRng::from_rng(&mut *rng)?, CancelToken::new());
        while let Some(reading) = run.next() {
            writeln!(out, "  iteration {:>3}: conductivity {:.2}", reading.iteration, reading.conductivity)?;
            out.flush()?;
            if !run.is_finished() && !plan.pause.is_zero() {
                thread::sleep(plan.pause);
            }
        }

        let record = session.record(run)?;
        recorded += 1;
        if plan.echo {
            writeln!(out)?;
            write!(out, "{}", format_experiment(record))?;
            writeln!(out)?;
            write!(out, "{}", format_log(session.log()))?;
        }
    }
    Ok(recorded)
}

fn confirm_all(mut pending: PendingRun, assume_yes: bool) -> Result<Option<ApprovedRun>> {
    let stdin = io::stdin();
    loop {
        let advisory = pending.advisory().clone();
        eprintln!("{}", advisory.title());
        eprintln!("  {}", advisory.message());
        let accepted = if assume_yes {
            eprintln!("  -> continuing (--yes)");
            true
        } else {
            eprint!("  [y/N] ");
            io::stderr().flush()?;
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        };
        if !accepted {
            pending.decline();
            return Ok(None);
        }
        match pending.accept() {
            RunStep::Confirm(next) => pending = next,
            RunStep::Ready(approved) => return Ok(Some(approved)),
        }
    }
}

fn print_usage() {
    eprintln!("Usage: additive-mixer-cli [--manual|--automatic] [--iterations N] [--total PCT] [--compound NAME=PCT ...] [--scale F] [--runs N] [--yes] [--seed N] [--pause-ms MS] [--config mixer.json] [--json] [--params]");
    eprintln!("  Compound names: \"Compound 1\" (TEP), \"Compound 2\" (ADDITIVE_X), \"Compound 3\" (ADDITIVE_Y), or a slot name.");
    eprintln!("  Set MIXER_LOG=debug for verbose diagnostics.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_session() -> Session {
        let mut session = Session::new(ControllerConfig::default());
        session.set_mode(Mode::Manual);
        session.add_compound("Compound 1", 3.0).unwrap();
        session
    }

    fn plan(runs: usize) -> BatchPlan {
        BatchPlan {
            runs,
            iterations: "2".to_string(),
            total: "10".to_string(),
            pause: Duration::ZERO,
            echo: false,
        }
    }

    #[test]
    fn test_declined_advisory_keeps_earlier_records() {
        let mut session = manual_session();
        let mut rng = StdRng::seed_from_u64(3);
        let mut answers = vec![true, false].into_iter();
        let mut out = Vec::new();

        let recorded = run_experiments(
            &mut session,
            &plan(3),
            &mut rng,
            |pending| match answers.next() {
                Some(true) => match pending.accept() {
                    RunStep::Ready(approved) => Ok(Some(approved)),
                    RunStep::Confirm(_) => Ok(None),
                },
                _ => {
                    pending.decline();
                    Ok(None)
                }
            },
            &mut out,
        )
        .unwrap();

        assert_eq!(recorded, 1);
        assert_eq!(session.log().len(), 1);
        let json = serde_json::to_string(session.log()).unwrap();
        assert!(json.contains("\"sequence\":1"));
    }

    #[test]
    fn test_batch_records_every_run() {
        let mut session = Session::new(ControllerConfig::default());
        let mut rng = StdRng::seed_from_u64(9);
        let mut out = Vec::new();
        let recorded = run_experiments(&mut session, &plan(2), &mut rng, |_| Ok(None), &mut out).unwrap();
        assert_eq!(recorded, 2);
        assert_eq!(session.experiment_count(), 2);
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.matches("iteration").count(), 4);
    }
}
