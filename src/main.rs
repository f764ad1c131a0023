// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! opforge - operation-tree builder and decision file tooling
//!
//! This is the main entry point for the opforge CLI.
//!
//! ## Commands
//!
//! - `decisions` loads and merges decision files
//! - `plan` prepares a generation plan from a configuration
//! - `demo` lowers and evaluates a sample program

mod cli;
mod demo;

use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, DecisionsArgs, PlanArgs};
use opforge_decisions::{
    DecisionKind, DecisionSet, GenerationConfig, GenerationPlan, load_decisions_async,
    tracing_requested_from_env,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Decisions(args) => run_decisions(args, &cli).await,
        Commands::Plan(args) => run_plan(args, &cli),
        Commands::Demo => demo::run(&cli),
    }
}

/// Load, merge and report decision files.
async fn run_decisions(args: &DecisionsArgs, cli: &Cli) -> ExitCode {
    let outcome = load_decisions_async(Some(args.main.as_path()), &args.overrides).await;

    if args.json {
        match outcome.decisions.to_json_string_pretty() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("{}: {}", "Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_summary(&outcome.decisions, cli.verbose);
    }

    for ((kind, id), sources) in outcome.decisions.duplicate_ids() {
        eprintln!(
            "{}: {} '{}' is declared {} times",
            "Warning".yellow().bold(),
            kind,
            id.cyan(),
            sources.len()
        );
        for source in sources {
            eprintln!("  in {source}");
        }
    }

    report_errors(outcome.errors.iter())
}

/// Prepare and print a generation plan.
fn run_plan(args: &PlanArgs, cli: &Cli) -> ExitCode {
    let config = match GenerationConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => return report_errors(std::iter::once(&e)),
    };
    let artifact = args.artifact.as_deref().unwrap_or(&args.config);
    let requested = args.tracing || tracing_requested_from_env();

    let plan = match GenerationPlan::prepare(&config, artifact, requested) {
        Ok(plan) => plan,
        Err(errors) => return report_errors(errors.iter()),
    };

    println!("{} {}", "Mode:".bold(), plan.mode.green());
    if let Some(path) = &plan.decisions_file {
        println!("{} {}", "Decisions file:".bold(), path.display());
    }
    for path in &plan.override_files {
        println!("{} {}", "Override:".bold(), path.display());
    }
    if !plan.boxing_types.is_empty() {
        let names: Vec<&str> = plan.boxing_types.iter().map(|t| t.as_str()).collect();
        println!("{} {}", "Boxing elimination:".bold(), names.join(", "));
    }
    if !plan.decisions.is_empty() {
        print_summary(&plan.decisions, cli.verbose);
    }
    for warning in &plan.warnings {
        eprintln!("{}: {}", "Warning".yellow().bold(), warning);
    }
    ExitCode::SUCCESS
}

fn print_summary(decisions: &DecisionSet, verbose: bool) {
    println!("{} {}", "Decisions:".bold(), decisions.len());
    let counts = decisions.counts();
    for kind in DecisionKind::ALL {
        println!(
            "  {:<18} {}",
            kind.to_string(),
            counts.get(&kind).copied().unwrap_or(0)
        );
    }
    if verbose {
        for entry in decisions {
            println!(
                "  {} {} {}",
                entry.decision.kind().dimmed(),
                entry.decision.id().cyan(),
                entry.provenance.dimmed()
            );
        }
    }
}

fn report_errors<'a, E>(errors: impl Iterator<Item = &'a E>) -> ExitCode
where
    E: std::fmt::Display + 'a,
{
    let mut failed = false;
    for error in errors {
        eprintln!("{}: {}", "Error".red().bold(), error);
        failed = true;
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
