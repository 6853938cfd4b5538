use crate::infra::{open_service, parse_access_level};
use clap::Args;
use recruitment_tracker::config::AppConfig;
use recruitment_tracker::error::AppError;
use recruitment_tracker::pipeline::{AccessLevel, ActorId, NewActor, RosterCsv};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct CallerArgs {
    /// Member id the command acts as; its access level gates the operation
    #[arg(long = "as", value_name = "MEMBER_ID")]
    pub(crate) actor: i64,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Roster CSV with Name, Email, Phone and Degree columns
    pub(crate) csv: PathBuf,
    #[command(flatten)]
    pub(crate) caller: CallerArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ActorAddArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) email: String,
    /// Access level: 1/member, 2/evaluator or 3/admin
    #[arg(long, value_parser = parse_access_level, default_value = "member")]
    pub(crate) level: AccessLevel,
    #[arg(long)]
    pub(crate) department: Option<String>,
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = open_service(&config)?;
    let caller = service.resolve_caller(ActorId(args.caller.actor))?;

    let rows = RosterCsv::from_path(&args.csv)?;
    let summary = service.import_roster(&caller, rows)?;

    println!("Roster import: {}", args.csv.display());
    println!("  processed: {}", summary.processed);
    println!("  inserted:  {}", summary.inserted);
    println!("  updated:   {}", summary.updated);
    Ok(())
}

pub(crate) fn run_stats(args: CallerArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = open_service(&config)?;
    let caller = service.resolve_caller(ActorId(args.actor))?;
    let stats = service.stats(&caller)?;

    println!("Candidates: {}", stats.total);
    for entry in &stats.stages {
        println!("  {:<24} {}", entry.stage.label(), entry.count);
    }
    Ok(())
}

pub(crate) fn run_actor_add(args: ActorAddArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = open_service(&config)?;
    let actor = service.register_initial_actor(NewActor {
        full_name: args.name,
        email: args.email,
        access_level: args.level,
        department: args.department,
        credential_hash: None,
    })?;

    println!(
        "Registered member #{} {} <{}> as {}",
        actor.id.0, actor.full_name, actor.email, actor.access_level
    );
    Ok(())
}

pub(crate) fn run_actor_list(args: CallerArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = open_service(&config)?;
    let caller = service.resolve_caller(ActorId(args.actor))?;

    for summary in service.list_actors(&caller)? {
        let actor = &summary.actor;
        println!(
            "#{:<4} {:<28} {:<32} {:<14} evaluations: {}",
            actor.id.0,
            actor.full_name,
            actor.email,
            actor.access_level.label(),
            summary.evaluations_recorded
        );
    }
    Ok(())
}
