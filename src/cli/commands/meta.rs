use crate::app::service::TasqueService;
use crate::app::service_types::{HistoryInput, InitInput};
use crate::cli::action::{GlobalOpts, run_action};
use crate::cli::parsers::parse_positive_int;
use crate::cli::render::{print_history, print_orphans_result, print_repair_result};
use clap::Args;

#[derive(Debug, Args)]
pub struct InitArgs;

#[derive(Debug, Args)]
pub struct RepairArgs {
    #[arg(long, default_value_t = false)]
    pub fix: bool,
    #[arg(long = "force-unlock", default_value_t = false)]
    pub force_unlock: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub id: String,
    #[arg(long)]
    pub limit: Option<String>,
    #[arg(long = "type")]
    pub event_type: Option<String>,
    #[arg(long)]
    pub actor: Option<String>,
    #[arg(long)]
    pub since: Option<String>,
}

pub fn execute_init(service: &TasqueService, _args: InitArgs, opts: GlobalOpts) -> i32 {
    run_action(
        "tsq init",
        opts,
        || service.init(InitInput),
        |data| data.clone(),
        |data| {
            for file in &data.files {
                println!("created {}", file);
            }
            Ok(())
        },
    )
}

pub fn execute_doctor(service: &TasqueService, opts: GlobalOpts) -> i32 {
    run_action(
        "tsq doctor",
        opts,
        || service.doctor(),
        |data| data.clone(),
        |data| {
            println!(
                "tasks={} events={} snapshot_loaded={}",
                data.tasks, data.events, data.snapshot_loaded
            );
            if let Some(warning) = &data.warning {
                println!("warning={}", warning);
            }
            if data.issues.is_empty() {
                println!("issues=none");
            } else {
                for issue in &data.issues {
                    println!("issue={}", issue);
                }
            }
            Ok(())
        },
    )
}

pub fn execute_repair(service: &TasqueService, args: RepairArgs, opts: GlobalOpts) -> i32 {
    run_action(
        "tsq repair",
        opts,
        || service.repair(args.fix, args.force_unlock),
        |data| data.clone(),
        |data| {
            print_repair_result(data);
            Ok(())
        },
    )
}

pub fn execute_orphans(service: &TasqueService, opts: GlobalOpts) -> i32 {
    run_action(
        "tsq orphans",
        opts,
        || service.orphans(),
        |data| data.clone(),
        |data| {
            print_orphans_result(data);
            Ok(())
        },
    )
}

pub fn execute_history(service: &TasqueService, args: HistoryArgs, opts: GlobalOpts) -> i32 {
    run_action(
        "tsq history",
        opts,
        || {
            let limit = args
                .limit
                .as_deref()
                .map(|value| parse_positive_int(value, "limit", 1, 10000))
                .transpose()?
                .map(|value| value as usize);
            service.history(HistoryInput {
                id: args.id.clone(),
                limit,
                event_type: args.event_type.clone(),
                actor: args.actor.clone(),
                since: args.since.clone(),
                exact_id: opts.exact_id,
            })
        },
        |data| data.clone(),
        |data| {
            print_history(data);
            Ok(())
        },
    )
}
