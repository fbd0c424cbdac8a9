use crate::app::service::TasqueService;
use crate::app::service_types::{DepInput, DepTreeInput};
use crate::cli::action::{GlobalOpts, run_action};
use crate::cli::parsers::{parse_dep_type, parse_positive_int};
use crate::cli::render::print_dep_tree_result;
use crate::errors::TsqError;
use crate::types::DepDirection;
use clap::{Args, Subcommand};

#[derive(Debug, Subcommand)]
pub enum DepCommand {
    Add(DepAddArgs),
    Remove(DepRemoveArgs),
    Tree(DepTreeArgs),
}

#[derive(Debug, Args)]
pub struct DepAddArgs {
    pub child: String,
    pub blocker: String,
    #[arg(long = "type")]
    pub dep_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct DepRemoveArgs {
    pub child: String,
    pub blocker: String,
    #[arg(long = "type")]
    pub dep_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct DepTreeArgs {
    pub id: String,
    #[arg(long, default_value = "both")]
    pub direction: String,
    #[arg(long, default_value = "10")]
    pub depth: String,
}

pub fn execute_dep(service: &TasqueService, command: DepCommand, opts: GlobalOpts) -> i32 {
    match command {
        DepCommand::Add(args) => run_action(
            "tsq dep add",
            opts,
            || {
                let dep_type = args.dep_type.as_deref().map(parse_dep_type).transpose()?;
                service.dep_add(DepInput {
                    child: args.child.clone(),
                    blocker: args.blocker.clone(),
                    dep_type,
                    exact_id: opts.exact_id,
                })
            },
            |(child, blocker, dep_type)| {
                serde_json::json!({ "child": child, "blocker": blocker, "dep_type": dep_type })
            },
            |(child, blocker, dep_type)| {
                println!("{} depends on {} ({:?})", child, blocker, dep_type);
                Ok(())
            },
        ),
        DepCommand::Remove(args) => run_action(
            "tsq dep remove",
            opts,
            || {
                let dep_type = args.dep_type.as_deref().map(parse_dep_type).transpose()?;
                service.dep_remove(DepInput {
                    child: args.child.clone(),
                    blocker: args.blocker.clone(),
                    dep_type,
                    exact_id: opts.exact_id,
                })
            },
            |(child, blocker, dep_type)| {
                serde_json::json!({ "child": child, "blocker": blocker, "dep_type": dep_type })
            },
            |(child, blocker, dep_type)| {
                println!("removed {} -> {} ({:?})", child, blocker, dep_type);
                Ok(())
            },
        ),
        DepCommand::Tree(args) => run_action(
            "tsq dep tree",
            opts,
            || {
                let direction = Some(parse_direction(&args.direction)?);
                let depth = parse_positive_int(&args.depth, "depth", 1, 1000)? as u32;
                service.dep_tree(DepTreeInput {
                    id: args.id.clone(),
                    direction,
                    depth: Some(depth),
                    exact_id: opts.exact_id,
                })
            },
            |node| serde_json::json!({ "tree": node }),
            |node| {
                print_dep_tree_result(node);
                Ok(())
            },
        ),
    }
}

fn parse_direction(raw: &str) -> Result<DepDirection, TsqError> {
    match raw {
        "up" => Ok(DepDirection::Up),
        "down" => Ok(DepDirection::Down),
        "both" => Ok(DepDirection::Both),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "direction must be one of: up, down, both",
            1,
        )),
    }
}
