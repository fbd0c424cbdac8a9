use crate::app::service::TasqueService;
use crate::app::service_types::LinkInput;
use crate::cli::action::{GlobalOpts, run_action};
use crate::errors::TsqError;
use crate::types::RelationType;
use clap::{Args, Subcommand};

#[derive(Debug, Subcommand)]
pub enum LinkCommand {
    Add(LinkAddArgs),
    Remove(LinkRemoveArgs),
}

#[derive(Debug, Args)]
pub struct LinkAddArgs {
    pub src: String,
    pub dst: String,
    #[arg(long = "type", default_value = "relates_to")]
    pub rel_type: String,
}

#[derive(Debug, Args)]
pub struct LinkRemoveArgs {
    pub src: String,
    pub dst: String,
    #[arg(long = "type", default_value = "relates_to")]
    pub rel_type: String,
}

pub fn execute_link(service: &TasqueService, command: LinkCommand, opts: GlobalOpts) -> i32 {
    match command {
        LinkCommand::Add(args) => run_action(
            "tsq link add",
            opts,
            || {
                let rel_type = parse_relation_type(&args.rel_type)?;
                service.link_add(LinkInput {
                    src: args.src.clone(),
                    dst: args.dst.clone(),
                    rel_type,
                    exact_id: opts.exact_id,
                })
            },
            |(src, dst, rel_type)| {
                serde_json::json!({ "src": src, "dst": dst, "type": rel_type })
            },
            |(src, dst, rel_type)| {
                println!("{} -[{:?}]-> {}", src, rel_type, dst);
                Ok(())
            },
        ),
        LinkCommand::Remove(args) => run_action(
            "tsq link remove",
            opts,
            || {
                let rel_type = parse_relation_type(&args.rel_type)?;
                service.link_remove(LinkInput {
                    src: args.src.clone(),
                    dst: args.dst.clone(),
                    rel_type,
                    exact_id: opts.exact_id,
                })
            },
            |(src, dst, rel_type)| {
                serde_json::json!({ "src": src, "dst": dst, "type": rel_type })
            },
            |(src, dst, rel_type)| {
                println!("removed {} -[{:?}]-> {}", src, rel_type, dst);
                Ok(())
            },
        ),
    }
}

fn parse_relation_type(raw: &str) -> Result<RelationType, TsqError> {
    match raw {
        "relates_to" => Ok(RelationType::RelatesTo),
        "replies_to" => Ok(RelationType::RepliesTo),
        "duplicates" => Ok(RelationType::Duplicates),
        "supersedes" => Ok(RelationType::Supersedes),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "type must be one of: relates_to, replies_to, duplicates, supersedes",
            1,
        )),
    }
}
