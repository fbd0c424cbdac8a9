use crate::app::service::TasqueService;
use crate::app::runtime::find_tasque_root;
use crate::cli::action::{GlobalOpts, emit_error};
use crate::cli::commands::dep::{DepCommand, execute_dep};
use crate::cli::commands::label::{LabelCommand, execute_label};
use crate::cli::commands::link::{LinkCommand, execute_link};
use crate::cli::commands::meta::{
    HistoryArgs, InitArgs, RepairArgs, execute_doctor, execute_history, execute_init,
    execute_orphans, execute_repair,
};
use crate::cli::commands::note::{NoteCommand, execute_note};
use crate::cli::commands::spec::{SpecCommand, execute_spec};
use crate::cli::commands::task::{
    CloseArgs, CreateArgs, DuplicateArgs, DuplicatesArgs, ListArgs, MergeArgs, ReadyArgs,
    ReopenArgs, SearchArgs, ShowArgs, StaleArgs, SupersedeArgs, UpdateArgs, execute_close,
    execute_create, execute_duplicate, execute_duplicates, execute_list, execute_merge,
    execute_ready, execute_reopen, execute_search, execute_show, execute_stale, execute_supersede,
    execute_update,
};
use crate::errors::TsqError;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tsq", about = "local event-sourced task tracker")]
pub struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
    #[arg(long = "exact-id", global = true, default_value_t = false)]
    pub exact_id: bool,
    #[command(subcommand)]
    pub command: CommandKind,
}

#[derive(Debug, Subcommand)]
pub enum CommandKind {
    Init(InitArgs),
    Doctor,
    Repair(RepairArgs),
    Orphans,
    History(HistoryArgs),
    Create(CreateArgs),
    Show(ShowArgs),
    List(ListArgs),
    Stale(StaleArgs),
    Ready(ReadyArgs),
    Update(UpdateArgs),
    Duplicate(DuplicateArgs),
    Duplicates(DuplicatesArgs),
    Supersede(SupersedeArgs),
    Merge(MergeArgs),
    Close(CloseArgs),
    Reopen(ReopenArgs),
    Search(SearchArgs),
    #[command(subcommand)]
    Dep(DepCommand),
    #[command(subcommand)]
    Link(LinkCommand),
    #[command(subcommand)]
    Label(LabelCommand),
    #[command(subcommand)]
    Note(NoteCommand),
    #[command(subcommand)]
    Spec(SpecCommand),
}

fn is_init_safe_command(command: &CommandKind) -> bool {
    matches!(command, CommandKind::Init(_) | CommandKind::Doctor)
}

fn root_command_name(command: &CommandKind) -> &'static str {
    match command {
        CommandKind::Init(_) => "tsq init",
        CommandKind::Doctor => "tsq doctor",
        CommandKind::Repair(_) => "tsq repair",
        CommandKind::Orphans => "tsq orphans",
        CommandKind::History(_) => "tsq history",
        CommandKind::Create(_) => "tsq create",
        CommandKind::Show(_) => "tsq show",
        CommandKind::List(_) => "tsq list",
        CommandKind::Stale(_) => "tsq stale",
        CommandKind::Ready(_) => "tsq ready",
        CommandKind::Update(_) => "tsq update",
        CommandKind::Duplicate(_) => "tsq duplicate",
        CommandKind::Duplicates(_) => "tsq duplicates",
        CommandKind::Supersede(_) => "tsq supersede",
        CommandKind::Merge(_) => "tsq merge",
        CommandKind::Close(_) => "tsq close",
        CommandKind::Reopen(_) => "tsq reopen",
        CommandKind::Search(_) => "tsq search",
        CommandKind::Dep(_) => "tsq dep",
        CommandKind::Link(_) => "tsq link",
        CommandKind::Label(_) => "tsq label",
        CommandKind::Note(_) => "tsq note",
        CommandKind::Spec(_) => "tsq spec",
    }
}

/// Parses argv, enforces the `.tasque` bootstrap gate, and dispatches to the
/// matching command-group executor. Returns the process exit code.
pub fn run_cli(service: &TasqueService) -> i32 {
    let cli = Cli::parse();
    let opts = GlobalOpts {
        json: cli.json,
        exact_id: cli.exact_id,
    };

    if !is_init_safe_command(&cli.command) && find_tasque_root().is_none() {
        return emit_error(
            root_command_name(&cli.command),
            opts,
            TsqError::new(
                "NOT_INITIALIZED",
                "no .tasque directory found; run `tsq init` first",
                2,
            ),
        );
    }

    match cli.command {
        CommandKind::Init(args) => execute_init(service, args, opts),
        CommandKind::Doctor => execute_doctor(service, opts),
        CommandKind::Repair(args) => execute_repair(service, args, opts),
        CommandKind::Orphans => execute_orphans(service, opts),
        CommandKind::History(args) => execute_history(service, args, opts),
        CommandKind::Create(args) => execute_create(service, args, opts),
        CommandKind::Show(args) => execute_show(service, args, opts),
        CommandKind::List(args) => execute_list(service, args, opts),
        CommandKind::Stale(args) => execute_stale(service, args, opts),
        CommandKind::Ready(args) => execute_ready(service, args, opts),
        CommandKind::Update(args) => execute_update(service, args, opts),
        CommandKind::Duplicate(args) => execute_duplicate(service, args, opts),
        CommandKind::Duplicates(args) => execute_duplicates(service, args, opts),
        CommandKind::Supersede(args) => execute_supersede(service, args, opts),
        CommandKind::Merge(args) => execute_merge(service, args, opts),
        CommandKind::Close(args) => execute_close(service, args, opts),
        CommandKind::Reopen(args) => execute_reopen(service, args, opts),
        CommandKind::Search(args) => execute_search(service, args, opts),
        CommandKind::Dep(command) => execute_dep(service, command, opts),
        CommandKind::Link(command) => execute_link(service, command, opts),
        CommandKind::Label(command) => execute_label(service, command, opts),
        CommandKind::Note(command) => execute_note(service, command, opts),
        CommandKind::Spec(command) => execute_spec(service, command, opts),
    }
}
