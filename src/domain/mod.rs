pub mod dep_tree;
pub mod deps;
pub mod events;
pub mod ids;
pub mod labels;
pub mod projector;
pub mod projector_deps_links;
pub mod projector_helpers;
pub mod projector_tasks;
pub mod resolve;
pub mod state;
pub mod validate;
