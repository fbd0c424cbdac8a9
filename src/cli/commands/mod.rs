pub mod dep;
pub mod label;
pub mod link;
pub mod meta;
pub mod note;
pub mod spec;
pub mod task;

pub use dep::{DepCommand, execute_dep};
pub use label::{LabelCommand, execute_label};
pub use link::{LinkCommand, execute_link};
pub use note::{NoteCommand, execute_note};
pub use spec::{SpecCommand, execute_spec};
