pub mod task;
pub mod record;
pub mod project;
pub mod directory;
pub mod config;

pub use task::*;
pub use record::{
    InviteRequest, MemberRequest, NewTaskRecord, ProjectRecord, StudentRecord, TaskPatch, TaskRecord,
};
pub use project::*;
pub use directory::*;
pub use config::*;
