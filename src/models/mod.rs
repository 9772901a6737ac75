pub mod session;
pub mod task;
pub mod user;

pub use session::Session;
pub use task::{
    Recurrence, RecurrenceFrequency, Subtask, SubtaskInput, Task, TaskInput, TaskPatch,
    TaskPriority, TaskStatus,
};
pub use user::{CredentialRecord, Principal};
