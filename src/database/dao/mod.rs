pub mod prompts;
pub mod users;

pub use prompts::{PromptsDao, RunStatus};
pub use users::UsersDao;
