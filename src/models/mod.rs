pub mod issue;
pub mod project;
pub mod user;
pub mod issue_type;
pub mod status;
pub mod search;

pub use issue::*;
pub use project::*;
pub use user::*;
pub use issue_type::*;
pub use status::*;
pub use search::*;
