//! Admin domain actions

mod bulk_delete;
mod dashboard;
mod users;

pub use bulk_delete::{bulk_delete, schedule_bulk_delete, BulkDeleteInput, BulkDeleteScope};
pub use dashboard::{dashboard, Dashboard, GroupAndCount};
pub use users::{
    cancel_user_subscription, list_users, update_user, user_overview, UpdateUserInput,
    UserListQuery, UserOverview,
};
