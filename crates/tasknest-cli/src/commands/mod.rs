pub mod add;
pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod done;
pub mod edit;
pub mod list;
pub mod queue;
pub mod run;
pub mod show;
pub mod status;
pub mod sync;
