mod app_cfg;
mod app_fns;
mod arg_parse;
mod args_file;
mod errors;
mod output;

pub(crate) use app_cfg::*;
pub(crate) use errors::*;

pub use app_fns::run_app;
