mod args;

pub use args::{CliArgs, CliExportPreset, Command, CommonArgs, FilterArgs, MetaArgs, TrimArgs};
