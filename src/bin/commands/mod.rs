mod convert_cmd;

pub use convert_cmd::cmd_convert;
