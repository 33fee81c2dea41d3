pub mod shell;

pub use shell::ShellTaskRunner;
