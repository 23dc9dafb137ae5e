//! One module per subcommand group.

pub mod check;
pub mod file;
pub mod keywords;
pub mod session;
pub mod tree;
