pub mod scan;
pub mod watch;
