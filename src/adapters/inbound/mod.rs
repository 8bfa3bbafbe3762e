mod console_subscriber;

pub use console_subscriber::{AutoApproveHost, ConsoleSubscriber, ReadingReport};
