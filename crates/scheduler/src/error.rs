use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("custom interval must be at least 1 day, got {0}")]
    InvalidCustomDays(u32),

    #[error("timer state error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
