use clap::Parser;

/// Mock generation backend that streams content events
#[derive(Parser, Debug, Clone)]
#[command(name = "mock-generation-api")]
#[command(about = "Mock generation backend for exercising the stream relay")]
pub struct Config {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    pub listen: String,

    /// Number of content events to stream per response
    #[arg(short = 'c', long, default_value = "24")]
    pub chunk_count: usize,

    /// Delay between events in milliseconds
    #[arg(short = 'd', long, default_value = "50")]
    pub chunk_delay_ms: u64,

    /// Number of Tokio worker threads (0 = available parallelism)
    #[arg(short = 'w', long, default_value = "0")]
    pub workers: usize,

    /// Minimal logging output
    #[arg(long)]
    pub quiet: bool,
}

impl Config {
    pub fn worker_threads(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            self.workers
        }
    }
}
