use clap::{Parser, Subcommand};
use scan_console::polling::TaskStatus;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// API base URL, e.g. http://127.0.0.1:8000/api
    #[arg(long, global = true, env = "SCAN_CONSOLE_BASE_URL")]
    pub base_url: Option<String>,

    /// Access token of an existing session
    #[arg(long, global = true, env = "SCAN_CONSOLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Refresh token of an existing session
    #[arg(long, global = true, env = "SCAN_CONSOLE_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and print the token pair as JSON
    Login {
        #[arg(short, long, env = "SCAN_CONSOLE_USERNAME")]
        username: String,

        #[arg(short, long, env = "SCAN_CONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List scan tasks
    Tasks {
        /// Only tasks with this status
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,

        /// Only tasks of this project
        #[arg(long)]
        project: Option<i64>,

        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// Poll tasks until every one of them stops
    Watch {
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Start each task before watching it
        #[arg(long)]
        run: bool,
    },

    /// Send a raw authenticated request
    Call {
        /// HTTP method
        method: String,

        /// Path relative to the base URL, e.g. tasks/7
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown task status '{raw}'"))
}
