//! Mock Tasking Manager backend.
//!
//! Serves one gridded project over the client's REST paths. Tokens are
//! usernames.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tasking-mock -- --bind 127.0.0.1:5000 --columns 8 --rows 5
//!
//! # Then point the client at it
//! cargo run --bin tasking -- --base-url http://127.0.0.1:5000/api/v2/ \
//!     --token alice --project 1
//! ```

use std::sync::Arc;

use clap::Parser;
use tasking_mock::config::{MockCliArgs, MockConfig};
use tasking_mock::server::{self, MockState};
use tasking_mock::store::ProjectStore;
use tasking_proto::task::ProjectId;

#[tokio::main]
async fn main() {
    let cli = MockCliArgs::parse();

    let config = match MockConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        project_id = config.project_id,
        columns = config.grid_columns,
        rows = config.grid_rows,
        "starting mock backend"
    );

    let store = ProjectStore::with_grid(
        ProjectId::new(config.project_id),
        config.grid_columns,
        config.grid_rows,
    );
    let state = Arc::new(MockState::new(store));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "mock backend listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "mock backend task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start mock backend");
            std::process::exit(1);
        }
    }
}
