//! Lists the folders inside a parent folder whose name contains a pattern.
//!
//! ```sh
//! RDRIVE_ACCESS_TOKEN=ya29... RUST_LOG=rdrive=debug \
//!     cargo run --example search -- <parent-folder-id> <pattern>
//! ```

use rdrive::{auth::Credentials, Config, Drive, OrderBy};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let (parent, pattern) = match (args.next(), args.next()) {
        (Some(parent), Some(pattern)) => (parent, pattern),
        _ => {
            eprintln!("usage: search <parent-folder-id> <pattern>");
            std::process::exit(2);
        }
    };
    let credentials = Credentials::from_env().ok_or(
        "set RDRIVE_ACCESS_TOKEN, RDRIVE_KEY_FILE or RDRIVE_CLIENT_EMAIL and RDRIVE_PRIVATE_KEY",
    )?;

    let drive = Drive::new(Config::builder().credentials(credentials).build());
    let mut query = drive
        .query()
        .folder_only()
        .in_folder(&parent)
        .name_contains(&pattern)
        .page_size(20)
        .order_by(OrderBy::Name);

    while query.has_next_page() {
        for folder in query.run().await? {
            println!("{}\t{}\t{}", folder.id, folder.modified_time, folder.name);
        }
    }
    Ok(())
}
