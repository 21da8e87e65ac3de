use anyhow::Result;
use tracker_exporter::cli::{actions, actions::Action, start};

#[tokio::main]
async fn main() -> Result<()> {
    match start()? {
        action @ Action::Run { .. } => actions::run::handle(action).await?,
    }

    Ok(())
}
