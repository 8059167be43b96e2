mod cli;

use crate::cli::app::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = App::from_args();
    app.run().await
}
