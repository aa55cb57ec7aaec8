use std::env;

use withyou_lib::{capture::CaptureMode, db::ItemSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = withyou_lib::run().await?;

    // `withyou <text>` files a capture from the command line.
    let text = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !text.trim().is_empty() {
        let outcome = state
            .capture
            .capture(&text, ItemSource::App, CaptureMode::Smart)
            .await?;
        println!("{}", outcome.confirmation());
    }

    Ok(())
}
