#![deny(warnings)]

use biology_detect::Result;
use biology_detect::config;
use biology_detect::detect::Detector;
use biology_detect::logging::*;
use biology_detect::vision::{self, VisionSettings};
use biology_detect::web::{self, AppState};

#[tokio::main]
async fn main() {
    let log = DEFAULT.new(o!("function" => "main"));
    info!(log, "Starting up");

    match run().await {
        Ok(_) => info!(log, "shutting down"),
        Err(err) => {
            crit!(log, "shutting down: {:?}", err);
            // slog-async のバッファを流し切るまで待つ
            std::thread::sleep(std::time::Duration::from_millis(100));
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<()> {
    let log = DEFAULT.new(o!("function" => "run"));

    let settings = VisionSettings::from_config()?;
    let port: u16 = config::get_parsed("PORT")?;
    let body_limit: usize = config::get_parsed("BODY_LIMIT_BYTES")?;
    info!(log, "configuration loaded";
        "settings" => ?settings,
        "port" => port,
        "body_limit" => body_limit,
    );

    let client = vision::Client::from_settings(&settings);
    let detector = Detector::new(client, settings.model, settings.options);
    info!(log, "vision model ready"; "model" => %detector.model());

    web::run(AppState { detector, port }, body_limit).await
}
