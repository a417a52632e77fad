//! Main application entry point (native).
//!
//! Usage: `lessonboard [--json] [CONFIG]`

use std::path::PathBuf;

fn main() {
    env_logger::init();
    log::info!("Starting Lessonboard");

    let mut json = false;
    let mut config_path = None;
    for arg in std::env::args_os().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            config_path = Some(PathBuf::from(arg));
        }
    }

    match lessonboard_app::run(config_path.as_deref()) {
        Ok(summary) if json => println!("{}", summary.to_json()),
        Ok(summary) => print!("{}", summary.render()),
        Err(e) => {
            log::error!("Session failed: {}", e);
            std::process::exit(1);
        }
    }
}
