use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use routesim::config::Settings;
use routesim::external::backend::Backend;
use routesim::input::{Command, HELP};
use routesim::scene::Scene;
use routesim::session::{Controls, Session};
use routesim::status::ConsoleStatus;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!("{}", err);
            std::process::exit(2);
        }
    };

    let backend = match Backend::from_settings(&settings) {
        Ok(backend) => backend,
        Err(err) => {
            tracing::error!("{}", err);
            std::process::exit(2);
        }
    };

    tracing::info!("using routing backend at {}", settings.backend_url);

    let scene = Scene::new();

    let session = match Session::start(
        Arc::new(backend),
        scene.clone(),
        ConsoleStatus::stdout(),
        &settings.map,
    )
    .await
    {
        Ok(session) => session,
        Err(_) => std::process::exit(1),
    };

    print!("{}", scene.snapshot());
    println!("{}", HELP);

    let input = read_commands(scene, session.controls());

    futures::future::join(session.run(), input).await;
}

async fn read_commands(scene: Scene, controls: Controls) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!("failed to read input: {}", err);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let sent = match Command::parse(&line) {
            Some(Command::Click(at)) => {
                if !scene.click(at) {
                    tracing::warn!("the map is not accepting clicks");
                }
                Ok(())
            }
            Some(Command::Drag(role, to)) => {
                if !scene.drag(role, to) {
                    println!("no {} marker to drag", role.label());
                }
                Ok(())
            }
            Some(Command::Reset) => controls.reset(),
            Some(Command::Show) => {
                print!("{}", scene.snapshot());
                Ok(())
            }
            Some(Command::Help) => {
                println!("{}", HELP);
                Ok(())
            }
            Some(Command::Quit) => break,
            None => {
                println!("unrecognized input; {}", HELP);
                Ok(())
            }
        };

        if let Err(err) = sent {
            tracing::error!("{}", err);
            break;
        }

        // let the session apply the event before reading the next line
        tokio::task::yield_now().await;
    }

    if controls.shutdown().is_err() {
        tracing::debug!("session already ended");
    }
}
