//! Outline a page snapshot and scroll through it on a tokio runtime
//!
//! ```text
//! cargo run --example outline [snapshot.json]
//! ```

use std::time::Duration;

use dom::DomService;
use serde_json::{json, Value};
use tokio::task::LocalSet;
use toc::{Command, Controller, Host, Preference, TokioScheduler};

fn section(title: &str, y: f64) -> Value {
    json!({
        "nodeName": "h2",
        "bounds": { "x": 240, "y": y, "width": 720, "height": 32 },
        "children": [title],
    })
}

fn snapshot() -> Value {
    let sections: Vec<Value> = ["Motivation", "Design", "Evaluation", "Related work"]
        .iter()
        .enumerate()
        .map(|(i, title)| section(title, 200.0 + i as f64 * 700.0))
        .collect();

    json!({
        "viewport": { "width": 1280, "height": 800 },
        "root": {
            "nodeName": "html",
            "bounds": { "x": 0, "y": 0, "width": 1280, "height": 3200 },
            "children": [{
                "nodeName": "body",
                "bounds": { "x": 0, "y": 0, "width": 1280, "height": 3200 },
                "children": [
                    {
                        "nodeName": "nav",
                        "attributes": { "class": "toc" },
                        "bounds": { "x": 0, "y": 100, "width": 200, "height": 400 },
                        "children": [{ "nodeName": "a", "attributes": { "href": "#design" },
                                       "bounds": { "x": 0, "y": 100, "width": 200, "height": 20 },
                                       "children": ["Design"] }]
                    },
                    {
                        "nodeName": "article",
                        "bounds": { "x": 240, "y": 100, "width": 720, "height": 3000 },
                        "children": sections
                    }
                ]
            }]
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    LocalSet::new()
        .run_until(async {
            // a snapshot file on the command line replaces the built-in page
            let mut service = DomService::new();
            match std::env::args().nth(1) {
                Some(path) => service.load_file(path)?,
                None => service.parse_snapshot(&snapshot())?,
            };

            let scheduler = TokioScheduler::new();
            let host = Host::new(service.into_arena(), scheduler.handle());
            let url = Some("https://example.com/post");
            let mut controller = Controller::new(host, Preference::default(), url)?;

            let mut events = controller.events().subscribe();
            tokio::task::spawn_local(async move {
                while let Ok(event) = events.recv().await {
                    println!("event: {}", serde_json::to_string(&event).unwrap_or_default());
                }
            });

            controller.dispatch(Command::Show);
            for _ in 0..3 {
                controller.dispatch(Command::Next);
                tokio::time::sleep(Duration::from_millis(500)).await;
                controller.pump();

                if let Some(toc) = controller.toc() {
                    let state = toc.state();
                    let headings = state.content.as_ref().map(|c| c.headings.len()).unwrap_or(0);
                    println!(
                        "active heading {} of {}, panel: {}",
                        state.active_heading + 1,
                        headings,
                        state.panel.map(|p| p.to_css()).unwrap_or_default()
                    );
                }
            }

            controller.dispose();
            Ok::<(), Box<dyn std::error::Error>>(())
        })
        .await
}
