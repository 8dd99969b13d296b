use std::path::{Path, PathBuf};

use axum::http::{Method, Uri};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use radix_router::config::load_config;
use radix_router::dispatch::RequestParts;
use radix_router::lifecycle::build_router;
use radix_router::routing::{Resolution, Router};

#[derive(Parser)]
#[command(name = "routectl")]
#[command(about = "Inspect and test route configurations offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print its route table
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Resolve a request against a config file and print the outcome as JSON
    Resolve {
        #[arg(short, long)]
        config: PathBuf,

        /// HTTP method, e.g. GET
        method: String,

        /// Request path, e.g. /users/42
        path: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let router = load_router(&config)?;
            println!("{:<8} {:<40} HANDLERS", "METHOD", "PATH");
            for route in router.routes() {
                println!("{:<8} {:<40} {}", route.method, route.path, route.handler_count);
            }
            println!("OK: {} routes", router.routes().len());
        }
        Commands::Resolve {
            config,
            method,
            path,
        } => {
            let router = load_router(&config)?;
            let report = resolve_report(&router, &method, &path)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn load_router(path: &Path) -> Result<Router, Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    Ok(build_router(&config)?)
}

fn resolve_report(router: &Router, method: &str, path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let resolution = match router.resolve(method, path) {
        Resolution::Found(route) => {
            let params: Map<String, Value> = route
                .params
                .iter()
                .map(|p| (p.key.clone(), Value::String(p.value.clone())))
                .collect();
            json!({
                "outcome": "found",
                "template": &*route.template,
                "params": params,
                "handlers": route.handlers.len(),
            })
        }
        Resolution::MethodNotAllowed { allowed } => json!({
            "outcome": "method_not_allowed",
            "allowed": allowed,
        }),
        Resolution::NotFound => json!({ "outcome": "not_found" }),
    };

    let request = RequestParts::new(Method::from_bytes(method.as_bytes())?, path.parse::<Uri>()?);
    let response = router.serve(request);

    Ok(json!({
        "method": method,
        "path": path,
        "resolution": resolution,
        "response": {
            "status": response.status().as_u16(),
            "body": String::from_utf8_lossy(response.body()),
        },
    }))
}
