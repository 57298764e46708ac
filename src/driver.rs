use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::portal::BrowserType;

/// Manages WebDriver processes (geckodriver, chromedriver).
///
/// Reuses an already-running driver when one answers on its standard port;
/// otherwise spawns one and keeps the child handle so it can be killed
/// before the process exits.
pub struct DriverManager {
    processes: Arc<Mutex<Vec<DriverProcess>>>,
}

struct DriverProcess {
    child: Child,
    url: String,
}

lazy_static::lazy_static! {
    /// Process-wide driver manager, stopped by `main` on every exit path.
    pub static ref GLOBAL_DRIVER_MANAGER: DriverManager = DriverManager::new();
}

impl Default for DriverManager {
    fn default() -> Self {
        Self {
            processes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a WebDriver is reachable for the given browser type and
    /// return the URL to connect to.
    pub async fn ensure_driver(&self, browser_type: BrowserType) -> Result<String> {
        let managed_urls: Vec<String> = {
            let processes = self.processes.lock().unwrap();
            processes.iter().map(|p| p.url.clone()).collect()
        };
        for url in managed_urls {
            if Self::is_driver_ready(&url).await {
                debug!("Using existing managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        // Externally started driver on the standard port?
        let standard_url = match browser_type {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        };
        if Self::is_driver_ready(standard_url).await {
            debug!("Found external WebDriver at {}", standard_url);
            return Ok(standard_url.to_string());
        }

        info!("WebDriver not detected, attempting to start automatically...");
        self.start_driver(browser_type).await
    }

    async fn start_driver(&self, browser_type: BrowserType) -> Result<String> {
        let port = Self::find_free_port(browser_type)?;
        let (command, args) = match browser_type {
            BrowserType::Firefox => (
                "geckodriver",
                vec!["--port".to_string(), port.to_string()],
            ),
            BrowserType::Chrome => ("chromedriver", vec![format!("--port={port}")]),
        };

        if !Self::command_exists(command) {
            anyhow::bail!(
                "{} not found in PATH. Please install it:\n\
                  macOS: brew install {}\n\
                  Linux: Download from official releases",
                command,
                command
            );
        }

        info!("Starting {} on port {}", command, port);
        let child = Command::new(command)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {command}"))?;

        let url = format!("http://localhost:{port}");
        {
            let mut processes = self.processes.lock().unwrap();
            processes.push(DriverProcess {
                child,
                url: url.clone(),
            });
        }

        // Give the driver up to 3 seconds to come up.
        for _ in 0..30 {
            if Self::is_driver_ready(&url).await {
                info!("WebDriver started successfully on port {}", port);
                return Ok(url);
            }
            sleep(Duration::from_millis(100)).await;
        }

        self.stop_all();
        anyhow::bail!("WebDriver failed to start within timeout")
    }

    fn command_exists(command: &str) -> bool {
        #[cfg(unix)]
        let finder = "which";
        #[cfg(windows)]
        let finder = "where";

        Command::new(finder)
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn find_free_port(browser_type: BrowserType) -> Result<u16> {
        let preferred_ports: &[u16] = match browser_type {
            BrowserType::Firefox => &[4444, 4445, 4446],
            BrowserType::Chrome => &[9515, 9516, 9517],
        };
        for &port in preferred_ports {
            if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
                return Ok(port);
            }
            debug!("Port {} is in use", port);
        }

        // Let the OS assign one.
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }

    /// Probe the driver's status endpoint and check it reports ready.
    pub async fn is_driver_ready(url: &str) -> bool {
        let status_url = format!("{url}/status");
        let response = match reqwest::Client::new()
            .get(&status_url)
            .timeout(Duration::from_secs(1))
            .send()
            .await
        {
            Ok(response) => response,
            Err(_) => return false,
        };
        match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("value")
                .and_then(|v| v.get("ready"))
                .and_then(|r| r.as_bool())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Kill every driver process this manager spawned.
    pub fn stop_all(&self) {
        let mut processes = self.processes.lock().unwrap();
        for mut process in processes.drain(..) {
            debug!("Stopping managed WebDriver at {}", process.url);
            let _ = process.child.kill();
            let _ = process.child.wait();
        }
    }
}
