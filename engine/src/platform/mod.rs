//! Platform-specific utilities
//!
//! Opening a mail-compose window is the one OS-dependent action the engine
//! takes. Supported hosts:
//! - Windows: `rundll32 url.dll,FileProtocolHandler mailto:...`
//! - macOS: `open mailto:...`
//!
//! Anything else fails with `EngineError::UnsupportedPlatform`.

use sdk::errors::EngineError;
use std::io;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Opens an email draft addressed to someone
pub trait MailLauncher: Send + Sync {
    /// Starts the compose command. Does not wait for the mail client.
    fn open_draft(&self, address: &str) -> Result<(), EngineError>;
}

/// Builds the `mailto:` URL for `address`
///
/// # Examples
///
/// ```
/// use catalog_engine::platform::mailto_url;
///
/// assert_eq!(mailto_url(" x@y.edu "), "mailto:x@y.edu");
/// ```
pub fn mailto_url(address: &str) -> String {
    format!("mailto:{}", address.trim())
}

/// Name of the host OS as reported by the standard library
pub fn platform_name() -> &'static str {
    std::env::consts::OS
}

/// Program and arguments that open `url` on `os`, if supported
pub fn compose_command(os: &str, url: &str) -> Option<(&'static str, Vec<String>)> {
    match os {
        "windows" => Some((
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        )),
        "macos" => Some(("open", vec![url.to_string()])),
        _ => None,
    }
}

/// Launches the host's default mail client
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMailLauncher;

impl MailLauncher for SystemMailLauncher {
    fn open_draft(&self, address: &str) -> Result<(), EngineError> {
        let url = mailto_url(address);
        let (program, args) = compose_command(platform_name(), &url)
            .ok_or_else(|| EngineError::UnsupportedPlatform(platform_name().to_string()))?;

        spawn_reaped(program, &args)?;

        info!("Opened email draft to {}", address.trim());
        Ok(())
    }
}

/// Starts `program` without waiting for it.
///
/// A background thread waits on the child so it does not linger as a zombie.
pub fn spawn_reaped(program: &str, args: &[String]) -> io::Result<JoinHandle<()>> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let program = program.to_string();
    Ok(thread::spawn(move || match child.wait() {
        Ok(status) => debug!("{} exited with {}", program, status),
        Err(e) => warn!("Failed to wait on {}: {}", program, e),
    }))
}
