use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// An isolated home directory for one test.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn credentials(&self) -> PathBuf {
        self.dir.path().join("credentials.json")
    }

    /// Seed the credential file as a previous login would have.
    pub fn seed_tokens(&self, access: &str, refresh: &str) {
        let json = serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
        });
        std::fs::write(self.credentials(), json.to_string()).expect("Failed to seed credentials");
    }

    /// Read back the credential file, if present.
    pub fn stored_tokens(&self) -> Option<serde_json::Value> {
        let raw = std::fs::read_to_string(self.credentials()).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

/// Run the CLI binary against `api_url` with storage isolated under `home`.
pub fn run_cli(args: &[&str], home: &Path, api_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rim"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("RIM_CREDENTIALS", home.join("credentials.json"));
    cmd.env("RIM_API_URL", api_url);
    cmd.env_remove("RIM_WS_URL");
    cmd.env_remove("RIM_PASSWORD");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Panic with the CLI's stderr unless it succeeded.
pub fn assert_success(output: &Output, args: &[&str]) {
    if !output.status.success() {
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr(output));
    }
}
