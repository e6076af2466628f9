use osiris_core::LogSink;
use std::path::Path;

/// Windows RDP client as seen from inside WSL.
pub const WSL_MSTSC: &str = "/mnt/c/Windows/System32/mstsc.exe";
const REMOTE_USER: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Ssh,
    Rdp,
}

impl SessionKind {
    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Ssh => "SSH",
            SessionKind::Rdp => "RDP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub kind: SessionKind,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Wsl,
    Unix,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if Path::new(WSL_MSTSC).exists() {
            Platform::Wsl
        } else {
            Platform::Unix
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommand {
    pub program: String,
    pub args: Vec<String>,
}

pub fn session_command(request: &SessionRequest, platform: Platform) -> SessionCommand {
    let address = &request.address;
    let (program, args) = match (request.kind, platform) {
        (SessionKind::Ssh, _) => ("ssh", vec![format!("{REMOTE_USER}@{address}")]),
        (SessionKind::Rdp, Platform::Windows) => ("mstsc", vec![format!("/v:{address}")]),
        (SessionKind::Rdp, Platform::Wsl) => (WSL_MSTSC, vec![format!("/v:{address}")]),
        (SessionKind::Rdp, Platform::Unix) => (
            "xfreerdp",
            vec![
                format!("/v:{address}"),
                format!("/u:{REMOTE_USER}"),
                "+clipboard".to_string(),
            ],
        ),
    };
    SessionCommand {
        program: program.to_string(),
        args,
    }
}

/// Runs the session in the foreground with inherited stdio. The caller must
/// have released the terminal first. Failures are reported, never raised.
pub async fn run_session(request: &SessionRequest, log: &dyn LogSink) {
    let command = session_command(request, Platform::detect());
    let label = request.kind.label();
    log.log(&format!("Launching {label} to {}", request.address));
    eprintln!("\n[osiris] Launching {label} to {}", request.address);
    if request.kind == SessionKind::Ssh {
        eprintln!("[osiris] Type 'exit' or Ctrl+D to return to osiris\n");
    }

    match tokio::process::Command::new(&command.program)
        .args(&command.args)
        .status()
        .await
    {
        Ok(status) if status.success() => {}
        Ok(status) => log.log(&format!("{label} session exited with {status}")),
        Err(err) => {
            log.log(&format!("{label} error: {err}"));
            eprintln!("[osiris] {label} failed: {err}");
        }
    }
    log.log(&format!("returned from {label} session"));
}
