//! System-info collector collaborator (§6: "each returning a short
//! ASCII tag").

/// The four ambient tags §6's URL grammar names beyond protocol/sdk
/// version: `os`, `os_version`, `device_model`, `network`.
pub trait SystemInfo: Send + Sync {
    fn os_name(&self) -> String;
    fn os_version(&self) -> String;
    fn device_model(&self) -> String;
    fn network_type(&self) -> String;
}

/// Reads what the standard library exposes cheaply; `os_version` and
/// `device_model` have no portable stdlib source, so they fall back to
/// placeholders a host application is expected to override via its own
/// [`SystemInfo`] implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSystemInfo;

impl SystemInfo for DefaultSystemInfo {
    fn os_name(&self) -> String {
        std::env::consts::OS.to_string()
    }

    fn os_version(&self) -> String {
        "unknown".to_string()
    }

    fn device_model(&self) -> String {
        "generic".to_string()
    }

    fn network_type(&self) -> String {
        "unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_system_info_reports_current_os() {
        let info = DefaultSystemInfo;
        assert_eq!(info.os_name(), std::env::consts::OS);
    }
}
