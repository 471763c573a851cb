use std::fmt;
use std::path::Path;

use a0_core::{AppDescriptor, Settings};
use a0_engine::DockerClient;

#[derive(Debug, Default, Clone)]
struct CheckResult {
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug, Default)]
struct DoctorReport {
    engine: CheckResult,
    descriptor: CheckResult,
    dockerfile: CheckResult,
    token: CheckResult,
}

impl DoctorReport {
    fn rows(&self) -> [(&'static str, &CheckResult); 4] {
        [
            ("Container engine", &self.engine),
            ("App descriptor", &self.descriptor),
            ("Dockerfile", &self.dockerfile),
            ("API token", &self.token),
        ]
    }

    fn all_passed(&self) -> bool {
        self.rows().iter().all(|(_, r)| r.passed)
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "a0ctl doctor")?;
        writeln!(f, "------------------------------")?;
        for (label, result) in self.rows() {
            writeln!(f, "{label:<18} {} {}", result.icon(), result.detail)?;
        }
        Ok(())
    }
}

/// Check the engine, the app setup in `path`, and credentials.
pub async fn doctor(path: &Path) -> anyhow::Result<()> {
    let mut report = DoctorReport::default();

    report.engine = match DockerClient::new().check_available().await {
        Ok(version) => CheckResult::ok(&format!("server {version}")),
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    report.descriptor = match AppDescriptor::resolve(path) {
        Ok(app) => CheckResult::ok(&format!("{} ({})", app.name, app.region)),
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    report.dockerfile = match a0_build::resolve_dockerfile(path) {
        Some(p) => CheckResult::ok(&p.display().to_string()),
        None => CheckResult::fail("not found"),
    };

    report.token = match Settings::load() {
        Ok(settings) => match a0_cloud::authenticated_client(&settings) {
            Ok(client) => CheckResult::ok(client.username().unwrap_or("valid")),
            Err(e) => CheckResult::fail(&e.to_string()),
        },
        Err(e) => CheckResult::fail(&e.to_string()),
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed, see above for details");
    }

    Ok(())
}
