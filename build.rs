use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rustc-env=FD_BUILD_TIME={}", build_time());
}

/// UTC build time reported by /health.
///
/// Reproducible builds pin it with SOURCE_DATE_EPOCH; otherwise `date` is
/// asked for the current time, and "unknown" is used where it is missing.
fn build_time() -> String {
    let mut date = Command::new("date");
    date.arg("-u");
    if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
        date.arg("-d").arg(format!("@{}", epoch.trim()));
    }
    date.arg("+%Y-%m-%dT%H:%M:%SZ");

    match date.output() {
        Ok(out) if out.status.success() => {
            let stamp = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if stamp.is_empty() {
                "unknown".to_string()
            } else {
                stamp
            }
        }
        _ => "unknown".to_string(),
    }
}
