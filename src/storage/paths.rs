//! Log file naming

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Minute precision, used for per-run capture files
pub const BRIEF_TIME_FORMAT: &str = "%m-%d %H-%M";

/// Millisecond precision, used for per-call files
pub const ACCURATE_TIME_FORMAT: &str = "%m-%d %H-%M-%S%.3f";

/// Catalog used when neither the policy nor the executable name provides one
pub const FALLBACK_CATALOG: &str = "woodlog.unknown.package.default";

/// File name of a capture file: `<MM-dd HH-mm>_Logs-<label>.log`
pub fn capture_file_name(now: DateTime<Local>, label: &str) -> String {
    format!("{}_Logs-{}.log", now.format(BRIEF_TIME_FORMAT), label)
}

/// File name of a per-call file: `<MM-dd HH-mm-ss.SSS> <method>-<file:line>`
pub fn call_file_name(now: DateTime<Local>, method: &str, file_line: &str) -> String {
    format!(
        "{} {}-{}",
        now.format(ACCURATE_TIME_FORMAT),
        sanitize(method),
        sanitize(file_line)
    )
}

/// Directory holding a catalog's files
pub fn catalog_dir(base_dir: &Path, catalog: &str) -> PathBuf {
    base_dir.join(sanitize(catalog))
}

/// Catalog derived from the running executable's name
pub fn default_catalog() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_CATALOG.to_string())
}

/// Keep names inside their directory
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_capture_file_name() {
        assert_eq!(
            capture_file_name(fixed_time(), "W"),
            "01-21 14-30_Logs-W.log"
        );
        assert_eq!(
            capture_file_name(fixed_time(), "ALL"),
            "01-21 14-30_Logs-ALL.log"
        );
    }

    #[test]
    fn test_call_file_name() {
        assert_eq!(
            call_file_name(fixed_time(), "submit", "cart.rs:42"),
            "01-21 14-30-45.000 submit-cart.rs:42"
        );
    }

    #[test]
    fn test_catalog_dir_stays_inside_base() {
        let base = PathBuf::from("/tmp/woodlog");
        assert_eq!(
            catalog_dir(&base, "shop/../../etc"),
            PathBuf::from("/tmp/woodlog/shop_.._.._etc")
        );
    }

    #[test]
    fn test_default_catalog_is_not_empty() {
        assert!(!default_catalog().is_empty());
    }
}
