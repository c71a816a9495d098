//! Build script: stamp the build date, time and user into the binary.

use std::env;

use time::OffsetDateTime;
use time::macros::format_description;

const FALLBACK_DATE: &str = "1970-01-01";
const FALLBACK_TIME: &str = "00:00:00";
const UNKNOWN_USER: &str = "unknown";

fn build_timestamp() -> Option<OffsetDateTime> {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return None;
    };

    let Ok(ts) = raw.parse::<i64>() else {
        println!(
            "cargo:warning=Invalid SOURCE_DATE_EPOCH '{raw}'; expected integer seconds since \
             Unix epoch; falling back to {FALLBACK_DATE} {FALLBACK_TIME}"
        );
        return None;
    };

    match OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => Some(dt),
        Err(_) => {
            println!(
                "cargo:warning=Invalid SOURCE_DATE_EPOCH '{raw}'; not a valid Unix timestamp; \
                 falling back to {FALLBACK_DATE} {FALLBACK_TIME}"
            );
            None
        }
    }
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=USER");

    let stamp = build_timestamp();
    let date = stamp
        .and_then(|dt| dt.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_else(|| FALLBACK_DATE.into());
    let time = stamp
        .and_then(|dt| dt.format(format_description!("[hour]:[minute]:[second]")).ok())
        .unwrap_or_else(|| FALLBACK_TIME.into());
    let user = env::var("USER")
        .ok()
        .filter(|user| !user.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_USER.into());

    println!("cargo:rustc-env=TGEN_BUILD_DATE={date}");
    println!("cargo:rustc-env=TGEN_BUILD_TIME={time}");
    println!("cargo:rustc-env=TGEN_BUILT_BY={user}");
}
