// src/types.rs

use std::time::Duration;

use serde::Deserialize;

/// When the scheduler writes the state store back to its persistence.
///
/// - `End`: a single save once every level has been processed (default).
/// - `Level`: additionally save after each level barrier, so a crash in a
///   later level does not lose the outcomes of earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    #[default]
    End,
    Level,
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Section {
        #[serde(default)]
        persist: PersistMode,
    }

    #[test]
    fn persist_mode_reads_lowercase_names_and_defaults_to_end() {
        let level: Section = toml::from_str(r#"persist = "level""#).unwrap();
        assert_eq!(level.persist, PersistMode::Level);

        let unset: Section = toml::from_str("").unwrap();
        assert_eq!(unset.persist, PersistMode::End);

        assert!(toml::from_str::<Section>(r#"persist = "always""#).is_err());
    }

    #[test]
    fn durations_accept_known_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
    }
}
