#[must_use]
pub(super) fn read_non_empty(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub(super) fn read_u64(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    lookup(name).and_then(|raw| raw.trim().parse::<u64>().ok())
}

#[must_use]
pub(super) fn read_u32(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<u32> {
    lookup(name).and_then(|raw| raw.trim().parse::<u32>().ok())
}

#[must_use]
pub(super) fn parse_enabled_default_true(raw: Option<&str>) -> bool {
    !matches!(
        raw.map(|value| value.trim().to_ascii_lowercase())
            .as_deref(),
        Some("off" | "none" | "0" | "false")
    )
}
