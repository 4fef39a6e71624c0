//! Username collision resolution.

/// Pick a display name for `desired` that `is_taken` does not reject.
///
/// A free name is returned unchanged. Otherwise `desired#2`, `desired#3`, ...
/// are tried in order and the first free one wins.
///
/// The result is only meaningful while the set behind `is_taken` cannot
/// change, so the registry calls this under the same lock as the insert.
pub fn resolve<F>(desired: &str, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !is_taken(desired) {
        return desired.to_string();
    }

    let mut suffix: u64 = 2;
    loop {
        let candidate = format!("{desired}#{suffix}");
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
