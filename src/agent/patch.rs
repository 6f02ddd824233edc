//! Marker protocol: the generated diff is expected between `PATCH_START` and
//! `PATCH_END`. Backends that ignore the instruction but still answer with a
//! bare diff are accepted as well.

pub const PATCH_START: &str = "PATCH_START";
pub const PATCH_END: &str = "PATCH_END";

/// Prefixes that mark a response as a diff even without markers.
const DIFF_PREFIXES: &[&str] = &["diff --git", "--- a/"];

/// Pull the patch out of a raw generation response.
///
/// `None` means "no change proposed" and is not an error. An empty payload
/// between the markers is the explicit no-change answer.
pub fn extract(raw: &str) -> Option<String> {
    if let (Some(start), Some(end)) = (raw.find(PATCH_START), raw.find(PATCH_END)) {
        if end > start {
            let payload = raw[start + PATCH_START.len()..end].trim();
            return (!payload.is_empty()).then(|| payload.to_string());
        }
    }

    let leading = raw.trim_start();
    if DIFF_PREFIXES.iter().any(|p| leading.starts_with(p)) {
        return Some(raw.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_between_markers_is_trimmed() {
        let raw = "noise PATCH_START\nDIFFTEXT\nPATCH_END more noise";
        assert_eq!(extract(raw).as_deref(), Some("DIFFTEXT"));
    }

    #[test]
    fn test_first_markers_win() {
        let raw = "PATCH_START\none\nPATCH_END\nPATCH_START\ntwo\nPATCH_END";
        assert_eq!(extract(raw).as_deref(), Some("one"));
    }

    #[test]
    fn test_empty_markers_mean_no_change() {
        assert_eq!(extract("PATCH_START\nPATCH_END"), None);
        assert_eq!(extract("PATCH_START   \n\t PATCH_END"), None);
    }

    #[test]
    fn test_end_before_start_is_not_a_match() {
        assert_eq!(extract("PATCH_END oops PATCH_START"), None);
    }

    #[test]
    fn test_bare_diff_fallback_returns_whole_response() {
        let raw = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(extract(raw).as_deref(), Some(raw));

        let raw = "\n  --- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(extract(raw).as_deref(), Some(raw));
    }

    #[test]
    fn test_prose_is_ignored() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("I would change the greeting function."), None);
        assert_eq!(extract("Here is the diff:\ndiff --git a/x b/x"), None);
        assert_eq!(extract("only PATCH_START and nothing else"), None);
    }
}
