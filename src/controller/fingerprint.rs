//! # Content Fingerprints
//!
//! MD5 digests used for change detection only.

use crate::crd::MtaParameters;

/// Lower-case hex MD5 of `text`
pub fn md5_hex(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Desired extension hash; empty when no extension is declared
pub fn extension_hash(extension: Option<&str>) -> String {
    extension.map(md5_hex).unwrap_or_default()
}

/// Case-insensitive comparison of hex digests
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Digest of the inputs that require a new deploy submission
///
/// Covers the sorted unique archive URLs, the extension hash and the module
/// selection (`None` and an empty list differ). Deploy options are not
/// included: they only shape the next submission.
pub fn deployment_fingerprint(params: &MtaParameters) -> String {
    let mut urls: Vec<&str> = params.all_files().iter().map(|f| f.url.as_str()).collect();
    urls.sort_unstable();

    let mut input = String::new();
    for url in urls {
        input.push_str("url:");
        input.push_str(url);
        input.push('\n');
    }
    input.push_str("extension:");
    input.push_str(&extension_hash(params.extension.as_deref()));
    input.push('\n');
    match &params.modules {
        Some(modules) => {
            input.push_str("modules:");
            input.push_str(&modules.join(","));
        }
        None => input.push_str("modules:*"),
    }
    md5_hex(&input)
}
