//! Supported language codes and normalization.
//!
//! The STT service accepts a closed set of ISO-639-1/3 codes. Region
//! variants (`pt-BR`, `zh_TW`) are reduced to their primary subtag; codes
//! outside the set are dropped rather than guessed.

/// Languages the STT service accepts, sorted for binary search.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "am", "ar", "as", "az", "ba", "be", "bg", "bn", "bo", "br", "bs", "ca", "cs", "cy",
    "da", "de", "el", "en", "es", "et", "eu", "fa", "fi", "fo", "fr", "gl", "gu", "ha", "haw",
    "he", "hi", "hr", "ht", "hu", "hy", "id", "is", "it", "ja", "jv", "ka", "kk", "km", "kn",
    "ko", "la", "lb", "ln", "lo", "lt", "lv", "mg", "mi", "mk", "ml", "mn", "mr", "ms", "mt",
    "my", "ne", "nl", "nn", "no", "oc", "pa", "pl", "ps", "pt", "ro", "ru", "sa", "sd", "si",
    "sk", "sl", "sn", "so", "sq", "sr", "su", "sv", "sw", "ta", "te", "tg", "th", "tk", "tl",
    "tr", "tt", "uk", "ur", "uz", "vi", "yi", "yo", "yue", "zh",
];

/// Normalizes a locale to a supported language code.
///
/// `pt-BR` and `pt_BR` become `pt`; unsupported codes return `None`.
pub fn normalize_language(code: &str) -> Option<&'static str> {
    let lowered = code.trim().to_lowercase();
    let primary = lowered
        .split(['-', '_'])
        .next()
        .unwrap_or_default();
    SUPPORTED_LANGUAGES
        .binary_search(&primary)
        .ok()
        .map(|idx| SUPPORTED_LANGUAGES[idx])
}

/// True when the code (after normalization) is supported.
pub fn is_supported(code: &str) -> bool {
    normalize_language(code).is_some()
}
