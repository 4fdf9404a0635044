//! Label-safe encoding of package identity
//!
//! Kubernetes label values may only contain alphanumerics, `-`, `_` and `.`.
//! Package names (`@scope/name`), parent references (`name@1.0.0`) and
//! registry URLs (`https://...`) all contain characters outside that set,
//! so they are rewritten with multi-character sentinels before being stored
//! as labels and restored when read back.
//!
//! `-` is escaped too, otherwise a name such as `beta-t-runner` would decode
//! with an `@` in it. Every sentinel begins and ends with a letter so the
//! encoded value keeps the alphanumeric first and last character Kubernetes
//! requires, and no sentinel is a prefix of another.

/// Sentinel replacing `@`
pub const AT_SENTINEL: &str = "a-t-r";
/// Sentinel replacing `/`
pub const SLASH_SENTINEL: &str = "s-l-a-s-h";
/// Sentinel replacing `:`
pub const COLON_SENTINEL: &str = "c-o-l-o-n";
/// Sentinel replacing `-`
pub const HYPHEN_SENTINEL: &str = "d-a-s-h";

/// Marker used for a local, unpublished package
pub const LOCAL_PACKAGE: &str = ".";

/// Maximum length of a Kubernetes label value
pub const MAX_LABEL_VALUE_LEN: usize = 63;

const SUBSTITUTIONS: [(char, &str); 4] = [
    ('@', AT_SENTINEL),
    ('/', SLASH_SENTINEL),
    (':', COLON_SENTINEL),
    ('-', HYPHEN_SENTINEL),
];

/// Encode a value into a label-safe string
pub fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match SUBSTITUTIONS.iter().find(|(reserved, _)| *reserved == c) {
            Some((_, sentinel)) => out.push_str(sentinel),
            None => out.push(c),
        }
    }
    out
}

/// Encode a value, mapping the local package marker to the empty string
pub fn special_encode(value: &str) -> String {
    if value == LOCAL_PACKAGE {
        return String::new();
    }
    encode(value)
}

/// Decode a label value produced by [`encode`] or [`special_encode`]
///
/// Scans left to right so a sentinel is only recognised where it starts,
/// never across the boundary of two adjacent sentinels. A bare `-` outside
/// any sentinel is kept as is, which reads labels written before hyphens
/// were escaped.
pub fn decode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    'scan: while !rest.is_empty() {
        for (reserved, sentinel) in SUBSTITUTIONS {
            if let Some(stripped) = rest.strip_prefix(sentinel) {
                out.push(reserved);
                rest = stripped;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Build a resource name fragment from a package name
///
/// Reserved characters become `-`, so `@scope/pkg` turns into `-scope-pkg`.
pub fn sanitize_name(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '@' | '/' | ':') { '-' } else { c })
        .collect()
}

/// Whether an encoded value fits in a Kubernetes label
pub fn fits_label(value: &str) -> bool {
    value.len() <= MAX_LABEL_VALUE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scoped_package() {
        assert_eq!(encode("@atlan/hello"), "a-t-ratlans-l-a-s-hhello");
        assert_eq!(encode("1.0.0"), "1.0.0");
    }

    #[test]
    fn test_encode_registry_url() {
        assert_eq!(
            encode("https://packages.example.com"),
            "httpsc-o-l-o-ns-l-a-s-hs-l-a-s-hpackages.example.com"
        );
    }

    #[test]
    fn test_special_encode_local_marker() {
        assert_eq!(special_encode("."), "");
        assert_eq!(special_encode("demo@1.0.0"), "demoa-t-r1.0.0");
    }

    #[test]
    fn test_decode_inverts_encode() {
        let samples = [
            "",
            "@",
            "/",
            ":",
            "@@//::",
            "@scope/pkg@1.2.3",
            "https://registry:4873/",
            "a:b/c@d",
            "@/:a@/:",
            "abc123",
        ];

        for sample in samples {
            assert_eq!(decode(&encode(sample)), sample, "round trip of {sample:?}");
        }
    }

    #[test]
    fn test_decode_exhaustive_short_strings() {
        let alphabet = ['a', 't', 'r', 's', 'd', '1', '-', '@', '/', ':'];
        let mut inputs = vec![String::new()];
        for _ in 0..4 {
            let mut next = Vec::new();
            for prefix in &inputs {
                for c in alphabet {
                    let mut s = prefix.clone();
                    s.push(c);
                    next.push(s);
                }
            }
            for s in &next {
                assert_eq!(&decode(&encode(s)), s);
            }
            inputs = next;
        }
    }

    #[test]
    fn test_hyphenated_names_round_trip() {
        let samples = [
            "@atlan/beta-t-runner",
            "my-package",
            "s-l-a-s-h",
            "c-o-l-o-n@1.0.0-rc.1",
            "d-a-s-h",
            "1.0.0-beta.1",
            "https://my-registry.example.com:4873",
        ];

        for sample in samples {
            let encoded = encode(sample);
            assert!(!encoded.contains('@') && !encoded.contains('/') && !encoded.contains(':'));
            assert_eq!(decode(&encoded), sample, "round trip of {sample:?}");
        }
        assert_eq!(encode("my-pkg"), "myd-a-s-hpkg");
    }

    #[test]
    fn test_decode_legacy_bare_hyphen() {
        assert_eq!(decode("argopack"), "argopack");
        assert_eq!(decode("1.0.0-beta.1"), "1.0.0-beta.1");
        assert_eq!(decode("my-package"), "my-package");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("@atlan/hello"), "-atlan-hello");
        assert_eq!(sanitize_name("demo"), "demo");
    }

    #[test]
    fn test_fits_label() {
        assert!(fits_label("demo"));
        assert!(!fits_label(&"x".repeat(64)));
    }
}
