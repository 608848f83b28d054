use crate::exporter::ExporterBuildError;
use opentelemetry::otel_warn;
use std::borrow::Cow;
use url::Url;

/// Turns a user or environment supplied endpoint into the `host[:port]`
/// target a gRPC channel connects to.
///
/// An endpoint without a scheme is treated as `https://`. A path is ignored
/// and any scheme other than `http` or `https` is treated as `http`, both with
/// a warning. `unix://` socket addresses are returned trimmed but otherwise
/// unchanged. Applying the function to its own output returns the same value.
pub fn validate_and_normalize_url(url: &str) -> Result<String, ExporterBuildError> {
    let trimmed = url.trim();
    let with_scheme = if has_scheme(trimmed) {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("https://{trimmed}"))
    };
    let parsed = Url::parse(&with_scheme)
        .map_err(|err| ExporterBuildError::InvalidUri(trimmed.to_string(), err.to_string()))?;

    if parsed.scheme() == "unix" {
        return Ok(trimmed.to_string());
    }
    if !matches!(parsed.path(), "" | "/") {
        otel_warn!(
            name: "Config.Grpc.UrlPathIgnored",
            message = "URL path should not be set when using grpc, the path part of the URL will be ignored."
        );
    }
    if !matches!(parsed.scheme(), "http" | "https") {
        otel_warn!(
            name: "Config.Grpc.UnsupportedUrlScheme",
            message = "URL protocol should be http(s)://. Using http://."
        );
    }

    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ExporterBuildError::InvalidUri(trimmed.to_string(), "missing host".into()))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

// A scheme is one to eight word characters followed by `://`.
fn has_scheme(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        (1..=8).contains(&scheme.len())
            && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://api.datacat.io:1234", "api.datacat.io:1234")]
    #[case("api.datacat.io", "api.datacat.io")]
    #[case("  localhost:4317 ", "localhost:4317")]
    #[case("http://localhost:4317", "localhost:4317")]
    #[case("http://localhost:4317/v1/traces", "localhost:4317")]
    #[case("https://localhost", "localhost")]
    #[case("grpc://collector:4317", "collector:4317")]
    #[case("http://[::1]:4317", "[::1]:4317")]
    #[case("unix:///tmp/grpc.sock", "unix:///tmp/grpc.sock")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate_and_normalize_url(input).unwrap(), expected);
    }

    #[rstest]
    #[case("https://api.datacat.io:1234")]
    #[case("api.datacat.io")]
    #[case("localhost:4317")]
    #[case("unix:///tmp/grpc.sock")]
    fn test_normalize_is_idempotent(#[case] input: &str) {
        let once = validate_and_normalize_url(input).unwrap();
        assert_eq!(validate_and_normalize_url(&once).unwrap(), once);
    }

    #[rstest]
    #[case("http://")]
    #[case("http://exa mple.com")]
    #[case("https://host:99999")]
    fn test_invalid(#[case] input: &str) {
        assert!(matches!(
            validate_and_normalize_url(input),
            Err(ExporterBuildError::InvalidUri(..))
        ));
    }

    #[rstest]
    #[case("https://host", true)]
    #[case("unix:///sock", true)]
    #[case("toolongscheme://host", false)]
    #[case("host:4317", false)]
    #[case("host/path?next=http://other", false)]
    fn test_has_scheme(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(has_scheme(input), expected);
    }
}
