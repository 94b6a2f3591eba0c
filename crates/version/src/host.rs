/// Picks the host that serves a given asset URL.
///
/// With a CDN, assets are spread across the configured CNAMEs by a stable
/// hash of the source path, so the same asset always lands on the same host.
/// Secure requests go to the CDN's own domain since CNAMEs cannot serve
/// HTTPS. Without a CDN, every asset is served from the bucket's S3 endpoint.
///
/// The scheme is `https` unless SSL is explicitly turned off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetHost {
    hosts: Vec<String>,
    secure_host: String,
    ssl: Option<bool>,
}
impl AssetHost {
    pub fn for_bucket(bucket: &str) -> Self {
        let host = format!("{bucket}.s3.amazonaws.com");
        Self { hosts: vec![host.clone()], secure_host: host, ssl: None }
    }

    /// Serves assets from a CDN `domain`, sharded across `cnames` when any are
    /// given.
    pub fn for_cdn(domain: &str, cnames: &[String]) -> Self {
        let hosts = match cnames.iter().filter(|c| !c.is_empty()).cloned().collect::<Vec<_>>() {
            hosts if hosts.is_empty() => vec![domain.to_string()],
            hosts => hosts,
        };
        Self { hosts, secure_host: domain.to_string(), ssl: None }
    }

    pub fn with_ssl(mut self, ssl: Option<bool>) -> Self {
        self.ssl = ssl;
        self
    }

    /// Returns `scheme://host` for an asset.
    pub fn resolve(&self, source: &str, request_is_secure: bool) -> String {
        let scheme = if self.ssl.unwrap_or(true) { "https" } else { "http" };
        if request_is_secure {
            return format!("{scheme}://{}", self.secure_host);
        }
        let index = crc32fast::hash(source.as_bytes()) as usize % self.hosts.len();
        format!("{scheme}://{}", self.hosts[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cnames() -> Vec<String> {
        vec!["a.example.com".to_string(), "b.example.com".to_string(), "c.example.com".to_string()]
    }

    #[rstest]
    #[case(None, false, "https://assets.s3.amazonaws.com")]
    #[case(None, true, "https://assets.s3.amazonaws.com")]
    #[case(Some(true), false, "https://assets.s3.amazonaws.com")]
    #[case(Some(false), false, "http://assets.s3.amazonaws.com")]
    #[case(Some(false), true, "http://assets.s3.amazonaws.com")]
    fn test_bucket_host(#[case] ssl: Option<bool>, #[case] request: bool, #[case] expected: &str) {
        assert_eq!(AssetHost::for_bucket("assets").with_ssl(ssl).resolve("/css/app.css", request), expected);
    }

    #[test]
    fn test_cdn_without_cnames() {
        let host = AssetHost::for_cdn("d1.cloudfront.net", &[]).with_ssl(Some(false));
        assert_eq!(host.resolve("/a.png", false), "http://d1.cloudfront.net");
        assert_eq!(host.resolve("/a.png", true), "http://d1.cloudfront.net");
        let host = AssetHost::for_cdn("d1.cloudfront.net", &[]);
        assert_eq!(host.resolve("/a.png", true), "https://d1.cloudfront.net");
    }

    #[test]
    fn test_cdn_secure_uses_domain() {
        let host = AssetHost::for_cdn("d1.cloudfront.net", &cnames());
        assert_eq!(host.resolve("/a.png", true), "https://d1.cloudfront.net");
    }

    #[test]
    fn test_cdn_sharding_is_stable() {
        let host = AssetHost::for_cdn("d1.cloudfront.net", &cnames());
        let first = host.resolve("/images/logo.png", false);
        assert!(first.starts_with("https://") && first.ends_with(".example.com"));
        for _ in 0..5 {
            assert_eq!(host.resolve("/images/logo.png", false), first);
        }
    }

    #[test]
    fn test_cdn_sharding_spreads() {
        let host = AssetHost::for_cdn("d1.cloudfront.net", &cnames());
        let used: std::collections::HashSet<_> = (0..64).map(|i| host.resolve(&format!("/images/{i}.png"), false)).collect();
        assert!(used.len() > 1);
    }
}
