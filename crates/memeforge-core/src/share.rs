//! Share URLs and IPFS addressing.

use url::Url;

/// Public gateway used when none is configured.
pub const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud";

/// Longest content identifier accepted from the outside.
pub const MAX_CID_LEN: usize = 128;

/// Whether `cid` looks like an IPFS content identifier: non-empty,
/// alphanumeric and bounded in length.
pub fn is_valid_cid(cid: &str) -> bool {
    !cid.is_empty() && cid.len() <= MAX_CID_LEN && cid.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `ipfs://<cid>`, the token URI form.
pub fn ipfs_uri(cid: &str) -> String {
    format!("ipfs://{cid}")
}

/// Builds public links for pinned content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    origin: String,
    gateway: String,
}

impl ShareLinks {
    pub fn new(origin: impl Into<String>, gateway: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            gateway: gateway.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// `<origin>/share?id=<cid>`
    pub fn share_url(&self, cid: &str) -> String {
        format!("{}/share?id={}", self.origin, cid)
    }

    /// `<gateway>/ipfs/<cid>`
    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.gateway, cid)
    }

    /// `<origin>/`
    pub fn external_url(&self) -> String {
        format!("{}/", self.origin)
    }
}

/// Extract the content id from a share URL. Returns `None` when the URL is
/// malformed, isn't a `/share` link, or carries an invalid id.
pub fn parse_share_url(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if url.path().trim_end_matches('/') != "/share" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| is_valid_cid(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn test_share_url() {
        let links = ShareLinks::new("https://memes.example/", DEFAULT_GATEWAY);
        assert_eq!(
            links.share_url(CID),
            format!("https://memes.example/share?id={CID}")
        );
        assert_eq!(
            links.gateway_url(CID),
            format!("https://gateway.pinata.cloud/ipfs/{CID}")
        );
        assert_eq!(links.external_url(), "https://memes.example/");
    }

    #[test]
    fn test_parse_round_trip() {
        let links = ShareLinks::new("https://memes.example", DEFAULT_GATEWAY);
        assert_eq!(parse_share_url(&links.share_url(CID)).as_deref(), Some(CID));
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(parse_share_url("not a url"), None);
        assert_eq!(parse_share_url("https://x.example/other?id=Qm1"), None);
        assert_eq!(parse_share_url("https://x.example/share"), None);
        assert_eq!(parse_share_url("https://x.example/share?id=%3Cscript%3E"), None);
    }

    #[test]
    fn test_cid_validation() {
        assert!(is_valid_cid(CID));
        assert!(!is_valid_cid(""));
        assert!(!is_valid_cid("abc/def"));
        assert!(!is_valid_cid(&"a".repeat(MAX_CID_LEN + 1)));
        assert_eq!(ipfs_uri(CID), format!("ipfs://{CID}"));
    }
}
