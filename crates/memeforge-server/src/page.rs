//! HTML for shared memes.

use memeforge_core::share::ShareLinks;

pub const PAGE_TITLE: &str = "Based Meme";
pub const OG_TITLE: &str = "Check out this Based Meme!";
pub const OG_DESCRIPTION: &str = "Created with Based Meme Maker";

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Page for a pinned meme, with Open Graph and Twitter card tags so link
/// previews show the image.
pub fn share_page(links: &ShareLinks, cid: &str) -> String {
    let image = escape_html(&links.gateway_url(cid));
    let url = escape_html(&links.share_url(cid));
    let home = escape_html(&links.external_url());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{PAGE_TITLE}</title>
<meta property="og:title" content="{OG_TITLE}">
<meta property="og:description" content="{OG_DESCRIPTION}">
<meta property="og:image" content="{image}">
<meta property="og:url" content="{url}">
<meta name="twitter:card" content="summary_large_image">
<meta name="twitter:image" content="{image}">
</head>
<body>
<h1>Based Meme Shared</h1>
<img src="{image}" alt="Shared Meme">
<p><a href="{home}">Make Your Own</a></p>
</body>
</html>
"#
    )
}

pub fn not_found_page(links: &ShareLinks) -> String {
    let home = escape_html(&links.external_url());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
</head>
<body>
<h1>Meme not found</h1>
<p><a href="{home}">Go Home</a></p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use memeforge_core::share::DEFAULT_GATEWAY;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("QmPlain"), "QmPlain");
    }

    #[test]
    fn test_share_page_tags() {
        let links = ShareLinks::new("https://memes.example", DEFAULT_GATEWAY);
        let html = share_page(&links, "QmAbc");
        assert!(html.contains(
            r#"<meta property="og:image" content="https://gateway.pinata.cloud/ipfs/QmAbc">"#
        ));
        assert!(html.contains(
            r#"<meta property="og:url" content="https://memes.example/share?id=QmAbc">"#
        ));
        assert!(html.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
        assert!(html.contains(OG_TITLE));
    }

    #[test]
    fn test_origin_is_escaped() {
        let links = ShareLinks::new("https://x.example/\"><script>", DEFAULT_GATEWAY);
        let html = not_found_page(&links);
        assert!(!html.contains("<script>"));
        assert!(html.contains("Meme not found"));
    }
}
