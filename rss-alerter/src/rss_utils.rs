/// Small helpers shared by configuration and the notification channels

/// URL utilities for feed configuration
pub mod url {
    use url::Url;

    /// Feeds are only fetched over http(s)
    pub fn is_valid_rss_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some()
        } else {
            false
        }
    }
}

/// Text helpers for rendering entries
pub mod text {
    /// Extract readable text from an HTML fragment
    pub fn extract_text_from_html(html: &str) -> String {
        // Tag stripping plus the handful of entities feeds actually use
        let stripped = html
            .replace("<br>", "\n")
            .replace("<br/>", "\n")
            .replace("<br />", "\n")
            .replace("</p>", "\n")
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| {
                match c {
                    '<' => (text, true),
                    '>' => (text, false),
                    _ if !in_tag => {
                        text.push(c);
                        (text, in_tag)
                    },
                    _ => (text, in_tag),
                }
            })
            .0;

        let decoded = stripped
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");

        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Escape text for embedding in an HTML message
    pub fn escape_html(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
