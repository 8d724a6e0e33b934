//! HTML hand-off pages
//!
//! Every page tries the deep link shortly after load and sends the browser
//! to the app store if the app did not take over.

/// Page served after a real upload from the fetch-and-upload route
pub struct PublishPage<'a> {
    pub display_name: &'a str,
    pub material_url: &'a str,
    pub material_id: &'a str,
    pub deep_link: &'a str,
    pub fallback_store_url: &'a str,
}

/// Page served when the material itself rides along in the deep link
pub struct HandoffPage<'a> {
    pub title: &'a str,
    pub display_name: &'a str,
    pub original_name: &'a str,
    pub mime_type: &'a str,
    pub size: u64,
    pub deep_link: &'a str,
    /// Inline preview, only set for images
    pub preview_url: Option<&'a str>,
    pub fallback_store_url: &'a str,
    pub note: &'a str,
}

pub fn publish_page(page: &PublishPage<'_>) -> String {
    let deep_link = escape_html(page.deep_link);
    let fallback = escape_html(page.fallback_store_url);
    let material = serde_json::json!({
        "materialId": page.material_id,
        "materialUrl": page.material_url,
    });

    format!(
        r#"<!doctype html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Open Xiaohongshu</title>
  <meta http-equiv="refresh" content="6;url={fallback}" />
  <meta property="xhs:materialId" content="{material_id}" />
  <meta property="xhs:materialUrl" content="{material_url}" />
  <meta property="xhs:deepLink" content="{deep_link}" />
  <style>{style}</style>
  <script>window.XHS_DEEP_LINK = {deep_link_js};</script>
  <script type="application/json" id="xhs-material">{material_json}</script>
  {redirect_script}
</head>
<body>
  <h3>Opening the Xiaohongshu publish page</h3>
  <p class="tips">Material uploaded: {name}. If nothing happens, use the button below.</p>
  <p><a id="open-link" class="btn" href="{deep_link}">Open Xiaohongshu</a></p>
  <p class="tips">Without the app installed you will be sent to the app store.</p>
</body>
</html>"#,
        fallback = fallback,
        material_id = escape_html(page.material_id),
        material_url = escape_html(page.material_url),
        deep_link = deep_link,
        style = BASE_STYLE,
        deep_link_js = script_string(page.deep_link),
        material_json = script_json(&material),
        redirect_script = redirect_script(page.deep_link, page.fallback_store_url, 500, 3000),
        name = escape_html(page.display_name),
    )
}

pub fn handoff_page(page: &HandoffPage<'_>) -> String {
    let preview = match page.preview_url {
        Some(url) => format!(
            r#"<img src="{}" alt="preview" class="preview-img">"#,
            escape_html(url)
        ),
        None => "<p>Video file processed</p>".to_string(),
    };

    format!(
        r#"<!doctype html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <style>{style}</style>
  {redirect_script}
</head>
<body>
  <div class="container">
    <h1>{title}</h1>
    {preview}
    <div class="file-info">
      <h3>{name}</h3>
      <p>File: {original_name}</p>
      <p>Type: {mime_type}</p>
      <p>Size: {size_kb:.1} KB</p>
    </div>
    <p><a id="open-link" class="btn" href="{deep_link}">Open Xiaohongshu</a></p>
    <p class="tips">Redirecting automatically. Without the app installed you will be sent to the app store.</p>
    <div class="demo-note">{note}</div>
  </div>
</body>
</html>"#,
        title = escape_html(page.title),
        style = BASE_STYLE,
        redirect_script = redirect_script(page.deep_link, page.fallback_store_url, 1000, 5000),
        preview = preview,
        name = escape_html(page.display_name),
        original_name = escape_html(page.original_name),
        mime_type = escape_html(page.mime_type),
        size_kb = page.size as f64 / 1024.0,
        deep_link = escape_html(page.deep_link),
        note = escape_html(page.note),
    )
}

/// Shown when a cached material was already claimed or has expired
pub fn expired_page() -> String {
    format!(
        r#"<!doctype html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Link expired</title>
  <style>{style}</style>
</head>
<body>
  <div class="container">
    <h1>Link expired or invalid</h1>
    <p class="tips">This link can be used once and is valid for five minutes. Please upload the file again.</p>
  </div>
</body>
</html>"#,
        style = BASE_STYLE,
    )
}

const BASE_STYLE: &str = "body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, 'PingFang SC', sans-serif; padding: 24px; text-align: center; }
    .container { max-width: 500px; margin: 0 auto; }
    h1 { color: #ff2442; }
    a.btn { background: #ff2442; color: #fff; padding: 12px 18px; border-radius: 10px; text-decoration: none; display: inline-block; }
    .tips { color: #666; margin-top: 12px; }
    .file-info { background: #f8f9fa; border-radius: 10px; padding: 16px; text-align: left; }
    .preview-img { max-width: 200px; max-height: 200px; border-radius: 8px; margin: 15px 0; }
    .demo-note { background: #e8f5e8; border-radius: 8px; padding: 12px; margin-top: 20px; color: #2d5a2d; }";

fn redirect_script(
    deep_link: &str,
    fallback_store_url: &str,
    open_after_ms: u32,
    fallback_after_ms: u32,
) -> String {
    format!(
        r#"<script>
    window.addEventListener('load', function () {{
      setTimeout(function () {{ window.location.href = {deep_link}; }}, {open_after_ms});
      setTimeout(function () {{ window.location.href = {fallback}; }}, {fallback_after_ms});
    }});
  </script>"#,
        deep_link = script_string(deep_link),
        fallback = script_string(fallback_store_url),
        open_after_ms = open_after_ms,
        fallback_after_ms = fallback_after_ms,
    )
}

/// Escape text for HTML content and double-quoted attributes
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

/// JavaScript string literal that is safe inside a `<script>` element
fn script_string(value: &str) -> String {
    script_json(&serde_json::Value::from(value))
}

fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_script_string_blocks_closing_tag() {
        assert_eq!(script_string("</script>"), r#""<\/script>""#);
    }

    #[test]
    fn test_publish_page_contains_links() {
        let html = publish_page(&PublishPage {
            display_name: "Sunset <1>",
            material_url: "https://cdn.example/a.jpg",
            material_id: "m-1",
            deep_link: "xhsdiscover://creation?materialUrl=https%3A%2F%2Fcdn.example%2Fa.jpg",
            fallback_store_url: "https://apps.example/search?term=x&y=1",
        });

        assert!(html.contains(r#"href="xhsdiscover://creation?materialUrl=https%3A%2F%2Fcdn.example%2Fa.jpg""#));
        assert!(html.contains("Sunset &lt;1&gt;"));
        assert!(html.contains(r#"content="6;url=https://apps.example/search?term=x&amp;y=1""#));
        assert!(html.contains(r#""materialId":"m-1""#));
    }

    #[test]
    fn test_handoff_page_preview() {
        let page = HandoffPage {
            title: "Ready to publish",
            display_name: "Photo",
            original_name: "photo.png",
            mime_type: "image/png",
            size: 2048,
            deep_link: "xhsdiscover://creation?materialUrl=data%3A",
            preview_url: Some("data:image/png;base64,aGVsbG8="),
            fallback_store_url: "https://apps.example/",
            note: "Demo mode",
        };
        let html = handoff_page(&page);
        assert!(html.contains(r#"<img src="data:image/png;base64,aGVsbG8=""#));
        assert!(html.contains("2.0 KB"));

        let html = handoff_page(&HandoffPage {
            preview_url: None,
            mime_type: "video/mp4",
            ..page
        });
        assert!(html.contains("Video file processed"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_expired_page() {
        assert!(expired_page().contains("Link expired or invalid"));
    }
}
