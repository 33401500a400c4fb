use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;background:#111;color:#eee}\
a{color:#8cf}ul.grid{list-style:none;padding:0;display:flex;flex-wrap:wrap;gap:1rem}\
ul.grid img{max-width:256px;max-height:256px}pre{white-space:pre-wrap}";

const DELETE_SCRIPT: &str = r#"<script>
async function deleteImage(folder, image) {
  const res = await fetch("/delete", {
    method: "POST",
    headers: {"Content-Type": "application/json"},
    body: JSON.stringify({folder, image})
  });
  const data = await res.json();
  if (data.status === "success") { window.location = "/" + encodeURIComponent(folder); }
}
</script>"#;

pub fn index_page(folders: &[String]) -> String {
    let mut body = String::from("<h1>Gallery</h1><ul>");
    for folder in folders {
        let _ = write!(
            body,
            r#"<li><a href="/{}">{}</a></li>"#,
            encode_segment(folder),
            escape(folder)
        );
    }
    body.push_str("</ul>");
    page("Gallery", &body)
}

pub fn folder_page(folder: &str, images: &[String]) -> String {
    let mut body = format!(r#"<p><a href="/">Back</a></p><h1>{}</h1><ul class="grid">"#, escape(folder));
    for image in images {
        let _ = write!(
            body,
            r#"<li><a href="/{folder_url}/{image_url}"><img src="/static/{folder_url}/{image_url}" alt="{alt}" loading="lazy"></a></li>"#,
            folder_url = encode_segment(folder),
            image_url = encode_segment(image),
            alt = escape(image)
        );
    }
    body.push_str("</ul>");
    page(folder, &body)
}

pub fn image_page(folder: &str, image: &str, parameters: Option<&str>) -> String {
    let folder_url = encode_segment(folder);
    let image_url = encode_segment(image);
    let mut body = format!(
        r#"<p><a href="/{folder_url}">Back</a></p><h1>{title}</h1><img src="/static/{folder_url}/{image_url}" alt="{title}">"#,
        title = escape(image)
    );
    match parameters {
        Some(parameters) => {
            let _ = write!(body, "<pre>{}</pre>", escape(parameters));
        }
        None => body.push_str("<p>No generation parameters.</p>"),
    }
    let _ = write!(
        body,
        r#"<button onclick="deleteImage({}, {})">Delete</button>{DELETE_SCRIPT}"#,
        escape(&js_string(folder)),
        escape(&js_string(image))
    );
    page(image, &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{STYLE}</style></head><body>{body}</body></html>",
        escape(title)
    )
}

pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn encode_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into())
}
