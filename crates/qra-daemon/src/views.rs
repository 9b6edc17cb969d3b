//! Minimal HTML views. Layout and styling are somebody else's problem; these
//! pages only carry what the flows need (the QR image, the form fields, the
//! hidden token).

/// Landing page shown on the classroom screen. Reloads the QR image whenever
/// the polled token changes.
pub fn landing_page() -> String {
    r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Attendance</title></head>
<body>
<h1>Scan to continue</h1>
<img id="qr" src="/qr_image" alt="QR code">
<script>
let last = null;
async function poll() {
  try {
    const r = await fetch('/current_qr_token', {cache: 'no-store'});
    const j = await r.json();
    if (j.token !== last) {
      last = j.token;
      document.getElementById('qr').src = '/qr_image?t=' + Date.now();
    }
  } catch (_) {}
}
setInterval(poll, 1000);
poll();
</script>
</body>
</html>
"#
    .to_string()
}

pub fn register_form(token: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Register</title></head>
<body>
<h1>Register</h1>
<form method="post" action="/register">
<input type="hidden" name="token" value="{token}">
<label>Name <input name="name" required></label>
<label>Roll <input name="roll" required></label>
<button type="submit">Register</button>
</form>
</body>
</html>
"#,
        token = escape_attr(token)
    )
}

pub fn scan_form(token: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Check in</title></head>
<body>
<h1>Check in</h1>
<form method="post" action="/scan">
<input type="hidden" name="token" value="{token}">
<label>Roll <input name="roll" required></label>
<button type="submit">Check in</button>
</form>
</body>
</html>
"#,
        token = escape_attr(token)
    )
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forms_embed_token_and_post_to_their_route() {
        let reg = register_form("ab12cd34");
        assert!(reg.contains(r#"value="ab12cd34""#));
        assert!(reg.contains(r#"action="/register""#));

        let scan = scan_form("ab12cd34");
        assert!(scan.contains(r#"action="/scan""#));
        assert!(!scan.contains(r#"name="name""#));
    }

    #[test]
    fn attribute_values_are_escaped() {
        assert_eq!(escape_attr(r#""><x"#), "&quot;&gt;&lt;x");
    }
}
