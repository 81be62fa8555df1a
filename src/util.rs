//! Small utility helpers used across modules.

/// Append a hint line to the draft.
/// A newline separator goes in only when the draft is non-empty and does not
/// already end with one.
pub fn append_hint_line(draft: &str, hint: &str) -> String {
  let mut out = String::with_capacity(draft.len() + hint.len() + 1);
  out.push_str(draft);
  if !draft.is_empty() && !draft.ends_with('\n') {
    out.push('\n');
  }
  out.push_str(hint);
  out
}

/// True for drafts that contain nothing but whitespace.
pub fn is_blank(s: &str) -> bool {
  s.trim().is_empty()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge response bodies. Cuts on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
