//! Prompt template rendering.
//!
//! Templates use `{name}` placeholders. Rendering is a single left-to-right
//! pass over the template: substituted values are copied verbatim and never
//! scanned again, so braces inside user text cannot reach other variables.
//! Placeholders without a binding are emitted literally.

/// Render `template`, replacing `{name}` with the matching binding.
pub fn render(template: &str, bindings: &[(&str, &str)]) -> String {
    let bound_len: usize = bindings.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + bound_len);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after_open[..close];
        match bindings.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after_open[close + 1..];
    }
    out.push_str(rest);
    out
}
