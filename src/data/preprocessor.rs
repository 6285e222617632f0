// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises an utterance before it is stored in the corpus or
// sent to the model. The same cleaning runs at training and at
// prediction time, otherwise the tokenizer sees different
// strings for the same sentence.
//
// Cleaning steps (applied in order):
//   1. Map tabs, newlines, NBSP, zero-width spaces, BOM and other
//      control characters to a plain space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//
// Utterances are one line, so unlike document text no line
// structure is preserved.
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one utterance. Returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading whitespace

        for c in text.chars() {
            let c = match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() || c.is_whitespace() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can remain
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("remind   me  tomorrow"), "remind me tomorrow");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  save this link  "), "save this link");
    }

    #[test]
    fn test_flattens_control_and_unicode_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("cancel\tall\r\nreminders"), "cancel all reminders");
        assert_eq!(p.clean("find\u{00A0}my\u{200B}notes"), "find my notes");
        assert_eq!(p.clean("\u{FEFF}hello\x01world"), "hello world");
    }

    #[test]
    fn test_empty_and_blank() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert_eq!(p.clean(" \t\n "), "");
    }
}
