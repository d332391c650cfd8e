//! Worker script patching.
//!
//! Every occurrence of each guard expression is replaced by the literal
//! `true`. All other bytes are left as they were, so a patched script passed
//! through again comes out unchanged.

/// Replacement for every guard.
const UNLOCKED: &[u8] = b"true";

#[derive(Debug, Clone, Default)]
pub struct WorkerScript {
    guards: Vec<Vec<u8>>,
}

impl WorkerScript {
    pub fn new<I, S>(guards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            guards: guards
                .into_iter()
                .map(|g| g.as_ref().as_bytes().to_vec())
                .filter(|g| !g.is_empty())
                .collect(),
        }
    }

    pub fn patch(&self, mut body: Vec<u8>) -> Vec<u8> {
        for guard in &self.guards {
            if let Some(patched) = replace_all(&body, guard, UNLOCKED) {
                body = patched;
            }
        }
        body
    }
}

/// `None` when the needle does not occur.
fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Option<Vec<u8>> {
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            let buf = out.get_or_insert_with(|| Vec::with_capacity(haystack.len()));
            buf.extend_from_slice(&haystack[copied..i]);
            buf.extend_from_slice(replacement);
            i += needle.len();
            copied = i;
        } else {
            i += 1;
        }
    }

    let mut out = out?;
    out.extend_from_slice(&haystack[copied..]);
    Some(out)
}
