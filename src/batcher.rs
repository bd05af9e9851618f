//! Notification batcher
//!
//! Packs per-proposal notification strings into outbound message chunks
//! under the chat platform's message-length limit.

/// Greedily pack `items` into chunks of at most `max_len` characters,
/// joining items within a chunk by `sep`.
///
/// - Input order is preserved; items are never reordered or split.
/// - A single item longer than `max_len` is emitted as its own chunk
///   unmodified; that is the only case where a chunk may exceed the limit.
/// - Empty input yields no chunks; callers wanting a fallback message (the
///   "no active proposals" reply) supply it themselves.
pub fn batch(items: &[String], max_len: usize, sep: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();

    for item in items {
        if buf.is_empty() {
            buf.push_str(item);
            continue;
        }
        if buf.len() + sep.len() + item.len() > max_len {
            chunks.push(std::mem::take(&mut buf));
            buf.push_str(item);
        } else {
            buf.push_str(sep);
            buf.push_str(item);
        }
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(batch(&[], 100, "\n\n").is_empty());
    }

    #[test]
    fn test_single_chunk_when_everything_fits() {
        let out = batch(&items(&["aa", "bb", "cc"]), 100, "-");
        assert_eq!(out, vec!["aa-bb-cc".to_string()]);
    }

    #[test]
    fn test_chunks_respect_max_len() {
        let input = items(&["aaaa", "bbbb", "cccc", "dddd"]);
        let out = batch(&input, 9, "-");
        for chunk in &out {
            assert!(chunk.len() <= 9, "chunk '{}' over limit", chunk);
        }
        assert_eq!(out, vec!["aaaa-bbbb".to_string(), "cccc-dddd".to_string()]);
    }

    #[test]
    fn test_oversized_item_emitted_alone() {
        let input = items(&["short", "this item is far too long for the limit", "tail"]);
        let out = batch(&input, 10, "-");
        assert_eq!(
            out,
            vec![
                "short".to_string(),
                "this item is far too long for the limit".to_string(),
                "tail".to_string(),
            ]
        );
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        // 4 + 1 + 4 == 9 == max_len, which must not spill
        let out = batch(&items(&["aaaa", "bbbb"]), 9, "-");
        assert_eq!(out, vec!["aaaa-bbbb".to_string()]);
    }

    #[test]
    fn test_order_preserved_across_chunks() {
        let input: Vec<String> = (0..20).map(|i| format!("item{:02}", i)).collect();
        let out = batch(&input, 25, "\n\n");

        let rejoined: Vec<String> = out
            .iter()
            .flat_map(|chunk| chunk.split("\n\n").map(|s| s.to_string()))
            .collect();
        assert_eq!(rejoined, input);
    }

    #[test]
    fn test_last_buffer_always_sealed() {
        let out = batch(&items(&["aaaa", "bbbb", "cc"]), 9, "-");
        assert_eq!(out.last().unwrap(), "cc");
    }
}
