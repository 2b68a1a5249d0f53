use super::*;

const SAMPLE_DOCUMENT: &str = "
This is a sample document for testing our RAG system.

Artificial Intelligence is a broad field that encompasses machine learning, deep learning,
and natural language processing. It aims to create intelligent systems that can perform
tasks that typically require human intelligence.

Machine Learning is a subset of AI that enables computers to learn and improve from
experience without being explicitly programmed. It uses statistical techniques to give
computers the ability to learn from data.

Deep Learning is a subset of machine learning that uses neural networks with multiple
layers to model and understand complex patterns in data.
";

/// Asserts that the chunks, placed at their furthest admissible positions,
/// leave nothing but whitespace uncovered
fn assert_no_gaps(text: &str, chunks: &[String]) {
    let mut covered_to = 0;

    for chunk in chunks {
        let mut best = None;
        let mut from = 0;
        while let Some(offset) = text[from..].find(chunk.as_str()) {
            let position = from + offset;
            if position > covered_to && !text[covered_to..position].trim().is_empty() {
                break;
            }
            best = Some(position);
            from = position + 1;
        }

        let position =
            best.unwrap_or_else(|| panic!("gap before chunk {:?} (covered to {})", chunk, covered_to));
        covered_to = covered_to.max(position + chunk.len());
    }

    assert!(
        text[covered_to..].trim().is_empty(),
        "uncovered tail: {:?}",
        &text[covered_to..]
    );
}

#[test]
fn short_text_is_single_trimmed_chunk() {
    let chunks = chunk_text("  Hello, world.  \n", 500, 50);
    assert_eq!(chunks, vec!["Hello, world.".to_string()]);
}

#[test]
fn text_of_exactly_chunk_size_is_not_split() {
    let text = "a".repeat(200);
    let chunks = chunk_text(&text, 200, 20);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0], text);
}

#[test]
fn empty_and_blank_text_produce_no_chunks() {
    assert!(chunk_text("", 500, 50).is_empty());
    assert!(chunk_text("   \n\t  ", 500, 50).is_empty());
    assert!(chunk_text(&" ".repeat(2000), 100, 10).is_empty());
}

#[test]
fn sentence_boundaries_are_preferred() {
    let text = "A. B. C. ".repeat(40);
    assert!(text.len() > 200);

    let chunks = chunk_text(&text, 200, 20);
    assert!(chunks.len() > 1);

    for chunk in &chunks {
        assert!(chunk.chars().count() <= 200, "chunk too long: {}", chunk.len());
    }
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.ends_with('.'), "chunk does not end at a sentence: {:?}", chunk);
    }
    assert_no_gaps(&text, &chunks);
}

#[test]
fn word_boundaries_are_used_without_sentences() {
    let words = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"];
    let text = words.iter().cycle().take(300).copied().collect::<Vec<_>>().join(" ");

    let chunks = chunk_text(&text, 120, 15);
    assert!(chunks.len() > 1);

    // Overlapping windows may begin mid-word, but a window never ends mid-word
    let (tail, body) = chunks.split_last().expect("at least one chunk");
    assert!(text.ends_with(tail.as_str()));
    for chunk in body {
        let last = chunk.split_whitespace().last().expect("chunk has words");
        assert!(words.contains(&last), "chunk ends mid-word: {:?}", chunk);
    }
    assert_no_gaps(&text, &chunks);
}

#[test]
fn falls_back_to_raw_split_without_boundaries() {
    let text = "x".repeat(1000);
    let chunks = chunk_text(&text, 100, 10);

    // Windows start every 90 characters; the one at 990 is the short tail
    assert_eq!(chunks.len(), 12);
    assert!(chunks[..11].iter().all(|c| c.len() == 100));
    assert_eq!(chunks[11].len(), 10);
    assert_no_gaps(&text, &chunks);
}

#[test]
fn tail_window_is_emitted() {
    let chunks = chunk_text("abcdefg hijkl", 10, 3);
    assert_eq!(chunks, vec!["abcdefg", "efg hijkl", "kl"]);
}

#[test]
fn next_window_starts_from_unclamped_end() {
    // The third window ends exactly at the text end; a fourth still starts at 16 - 4
    let chunks = chunk_text("0123456789abcdef", 8, 4);
    assert_eq!(chunks, vec!["01234567", "456789ab", "89abcdef", "cdef"]);
}

#[test]
fn early_boundaries_are_ignored() {
    // The only period sits before the window midpoint, so the edge stays raw
    let text = format!("Hi. {}", "y".repeat(300));
    let chunks = chunk_text(&text, 100, 0);

    assert_eq!(chunks[0].chars().count(), 100);
    assert!(chunks[0].starts_with("Hi. "));
}

#[test]
fn zero_overlap_produces_disjoint_chunks() {
    let text = "x".repeat(450);
    let chunks = chunk_text(&text, 100, 0);

    assert_eq!(chunks.len(), 5);
    assert_eq!(chunks.iter().map(String::len).sum::<usize>(), 450);
}

#[test]
fn large_overlap_still_terminates() {
    let text = "Short sentence here. ".repeat(50);

    for overlap in [60, 100, 150, 1000] {
        let chunks = chunk_text(&text, 100, overlap);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= text.len());
        assert_no_gaps(&text, &chunks);
    }
}

#[test]
fn no_gaps_on_sample_document() {
    let chunks = chunk_text(SAMPLE_DOCUMENT, 200, 20);
    assert!(chunks.len() > 2);
    assert_no_gaps(SAMPLE_DOCUMENT, &chunks);
}

#[test]
fn chunking_is_deterministic() {
    let first = chunk_text(SAMPLE_DOCUMENT, 150, 30);
    let second = chunk_text(SAMPLE_DOCUMENT, 150, 30);
    assert_eq!(first, second);
}

#[test]
fn multibyte_text_is_split_on_characters() {
    let text = "héllo wörld ünïcode. ".repeat(40);
    let chunks = chunk_text(&text, 64, 8);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 64);
    }
}

#[test]
fn chunk_document_attaches_metadata() {
    let config = ChunkingConfig {
        chunk_size: 200,
        overlap: 20,
    };
    let chunks = chunk_document("data/sample.txt", SAMPLE_DOCUMENT, &config);

    assert!(chunks.len() > 2);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert_eq!(chunk.source, "data/sample.txt");
        assert_eq!(chunk.char_count, chunk.text.chars().count());
    }
}

#[test]
fn default_config() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 500);
    assert_eq!(config.overlap, 50);
}
