use super::*;

fn chunker() -> TextChunker {
    TextChunker::new(1500, 200).expect("valid config")
}

fn sentence(n: usize) -> String {
    // Roughly 60 chars per sentence, distinct so overlap is observable.
    format!("Sentence number {n:04} describes an operating risk factor. ")
}

#[test]
fn rejects_zero_overlap() {
    assert!(matches!(
        TextChunker::new(1500, 0),
        Err(ChunkConfigError::ZeroOverlap(0))
    ));
}

#[test]
fn rejects_size_not_above_overlap() {
    assert!(matches!(
        TextChunker::new(200, 200),
        Err(ChunkConfigError::SizeNotAboveOverlap { size: 200, overlap: 200 })
    ));
    assert!(TextChunker::new(201, 200).is_ok());
}

#[test]
fn empty_and_whitespace_input_yield_no_chunks() {
    let c = chunker();
    assert!(c.chunk_text("").is_empty());
    assert!(c.chunk_text("   \n\n\t  ").is_empty());
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = chunker().chunk_text("One short paragraph.\n\nAnd another.");
    assert_eq!(chunks, vec!["One short paragraph.\n\nAnd another."]);
}

#[test]
fn markup_is_stripped_and_whitespace_collapsed() {
    let chunks = chunker().chunk_text("<div>Revenue   grew</div> <b>10%</b>\tyear over year.");
    assert_eq!(chunks, vec!["Revenue grew 10% year over year."]);
}

#[test]
fn paragraphs_accumulate_until_target_size() {
    // Four 400-char paragraphs with a 1000-char target: two fit per chunk.
    let para = "p".repeat(400);
    let text = format!("{para}\n\n{para}\n\n{para}\n\n{para}");
    let c = TextChunker::new(1000, 100).expect("valid config");
    let chunks = c.chunk_text(&text);
    assert_eq!(chunks.len(), 2);
    // 400 + blank line + 400, second chunk additionally carries the overlap.
    assert_eq!(chunks[0].chars().count(), 802);
    assert_eq!(chunks[1].chars().count(), 903);
}

#[test]
fn consecutive_chunks_share_overlap() {
    let text: String = (0..40).map(sentence).collect::<Vec<_>>().join("\n\n");
    let c = chunker();
    let chunks = c.chunk_text(&text);
    assert!(chunks.len() > 1, "expected multiple chunks");
    for pair in chunks.windows(2) {
        let tail: String = pair[0]
            .chars()
            .skip(pair[0].chars().count() - c.chunk_overlap())
            .collect();
        assert!(
            pair[1].starts_with(&tail),
            "next chunk must start with previous tail"
        );
    }
}

#[test]
fn chunks_stay_within_size_plus_overlap() {
    let text: String = (0..80).map(sentence).collect::<Vec<_>>().join("\n\n");
    let c = chunker();
    for chunk in c.chunk_text(&text) {
        assert!(
            chunk.chars().count() <= c.chunk_size() + c.chunk_overlap() + 1,
            "chunk of {} chars exceeds bound",
            chunk.chars().count()
        );
    }
}

#[test]
fn oversized_paragraph_falls_back_to_sentences() {
    // One paragraph of ~3000 chars, no blank lines inside.
    let para: String = (0..50).map(sentence).collect::<Vec<_>>().join("");
    let c = chunker();
    let chunks = c.chunk_text(&para);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= c.chunk_size());
        // Sentence packing breaks at terminators, never mid-word.
        assert!(chunk.ends_with('.'), "chunk should end at a sentence: {chunk}");
    }
}

#[test]
fn punctuation_free_text_is_force_split_with_overlap() {
    // 4999 chars after cleaning, no sentence boundaries anywhere.
    let blob = "word ".repeat(1000);
    let c = chunker();
    let chunks = c.chunk_text(&blob);
    // 1500-char pieces advancing by 1300, then a 1099-char remainder.
    assert_eq!(chunks.len(), 4);
    for chunk in &chunks[..3] {
        assert_eq!(chunk.chars().count(), 1500);
    }
    assert_eq!(chunks[3].chars().count(), 4999 - 3 * 1300);
    for pair in chunks.windows(2) {
        let tail: String = pair[0]
            .chars()
            .skip(pair[0].chars().count() - c.chunk_overlap())
            .collect();
        assert!(pair[1].starts_with(&tail));
    }
}

#[test]
fn unbroken_paragraph_splits_at_or_before_the_target() {
    let para = "x".repeat(3000);
    let c = chunker();
    let chunks = c.chunk_text(&para);
    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= c.chunk_size());
    }
    // 1500 + 1500 + 400-char remainder, each seeded with the 200-char tail.
    assert_eq!(chunks[2].chars().count(), 3000 - 2 * 1300);
}

#[test]
fn chunk_order_follows_text_order() {
    let text: String = (0..40).map(sentence).collect::<Vec<_>>().join("\n\n");
    let chunks = chunker().chunk_text(&text);
    let mut last_seen = None;
    for chunk in &chunks {
        // Only complete 4-digit markers count; the overlap seam may
        // truncate the first one.
        let first_marker = chunk
            .split_whitespace()
            .filter(|w| w.len() == 4 && w.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|w| w.parse::<u32>().ok())
            .next()
            .expect("marker in chunk");
        if let Some(prev) = last_seen {
            assert!(first_marker >= prev);
        }
        last_seen = Some(first_marker);
    }
}

#[test]
fn multibyte_text_is_measured_in_characters() {
    // 2-byte characters; byte-based arithmetic would overflow the target.
    let para = "é".repeat(900);
    let text = format!("{para}\n\n{para}");
    let c = TextChunker::new(1000, 100).expect("valid config");
    let chunks = c.chunk_text(&text);
    assert_eq!(chunks.len(), 2);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 1000 + 100 + 1);
    }
}
