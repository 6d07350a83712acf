use std::sync::Arc;

use ocrhl::breaks::OcrFormat;
use ocrhl::io::{FileReader, FileWriter};
use ocrhl::page_index::{Dimensions, Features, PageIndexReader, PageRecord};
use ocrhl::snippet::SnippetLocator;
use ocrhl::source::{SourceReader, SourceReaderOptions, SourceResolver};
use ocrhl::{build_page_records, write_page_index};
use ocrhl_testkit::{
    data_gen::{Dialect, DocShape, GeneratedDoc, generate},
    temp,
};

const DIALECTS: [Dialect; 3] = [Dialect::Alto, Dialect::Hocr, Dialect::MiniOcr];

fn format_of(dialect: Dialect) -> OcrFormat {
    match dialect {
        Dialect::Alto => OcrFormat::Alto,
        Dialect::Hocr => OcrFormat::Hocr,
        Dialect::MiniOcr => OcrFormat::MiniOcr,
    }
}

fn memory_reader(doc: &GeneratedDoc, section_size: usize) -> SourceReader {
    SourceReader::from_reader(
        "doc",
        Arc::new(doc.bytes.clone()),
        SourceReaderOptions::default().with_section_size(section_size),
    )
    .unwrap()
}

fn expected_records(doc: &GeneratedDoc) -> Vec<Option<PageRecord>> {
    doc.pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let end = doc.pages.get(i + 1).map_or(doc.len(), |next| next.start);
            let (width, height) = page.dimensions.unwrap();
            Some(PageRecord {
                id: Some(page.id.clone()),
                start_offset: page.start as u32,
                end_offset: Some(end as u32),
                dimensions: Some(Dimensions::new(width, height)),
            })
        })
        .collect()
}

#[test]
fn test_page_records_from_markup() {
    for dialect in DIALECTS {
        let doc = generate(dialect, &DocShape::default());
        for section_size in [64, 4096] {
            let reader = memory_reader(&doc, section_size);
            let records = build_page_records(&reader, format_of(dialect)).unwrap();
            assert_eq!(records, expected_records(&doc), "{dialect:?} at {section_size}");
        }
    }
}

#[test]
fn test_page_index_file_locates_every_word() {
    for dialect in DIALECTS {
        let doc = generate(dialect, &DocShape::default());
        let source = temp::write_doc(&doc).unwrap();
        let reader = SourceResolver::default()
            .open_path(source.path())
            .unwrap();
        assert_eq!(OcrFormat::detect(&reader).unwrap(), Some(format_of(dialect)));

        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("doc.idx");
        let mut out = FileWriter::create(&index_path).unwrap();
        let pages = write_page_index(&reader, format_of(dialect), &mut out).unwrap();
        assert_eq!(pages, doc.pages.len());

        let index = PageIndexReader::open_requiring(
            Arc::new(FileReader::open(&index_path).unwrap()),
            Features::ALL,
        )
        .unwrap();
        assert_eq!(index.num_pages(), doc.pages.len());
        for word in &doc.words {
            let (number, record) = index.locate(word.start).unwrap().unwrap();
            assert_eq!(number, word.page);
            assert_eq!(record.id.as_deref(), Some(doc.pages[word.page - 1].id.as_str()));
        }
        assert_eq!(index.locate_page(doc.pages[0].start - 1).unwrap(), None);
    }
}

#[test]
fn test_snippets_stay_within_block() {
    let shape = DocShape::default();
    let mut rng = fastrand::Rng::with_seed(7);
    for dialect in DIALECTS {
        let doc = generate(dialect, &shape);
        let format = format_of(dialect);
        let reader = memory_reader(&doc, 256);

        let mut index_bytes = Vec::new();
        write_page_index(&reader, format, &mut index_bytes).unwrap();
        let index = PageIndexReader::open(Arc::new(index_bytes)).unwrap();

        let plain = SnippetLocator::new(&reader, format).with_context_size(5);
        let indexed = SnippetLocator::new(&reader, format)
            .with_context_size(5)
            .with_page_index(&index);

        for _ in 0..20 {
            let block = rng.usize(0..doc.blocks.len());
            let block_lines = &doc.lines[block * shape.lines_per_block..][..shape.lines_per_block];
            // a word on the sixth line has five full lines on either side
            let line = &block_lines[5];
            let word = doc
                .words
                .iter()
                .find(|w| w.start > line.start && w.end < line.end)
                .unwrap();
            let text = word.text.as_deref().unwrap();
            let at = word.start + doc.as_str()[word.start as usize..].find(text).unwrap() as u64;

            let snippet = plain.locate(at..at + text.len() as u64).unwrap();
            assert_eq!(snippet.range.start, block_lines[0].start, "{dialect:?}");
            assert_eq!(snippet.range.end, block_lines[11].start, "{dialect:?}");
            let lines_inside = doc
                .lines
                .iter()
                .filter(|l| snippet.range.contains(&l.start))
                .count();
            assert_eq!(lines_inside, 11);
            assert!(
                !doc.blocks
                    .iter()
                    .any(|b| b.start > snippet.range.start && snippet.range.contains(&b.start))
            );
            assert_eq!(
                snippet.text,
                doc.as_str()[snippet.range.start as usize..snippet.range.end as usize]
            );

            let with_index = indexed.locate(at..at + text.len() as u64).unwrap();
            assert_eq!(with_index, snippet);
            assert_eq!(
                snippet.page.unwrap().id.as_deref(),
                Some(doc.pages[word.page - 1].id.as_str())
            );
        }
    }
}

#[test]
fn test_snippet_across_split_files() {
    let doc = generate(Dialect::Hocr, &DocShape::default());
    let parts = temp::write_split(&doc.bytes, 4).unwrap();
    let pointer = parts
        .iter()
        .map(|p| p.path().display().to_string())
        .collect::<Vec<_>>()
        .join("+");
    let resolver = SourceResolver::default()
        .with_options(SourceReaderOptions::default().with_section_size(128));
    let reader = resolver.open_str(&pointer).unwrap();
    assert_eq!(reader.len(), doc.len());

    let locator = SnippetLocator::new(&reader, OcrFormat::Hocr);
    let word = &doc.words[doc.words.len() / 2];
    let snippet = locator.locate(word.start..word.end).unwrap();
    assert!(snippet.range.start <= word.start && word.end <= snippet.range.end);
    assert_eq!(
        snippet.text,
        doc.as_str()[snippet.range.start as usize..snippet.range.end as usize]
    );
    assert_eq!(snippet.page.unwrap().start_offset as u64, doc.pages[word.page - 1].start);
}
