//! Tests for the decode engine

use super::*;
use crate::common::{Error, SafetyLimitKind};
use crate::dialect::{Dialect, EmptyCellPolicy, EscapeMode, Terminator};
use crate::io::{CharSource, ReaderSource};
use std::cell::Cell;
use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::rc::Rc;

type Rows = Vec<Vec<Option<String>>>;

fn rows(expected: &[&[Option<&str>]]) -> Rows {
    expected
        .iter()
        .map(|row| row.iter().map(|v| v.map(str::to_owned)).collect())
        .collect()
}

fn decode(input: &str, dialect: Dialect) -> Rows {
    decode_with_capacity(input, dialect, DEFAULT_BUFFER_CAPACITY)
}

fn decode_with_capacity(input: &str, dialect: Dialect, capacity: usize) -> Rows {
    let source = crate::io::StrSource::new(input);
    let mut reader = DecodeEngine::with_buffer_capacity(source, dialect, capacity).unwrap();
    reader.records().collect::<crate::Result<Rows>>().unwrap()
}

fn raw_records(input: &str, dialect: Dialect, capacity: usize) -> Vec<String> {
    let source = crate::io::StrSource::new(input);
    let dialect = dialect.with_capture_raw_record(true);
    let mut reader = DecodeEngine::with_buffer_capacity(source, dialect, capacity).unwrap();
    let mut raw = Vec::new();
    while reader.read_record().unwrap() {
        raw.push(reader.raw_record().unwrap().unwrap().to_string());
    }
    raw
}

/// Source replaying scripted reads, recording whether it was closed.
struct ScriptedSource {
    reads: VecDeque<io::Result<Vec<char>>>,
    closed: Rc<Cell<bool>>,
}

impl ScriptedSource {
    fn new(reads: Vec<io::Result<&str>>) -> (Self, Rc<Cell<bool>>) {
        let closed = Rc::new(Cell::new(false));
        let reads = reads
            .into_iter()
            .map(|r| r.map(|s| s.chars().collect()))
            .collect();
        (
            ScriptedSource {
                reads,
                closed: Rc::clone(&closed),
            },
            closed,
        )
    }
}

impl CharSource for ScriptedSource {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        match self.reads.pop_front() {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(Some(n))
            },
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed.set(true);
        Ok(())
    }
}

/// Source that never runs out, counting how often it was read.
struct EndlessSource {
    fill: char,
    reads: Rc<Cell<usize>>,
}

impl CharSource for EndlessSource {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        self.reads.set(self.reads.get() + 1);
        buf.fill(self.fill);
        Ok(Some(buf.len()))
    }
}

#[test]
fn test_qualified_field_with_delimiter() {
    let result = decode("\"a,b\",c", Dialect::default());
    assert_eq!(result, rows(&[&[Some("a,b"), Some("c")]]));
}

#[test]
fn test_qualified_field_with_terminator() {
    let result = decode("\"a\r\nb\"\r\nnext", Dialect::default());
    assert_eq!(result, rows(&[&[Some("a\r\nb")], &[Some("next")]]));
}

#[test]
fn test_simple_records() {
    let result = decode("1,2,3\r\n4,5,6\r\n", Dialect::default());
    assert_eq!(
        result,
        rows(&[
            &[Some("1"), Some("2"), Some("3")],
            &[Some("4"), Some("5"), Some("6")],
        ])
    );
}

#[test]
fn test_doubled_qualifier() {
    let result = decode("\"Mac \"\"The Knife\"\" Peter\",x", Dialect::default());
    assert_eq!(result, rows(&[&[Some("Mac \"The Knife\" Peter"), Some("x")]]));
}

#[test]
fn test_trailing_junk_after_closing_qualifier() {
    let result = decode("\"Mac \"The Knife\" Peter\",x", Dialect::default());
    assert_eq!(result, rows(&[&[Some("Mac "), Some("x")]]));

    let result = decode("\" Chicane\"  junk here  ,y\r\nz", Dialect::default());
    assert_eq!(result, rows(&[&[Some(" Chicane"), Some("y")], &[Some("z")]]));
}

#[test]
fn test_unterminated_qualifier_runs_to_end() {
    let result = decode("a,\"bc,d\r\ne", Dialect::default());
    assert_eq!(result, rows(&[&[Some("a"), Some("bc,d\r\ne")]]));
}

#[test]
fn test_qualifier_inside_unqualified_field_is_data() {
    let result = decode("ab\"c,d", Dialect::default());
    assert_eq!(result, rows(&[&[Some("ab\"c"), Some("d")]]));
}

#[test]
fn test_qualifier_disabled() {
    let dialect = Dialect::default().without_qualifier();
    let result = decode("\"a,b\"", dialect);
    assert_eq!(result, rows(&[&[Some("\"a"), Some("b\"")]]));
}

#[test]
fn test_skip_empty_records() {
    let input = "a\r\n\r\n\r\nb";
    assert_eq!(decode(input, Dialect::default()), rows(&[&[Some("a")], &[Some("b")]]));

    let keep = Dialect::default().with_skip_empty_records(false);
    assert_eq!(
        decode(input, keep),
        rows(&[&[Some("a")], &[None], &[None], &[Some("b")]])
    );
}

#[test]
fn test_only_blank_lines() {
    assert!(decode("\r\n\r\n", Dialect::default()).is_empty());
    assert_eq!(
        decode("\r\n\r\n", Dialect::default().with_skip_empty_records(false)).len(),
        2
    );
}

#[test]
fn test_empty_cell_policy() {
    let input = ",\"\",x";
    let dialect = Dialect::default();

    assert_eq!(decode(input, dialect), rows(&[&[None, Some(""), Some("x")]]));

    let always_null = dialect.with_empty_cell_policy(EmptyCellPolicy::AlwaysNull);
    assert_eq!(decode(input, always_null), rows(&[&[None, None, Some("x")]]));

    let always_empty = dialect.with_empty_cell_policy(EmptyCellPolicy::AlwaysEmpty);
    assert_eq!(
        decode(input, always_empty),
        rows(&[&[Some(""), Some(""), Some("x")]])
    );
}

#[test]
fn test_trailing_delimiter_adds_field() {
    assert_eq!(decode("a,", Dialect::default()), rows(&[&[Some("a"), None]]));
    assert_eq!(decode("a,\r\n", Dialect::default()), rows(&[&[Some("a"), None]]));
    assert_eq!(decode(",", Dialect::default()), rows(&[&[None, None]]));
}

#[test]
fn test_lone_terminator_characters_are_data() {
    let result = decode("a\rb,c\r\nd\ne", Dialect::default());
    assert_eq!(result, rows(&[&[Some("a\rb"), Some("c")], &[Some("d\ne")]]));
}

#[test]
fn test_lone_head_at_field_start() {
    let result = decode("\rx,\r\r\n\r", Dialect::default());
    assert_eq!(result, rows(&[&[Some("\rx"), Some("\r")], &[Some("\r")]]));
}

#[test]
fn test_single_character_terminator() {
    let dialect = Dialect::default().with_terminator(Terminator::LF);
    let result = decode("a,b\nc\r\n\n", dialect);
    assert_eq!(result, rows(&[&[Some("a"), Some("b")], &[Some("c\r")]]));

    let semicolon = Dialect::default().with_terminator(Terminator::Single(';'));
    let result = decode("1,2;3;\"4;5\"", semicolon);
    assert_eq!(
        result,
        rows(&[&[Some("1"), Some("2")], &[Some("3")], &[Some("4;5")]])
    );
}

#[test]
fn test_trim_whitespace() {
    let dialect = Dialect::default().with_trim_whitespace(true);
    let result = decode("  a  ,\t b\t,  \" c \"  \r\n", dialect);
    assert_eq!(result, rows(&[&[Some("a"), Some("b"), Some(" c ")]]));

    let untrimmed = decode("  a  ,\t b\t", Dialect::default());
    assert_eq!(untrimmed, rows(&[&[Some("  a  "), Some("\t b\t")]]));
}

#[test]
fn test_whitespace_only_record_with_trim() {
    let dialect = Dialect::default()
        .with_trim_whitespace(true)
        .with_empty_cell_policy(EmptyCellPolicy::AlwaysEmpty)
        .with_capture_raw_record(true);
    let mut reader = DecodeEngine::from_text(" ", dialect).unwrap();

    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field_count().unwrap(), 1);
    assert_eq!(reader.field(0).unwrap(), Some(""));
    assert_eq!(reader.raw_record().unwrap(), Some(" "));
}

#[test]
fn test_comments() {
    let dialect = Dialect::default().with_comments(true);
    let input = "#comment, with \"stuff\r\na,b\r\n#x,y\r\nc,#d";
    assert_eq!(
        decode(input, dialect),
        rows(&[&[Some("a"), Some("b")], &[Some("c"), Some("#d")]])
    );

    assert_eq!(
        decode("#x", Dialect::default()),
        rows(&[&[Some("#x")]])
    );

    let semicolon = dialect.with_comment(';');
    assert_eq!(decode(";skip\r\nkeep", semicolon), rows(&[&[Some("keep")]]));
}

#[test]
fn test_backslash_escapes() {
    let dialect = Dialect::default().with_escape_mode(EscapeMode::Backslash);
    let input = "\"\\n\\r\\t\\b\\f\\e\\v\\a\\z\\101\\o101\\d065\\x41\\u0041\"";
    let expected = "\n\r\t\u{8}\u{c}\u{1b}\u{b}\u{7}zAAAAA";
    assert_eq!(decode(input, dialect), rows(&[&[Some(expected)]]));

    let unqualified = dialect.without_qualifier();
    let input = "\\n\\r\\t\\b\\f\\e\\v\\a\\z\\101\\o101\\d065\\x41\\u0041";
    assert_eq!(decode(input, unqualified), rows(&[&[Some(expected)]]));
}

#[test]
fn test_numeric_escapes_decode_to_same_char() {
    let dialect = Dialect::unix();
    let result = decode("\\x41,\\101,\\d065,\\u0041,\\X41,\\O101,\\D065,\\U0041", dialect);
    assert_eq!(result, rows(&[&[Some("A"); 8]]));
}

#[test]
fn test_hex_and_unicode_escapes() {
    let dialect = Dialect::unix();
    let result = decode("\\xfa\\u0afa", dialect);
    assert_eq!(result, rows(&[&[Some("\u{fa}\u{afa}")]]));
}

#[test]
fn test_backslash_escaped_structure() {
    let dialect = Dialect::unix();
    let result = decode("\"a\\\"b\",c\\,d\\\\e\\\nf\ng", dialect);
    assert_eq!(
        result,
        rows(&[&[Some("a\"b"), Some("c,d\\e\nf")], &[Some("g")]])
    );
}

#[test]
fn test_doubled_qualifier_ignored_in_backslash_mode() {
    let dialect = Dialect::unix();
    let result = decode("\"a\"\"b\",c", dialect);
    assert_eq!(result, rows(&[&[Some("a"), Some("c")]]));
}

#[test]
fn test_backslash_is_data_in_doubled_mode() {
    let result = decode("\"a\\\",b\\n", Dialect::default());
    assert_eq!(result, rows(&[&[Some("a\\"), Some("b\\n")]]));
}

#[test]
fn test_unfinished_escape_at_end_is_dropped() {
    let dialect = Dialect::unix();
    assert_eq!(decode("ab\\", dialect), rows(&[&[Some("ab")]]));
    assert_eq!(decode("ab\\x4", dialect), rows(&[&[Some("ab")]]));
}

#[test]
fn test_results_do_not_depend_on_buffer_size() {
    let cases = [
        ("\"a,b\",c\r\n\"x\r\ny\"\r\n\r\nlast,", Dialect::default()),
        ("a\r\n\r\nb\rc\r\n\r", Dialect::default().with_skip_empty_records(false)),
        ("\"Mac \"The Knife\" Peter\",x\r\n\" q \" \r\nz", Dialect::default()),
        ("  a  , \"b\" ,c \r\n", Dialect::default().with_trim_whitespace(true)),
        ("#c\r\na,#b\r\n#d\r\ne", Dialect::default().with_comments(true)),
        ("\\x41\\u0041,\"\\\"q\\101\"\n\\\n\nend", Dialect::unix()),
        ("a;b\n;\n", Dialect::unix().with_delimiter(';')),
    ];

    for (input, dialect) in cases {
        let expected = decode(input, dialect);
        let expected_raw = raw_records(input, dialect, DEFAULT_BUFFER_CAPACITY);
        for capacity in 1..=7 {
            assert_eq!(
                decode_with_capacity(input, dialect, capacity),
                expected,
                "input {input:?} at capacity {capacity}"
            );
            assert_eq!(
                raw_records(input, dialect, capacity),
                expected_raw,
                "raw of {input:?} at capacity {capacity}"
            );
        }
    }
}

#[test]
fn test_field_spanning_many_refills() {
    let long = "x".repeat(5000);
    let input = format!("{long},\"{long}\"\r\n{long}");
    let result = decode_with_capacity(&input, Dialect::default(), 16);
    assert_eq!(
        result,
        vec![
            vec![Some(long.clone()), Some(long.clone())],
            vec![Some(long.clone())],
        ]
    );
}

#[test]
fn test_field_count_ceiling() {
    let at_limit = (0..1000).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    let result = decode(&at_limit, Dialect::default());
    assert_eq!(result[0].len(), 1000);

    let over_limit = (0..1001).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    let mut reader = DecodeEngine::from_text(format!("a\r\n{over_limit}"), Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());

    let err = reader.read_record().unwrap_err();
    assert!(matches!(
        err,
        Error::SafetyLimitExceeded {
            kind: SafetyLimitKind::FieldCount,
            limit: 1000,
            record: 1,
        }
    ));
    assert!(err.is_fatal());
    assert!(reader.is_closed());
    assert!(matches!(reader.read_record(), Err(Error::Closed)));

    let unlimited = Dialect::default().with_safety_limit(false);
    assert_eq!(decode(&over_limit, unlimited)[0].len(), 1001);
}

#[test]
fn test_field_length_ceiling() {
    let at_limit = "x".repeat(100_000);
    assert_eq!(decode(&at_limit, Dialect::default())[0][0].as_deref(), Some(at_limit.as_str()));

    let over_limit = "x".repeat(100_001);
    let mut reader = DecodeEngine::from_text(over_limit.clone(), Dialect::default()).unwrap();
    assert!(matches!(
        reader.read_record(),
        Err(Error::SafetyLimitExceeded {
            kind: SafetyLimitKind::FieldLength,
            limit: 100_000,
            record: 0,
        })
    ));
    assert!(reader.is_closed());

    let short = Dialect::default().with_max_field_length(3);
    assert_eq!(decode("abc,\"d,e\"", short), rows(&[&[Some("abc"), Some("d,e")]]));
    let mut reader = DecodeEngine::from_text("abcd", short).unwrap();
    assert!(reader.read_record().is_err());

    let unlimited = Dialect::default().with_safety_limit(false);
    assert_eq!(decode(&over_limit, unlimited)[0][0].as_ref().map(String::len), Some(100_001));
}

#[test]
fn test_runaway_field_stops_early_when_trimming() {
    for trim in [false, true] {
        let reads = Rc::new(Cell::new(0));
        let source = EndlessSource {
            fill: 'a',
            reads: Rc::clone(&reads),
        };
        let dialect = Dialect::default()
            .with_trim_whitespace(trim)
            .with_max_field_length(100);
        let mut reader = DecodeEngine::with_buffer_capacity(source, dialect, 16).unwrap();
        assert!(matches!(
            reader.read_record(),
            Err(Error::SafetyLimitExceeded {
                kind: SafetyLimitKind::FieldLength,
                limit: 100,
                record: 0,
            })
        ));
        assert!(reads.get() < 20, "trim={trim}: {} reads", reads.get());
    }
}

#[test]
fn test_trailing_blanks_do_not_count_toward_field_length() {
    let dialect = Dialect::default()
        .with_trim_whitespace(true)
        .with_max_field_length(3);
    let input = format!("ab{},c", " ".repeat(40));
    for capacity in [1, 4, 7] {
        assert_eq!(
            decode_with_capacity(&input, dialect, capacity),
            rows(&[&[Some("ab"), Some("c")]])
        );
    }

    // Quoted fields keep their blanks
    let quoted = format!("\"ab{}\"", " ".repeat(40));
    let mut reader = DecodeEngine::with_buffer_capacity(crate::io::StrSource::new(quoted), dialect, 4).unwrap();
    assert!(reader.read_record().is_err());
}

#[test]
fn test_raw_record() {
    let dialect = Dialect::default()
        .with_comments(true)
        .with_capture_raw_record(true);
    let input = "a,\"b\r\nc\"\r\n\r\n# note\r\n  d , e";
    let mut reader = DecodeEngine::from_text(input, dialect).unwrap();

    assert!(reader.read_record().unwrap());
    assert_eq!(reader.raw_record().unwrap(), Some("a,\"b\r\nc\""));

    assert!(reader.read_record().unwrap());
    assert_eq!(reader.raw_record().unwrap(), Some("  d , e"));

    assert!(!reader.read_record().unwrap());
    assert_eq!(reader.raw_record().unwrap(), Some(""));
}

#[test]
fn test_raw_record_disabled() {
    let mut reader = DecodeEngine::from_text("a,b", Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.raw_record().unwrap(), None);
}

#[test]
fn test_raw_records_rebuild_input() {
    let dialect = Dialect::default().with_skip_empty_records(false);
    let input = "a,\"b\r\n,c\"\" \" junk\r\n\r\n\rx\r,\r\n\"unterminated\r\n";
    for capacity in [1, 2, 3, 5, 64] {
        let raw = raw_records(input, dialect, capacity);
        assert_eq!(raw.join("\r\n"), input, "capacity {capacity}");
    }
}

#[test]
fn test_headers() {
    let input = "id,name,city\r\n7,Ada,London\r\n8,Grace,\r\n";
    let mut reader = DecodeEngine::from_text(input, Dialect::default()).unwrap();

    assert!(reader.read_headers().unwrap());
    assert_eq!(reader.header_count().unwrap(), 3);
    assert_eq!(reader.header(1).unwrap(), Some("name"));
    assert_eq!(reader.header(3).unwrap(), None);
    assert_eq!(reader.index_of("city").unwrap(), Some(2));
    assert_eq!(reader.index_of("missing").unwrap(), None);
    assert_eq!(reader.current_record().unwrap(), None);

    assert!(reader.read_record().unwrap());
    assert_eq!(reader.current_record().unwrap(), Some(0));
    assert_eq!(reader.field_by_name("name").unwrap(), reader.field(1).unwrap());
    assert_eq!(reader.field_by_name("name").unwrap(), Some("Ada"));
    assert_eq!(reader.field_by_name("missing").unwrap(), None);

    assert!(reader.read_record().unwrap());
    assert_eq!(reader.current_record().unwrap(), Some(1));
    assert_eq!(reader.field_by_name("city").unwrap(), None);
    assert_eq!(reader.record().unwrap().index(), Some(1));
}

#[test]
fn test_duplicate_headers_leave_index_empty() {
    let mut reader = DecodeEngine::from_text("a,b,a\r\n1,2,3", Dialect::default()).unwrap();

    let err = reader.read_headers().unwrap_err();
    assert!(matches!(err, Error::DuplicateHeader(ref name) if name == "a"));
    assert!(!err.is_fatal());
    assert_eq!(reader.header_count().unwrap(), 0);
    assert_eq!(reader.index_of("b").unwrap(), None);

    // The engine stays usable and the header record was not counted
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.current_record().unwrap(), Some(0));
    assert_eq!(reader.field(2).unwrap(), Some("3"));
}

#[test]
fn test_set_headers() {
    let mut reader = DecodeEngine::from_text("1,2", Dialect::default()).unwrap();
    reader.set_headers(["x", "y"]).unwrap();
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field_by_name("y").unwrap(), Some("2"));

    assert!(reader.set_headers(["x", "x"]).is_err());
    assert!(reader.headers().unwrap().is_empty());
}

#[test]
fn test_skip_record_honors_qualifiers() {
    let input = "\"x\r\ny\",1\r\n2\r\n";
    let mut reader = DecodeEngine::from_text(input, Dialect::default()).unwrap();

    assert!(reader.skip_record().unwrap());
    assert_eq!(reader.field_count().unwrap(), 0);
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field(0).unwrap(), Some("2"));
    assert_eq!(reader.current_record().unwrap(), Some(0));
    assert!(!reader.skip_record().unwrap());
}

#[test]
fn test_skip_line_ignores_qualifiers() {
    let input = "\"x\ny\"\r\nz";
    let mut reader = DecodeEngine::from_text(input, Dialect::default()).unwrap();

    assert!(reader.skip_line().unwrap());
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field(0).unwrap(), Some("y\""));
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field(0).unwrap(), Some("z"));
    assert!(!reader.skip_line().unwrap());
}

#[test]
fn test_read_after_end_keeps_returning_false() {
    let mut reader = DecodeEngine::from_text("a", Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());
    assert!(!reader.read_record().unwrap());
    assert!(!reader.read_record().unwrap());
    assert_eq!(reader.field_count().unwrap(), 0);
}

#[test]
fn test_empty_input() {
    let dialect = Dialect::default().with_capture_raw_record(true);
    let mut reader = DecodeEngine::from_text("", dialect).unwrap();
    assert!(!reader.read_record().unwrap());
    assert_eq!(reader.raw_record().unwrap(), Some(""));
}

#[test]
fn test_out_of_range_and_qualified_flags() {
    let mut reader = DecodeEngine::from_text("\"a\",b", Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());

    assert!(reader.is_qualified(0).unwrap());
    assert!(!reader.is_qualified(1).unwrap());
    assert!(!reader.is_qualified(2).unwrap());
    assert_eq!(reader.field(5).unwrap(), None);

    let always_empty = Dialect::default().with_empty_cell_policy(EmptyCellPolicy::AlwaysEmpty);
    reader.set_dialect(always_empty).unwrap();
    assert_eq!(reader.field(5).unwrap(), Some(""));
}

#[test]
fn test_set_dialect_between_records() {
    let mut reader = DecodeEngine::from_text("a,b\r\nc;d\r\n", Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field_count().unwrap(), 2);

    reader.set_dialect(Dialect::default().with_delimiter(';')).unwrap();
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field(1).unwrap(), Some("d"));

    let invalid = Dialect::default().with_delimiter('"');
    assert!(matches!(reader.set_dialect(invalid), Err(Error::Configuration(_))));
    assert_eq!(reader.dialect().delimiter, ';');
}

#[test]
fn test_close_is_idempotent() {
    let (source, closed) = ScriptedSource::new(vec![Ok("a,b\r\n")]);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());

    reader.close().unwrap();
    assert!(closed.get());
    reader.close().unwrap();

    assert!(matches!(reader.read_record(), Err(Error::Closed)));
    assert!(matches!(reader.field(0), Err(Error::Closed)));
    assert!(matches!(reader.raw_record(), Err(Error::Closed)));
    assert!(matches!(reader.headers(), Err(Error::Closed)));
    assert!(matches!(reader.skip_line(), Err(Error::Closed)));
}

#[test]
fn test_close_with_leaves_source_open() {
    let (source, closed) = ScriptedSource::new(vec![Ok("a")]);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();
    reader.close_with(false).unwrap();
    assert!(!closed.get());
    assert!(reader.is_closed());

    let (source, closed) = ScriptedSource::new(vec![Ok("a")]);
    drop(DecodeEngine::new(source, Dialect::default()).unwrap());
    assert!(!closed.get());
}

#[test]
fn test_into_inner_returns_open_source() {
    let (source, closed) = ScriptedSource::new(vec![Ok("a,b\r\n"), Ok("c,d\r\n")]);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());

    let mut source = reader.into_inner().unwrap();
    assert!(!closed.get());
    let mut buf = ['\0'; 8];
    assert_eq!(source.read_chars(&mut buf).unwrap(), Some(5));
    assert_eq!(&buf[..5], &['c', ',', 'd', '\r', '\n']);

    let (source, _) = ScriptedSource::new(vec![]);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();
    reader.close().unwrap();
    assert!(matches!(reader.into_inner(), Err(Error::Closed)));
}

#[test]
fn test_borrowed_source_survives_engine() {
    let mut source = crate::io::StrSource::new("a\r\nb");
    {
        let mut reader = DecodeEngine::with_buffer_capacity(&mut source, Dialect::default(), 3).unwrap();
        assert!(reader.read_record().unwrap());
    }
    assert_eq!(source.remaining(), "b");
}

#[test]
fn test_io_error_is_fatal() {
    let failure = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
    let (source, closed) = ScriptedSource::new(vec![Ok("a,b\r\n"), Err(failure)]);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();

    assert!(reader.read_record().unwrap());
    let err = reader.read_record().unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    assert!(closed.get());
    assert!(matches!(reader.read_record(), Err(Error::Closed)));
}

#[test]
fn test_empty_reads_are_not_end_of_stream() {
    let (source, _) = ScriptedSource::new(vec![Ok("a,"), Ok(""), Ok("b\r"), Ok(""), Ok("\nc")]);
    let mut reader = DecodeEngine::with_buffer_capacity(source, Dialect::default(), 4).unwrap();
    let result = reader.records().collect::<crate::Result<Rows>>().unwrap();
    assert_eq!(result, rows(&[&[Some("a"), Some("b")], &[Some("c")]]));
}

#[test]
fn test_records_iterator_stops_after_error() {
    let failure = io::Error::other("boom");
    let (source, _) = ScriptedSource::new(vec![Ok("1\r\n2\r\n"), Err(failure)]);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();

    let mut records = reader.records();
    assert_eq!(records.next().unwrap().unwrap(), vec![Some("1".to_string())]);
    assert_eq!(records.next().unwrap().unwrap(), vec![Some("2".to_string())]);
    assert!(matches!(records.next(), Some(Err(Error::Io(_)))));
    assert!(records.next().is_none());
}

#[test]
fn test_invalid_configuration() {
    let source = crate::io::StrSource::new("a");
    assert!(matches!(
        DecodeEngine::with_buffer_capacity(source, Dialect::default(), 0),
        Err(Error::Configuration(_))
    ));

    let invalid = Dialect::default().with_qualifier(',');
    assert!(matches!(
        DecodeEngine::from_text("a", invalid),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_from_reader_with_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("name,city\r\nZoë,Malmö\r\n".as_bytes());
    let mut reader =
        DecodeEngine::from_reader(Cursor::new(bytes), encoding_rs::UTF_8, Dialect::default()).unwrap();

    assert!(reader.read_headers().unwrap());
    assert_eq!(reader.header(0).unwrap(), Some("name"));
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field_by_name("city").unwrap(), Some("Malmö"));
}

#[test]
fn test_reader_source_in_legacy_encoding() {
    let source = ReaderSource::with_encoding(Cursor::new(vec![0xE9, b',', b'x']), encoding_rs::WINDOWS_1252);
    let mut reader = DecodeEngine::new(source, Dialect::default()).unwrap();
    assert!(reader.read_record().unwrap());
    assert_eq!(reader.field(0).unwrap(), Some("é"));
}
