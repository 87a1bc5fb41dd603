//! Integration tests for huffpack

use std::fs;
use std::io::Cursor;

use huffpack::bit_stream::{BitInput, BitOutput};
use huffpack::codebook::{Codebook, FrequencyTable};
use huffpack::codebook_codec::{read_codebook, write_codebook};
use huffpack::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn roundtrip(files: &[(&str, &[u8])]) -> Vec<ArchiveEntry> {
    let archiver = Archiver::default();
    let archive = archiver.archive_to_vec(files).unwrap();
    archiver.unarchive_to_memory(&archive).unwrap()
}

#[test]
fn test_full_lifecycle_on_disk() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();

    let a = src.path().join("notes.txt");
    let b = src.path().join("empty.bin");
    fs::write(&a, b"the quick brown fox jumps over the lazy dog".repeat(50)).unwrap();
    fs::write(&b, b"").unwrap();
    let archive_path = src.path().join("bundle.huf");

    let archiver = Archiver::default();
    let written = archiver.archive_files(&archive_path, &[a.clone(), b.clone()]).unwrap();
    assert_eq!(written.entries.len(), 2);
    assert!(written.ratio() < 1.0);

    let extractor = Archiver::new(ArchiveConfig {
        output_dir: dst.path().to_path_buf(),
        ..ArchiveConfig::default()
    });
    let read = extractor.unarchive_file(&archive_path).unwrap();
    assert_eq!(read, written);

    assert_eq!(fs::read(dst.path().join("notes.txt")).unwrap(), fs::read(&a).unwrap());
    assert_eq!(fs::read(dst.path().join("empty.bin")).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_abab_scenario() {
    let entries = roundtrip(&[("/tmp/nested/abab", b"ABAB")]);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, b"abab");
    assert_eq!(entries[0].contents, b"ABAB");
}

#[test]
fn test_two_file_scenario() {
    let entries = roundtrip(&[("a.txt", b"X"), ("b.txt", b"")]);
    assert_eq!(
        entries,
        vec![
            ArchiveEntry {
                name: "a.txt".into(),
                contents: b"X".to_vec(),
            },
            ArchiveEntry {
                name: "b.txt".into(),
                contents: Vec::new(),
            },
        ]
    );
}

#[test]
fn test_random_archives_roundtrip() {
    let mut rng = StdRng::seed_from_u64(42);
    for round in 0..20 {
        let count = rng.gen_range(1..5);
        let files: Vec<(String, Vec<u8>)> = (0..count)
            .map(|i| {
                let spread = rng.gen_range(1..=255u8);
                let len = rng.gen_range(0..3000);
                let data = (0..len).map(|_| rng.gen_range(0..=spread)).collect();
                (format!("dir{round}/file-{i}.dat"), data)
            })
            .collect();
        let borrowed: Vec<(&str, &[u8])> = files
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();

        let entries = roundtrip(&borrowed);
        assert_eq!(entries.len(), files.len());
        for (entry, (name, data)) in entries.iter().zip(&files) {
            assert_eq!(entry.name, name.rsplit('/').next().unwrap().as_bytes());
            assert_eq!(&entry.contents, data);
        }
    }
}

#[test]
fn test_binary_and_repeated_data() {
    let all_bytes: Vec<u8> = (0..=255).cycle().take(2000).collect();
    let zeros = vec![0u8; 100_000];
    let entries = roundtrip(&[("all.bin", &all_bytes[..]), ("zeros.bin", &zeros[..])]);
    assert_eq!(entries[0].contents, all_bytes);
    assert_eq!(entries[1].contents, zeros);
}

#[test]
fn test_utf8_filename() {
    let entries = roundtrip(&[("données/résumé.txt", b"ok")]);
    assert_eq!(entries[0].name, "résumé.txt".as_bytes());
}

#[test]
fn test_latin1_filename() {
    let archiver = Archiver::default();
    let mut inputs = vec![
        ArchiveInput::new(&b"/tmp/r\xe9sum\xe9.txt"[..], Cursor::new(&b"ABAB"[..])),
        ArchiveInput::new(&b"na\xefve"[..], Cursor::new(&b""[..])),
    ];
    let mut archive = Vec::new();
    archiver.archive(&mut archive, &mut inputs).unwrap();

    let entries = archiver.unarchive_to_memory(&archive).unwrap();
    assert_eq!(entries[0].name, b"r\xe9sum\xe9.txt");
    assert_eq!(entries[0].contents, b"ABAB");
    assert_eq!(entries[1].name, b"na\xefve");
    assert!(entries[1].contents.is_empty());
}

#[test]
fn test_truncated_archive_fails() {
    let archiver = Archiver::default();
    let archive = archiver
        .archive_to_vec(&[("a.txt", b"hello hello"), ("b.txt", b"world")])
        .unwrap();
    for cut in [1, 3, archive.len() / 2, archive.len() - 1] {
        let result = archiver.unarchive_to_memory(&archive[..cut]);
        assert!(
            matches!(
                result,
                Err(ArchiveError::UnexpectedEndOfInput) | Err(ArchiveError::MalformedArchive(_))
            ),
            "cut at {cut} gave {result:?}"
        );
    }
}

#[test]
fn test_refuses_to_overwrite_when_configured() {
    let dst = tempfile::tempdir().unwrap();
    fs::write(dst.path().join("keep.txt"), b"original").unwrap();

    let archiver = Archiver::default();
    let archive = archiver.archive_to_vec(&[("keep.txt", b"replacement")]).unwrap();

    let mut sink = DirectorySink::new(dst.path()).overwrite_existing(false);
    let result = archiver.unarchive(&archive[..], &mut sink);
    assert!(matches!(result, Err(ArchiveError::FileOpenFailure { .. })));
    assert_eq!(fs::read(dst.path().join("keep.txt")).unwrap(), b"original");

    let mut sink = DirectorySink::new(dst.path());
    archiver.unarchive(&archive[..], &mut sink).unwrap();
    assert_eq!(sink.created(), &[dst.path().join("keep.txt")]);
    assert_eq!(fs::read(dst.path().join("keep.txt")).unwrap(), b"replacement");
}

#[test]
fn test_path_traversal_rejected() {
    // Hand-built record whose stored name is "../x".
    let name = b"../x";
    let mut table = FrequencyTable::with_sentinels();
    table.count_bytes(name);
    let book = Codebook::build(&table).unwrap();

    let mut out = BitOutput::new(Vec::new());
    write_codebook(&book, &mut out).unwrap();
    for &b in name.iter() {
        let code = book.get(b.into()).unwrap();
        out.put(code.bits, code.length as u32).unwrap();
    }
    for sentinel in [symbol::FILENAME_END, symbol::ARCHIVE_END] {
        let code = book.get(sentinel).unwrap();
        out.put(code.bits, code.length as u32).unwrap();
    }
    let archive = out.finish().unwrap();

    // The record itself is well formed...
    let entries = Archiver::default().unarchive_to_memory(&archive).unwrap();
    assert_eq!(entries[0].name, b"../x");

    // ...but a directory sink will not write outside its root.
    let dst = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dst.path().join("inner"));
    let result = Archiver::default().unarchive(&archive[..], &mut sink);
    assert!(matches!(result, Err(ArchiveError::MalformedArchive(_))));
    assert!(!dst.path().join("x").exists());
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("out.huf");
    let missing = dir.path().join("does-not-exist");
    let result = Archiver::default().archive_files(&archive_path, &[missing]);
    assert!(matches!(result, Err(ArchiveError::FileOpenFailure { .. })));
    assert!(!archive_path.exists());
}

#[test]
fn test_codebook_serialization_through_public_api() {
    let mut table = FrequencyTable::with_sentinels();
    table.count_bytes(b"abracadabra");
    let book = Codebook::build(&table).unwrap();
    assert!(book.is_prefix_free());

    let mut out = BitOutput::new(Cursor::new(Vec::new()));
    write_codebook(&book, &mut out).unwrap();
    let bytes = out.finish().unwrap().into_inner();
    let decoded = read_codebook(&mut BitInput::new(&bytes[..])).unwrap();
    assert_eq!(decoded, book);
}
