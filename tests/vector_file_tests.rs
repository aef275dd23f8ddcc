//! Integration tests for file-backed vectors

use mmvec::vector::{VecHeader, HEADER_SIZE, MODE_CLOSED, MODE_HEAP};
use mmvec::{Access, Config, IdValue, MmvecError, Vector, VectorConfig};
use std::fs;
use tempfile::tempdir;

fn header_of(path: &std::path::Path) -> VecHeader {
    VecHeader::unpack(&fs::read(path).unwrap())
}

#[test]
fn test_create_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.vec");

    let v = Vector::<u32>::open(&path, Access::Write).unwrap();
    assert!(v.is_empty());
    assert!(v.is_writable());
    assert_ne!(v.mode(), MODE_CLOSED);
    assert_ne!(v.mode(), MODE_HEAP);
    assert_eq!(v.path(), Some(path.as_path()));
    v.release().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64);
    let header = header_of(&path);
    assert_eq!(header.count, 0);
    assert_eq!(header.esize, 4);
    assert_eq!(header.mode, MODE_CLOSED);
}

#[test]
fn test_grow_close_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("grow.vec");

    let mut v = Vector::<u64>::open(&path, Access::Write).unwrap();
    for i in 0..1000u64 {
        v = v.append(i * 3).unwrap();
    }
    assert_eq!(v.capacity(), 1024);
    v.release().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 8 + 1024 * 8);

    let v = Vector::<u64>::open(&path, Access::ReadOnly).unwrap();
    assert_eq!(v.len(), 1000);
    assert_eq!(v.mode(), MODE_CLOSED);
    assert!(!v.is_writable());
    assert!(v.iter().enumerate().all(|(i, &x)| x == i as u64 * 3));
}

#[test]
fn test_open_while_writer_is_live_reports_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("live.vec");

    let v = Vector::<u32>::open(&path, Access::Write).unwrap();
    let v = v.append(1).unwrap();
    v.flush().unwrap();

    let err = Vector::<u32>::open(&path, Access::ReadOnly).unwrap_err();
    assert!(matches!(err, MmvecError::Corrupted { what: "mode field", .. }));
    assert!(format!("{}", err).contains("live.vec"));
    drop(v);

    let v = Vector::<u32>::open(&path, Access::ReadOnly).unwrap();
    assert_eq!(v.as_slice(), &[1]);
}

#[test]
fn test_length_mismatch_is_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("padded.vec");
    Vector::<u16>::new(3).unwrap().persist(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0, 0]);
    fs::write(&path, &bytes).unwrap();

    let err = Vector::<u16>::open(&path, Access::Append).unwrap_err();
    match err {
        MmvecError::Corrupted { what, expected, actual, .. } => {
            assert_eq!(what, "file length");
            assert_eq!(expected, 8 + 6);
            assert_eq!(actual, 8 + 8);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_element_size_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("u8.vec");
    Vector::<u8>::new(4).unwrap().persist(&path).unwrap();

    let err = Vector::<u32>::open(&path, Access::ReadOnly).unwrap_err();
    assert_eq!(err.category(), "data");
}

#[test]
fn test_append_requires_existing_file() {
    let dir = tempdir().unwrap();
    let err = Vector::<u32>::open(dir.path().join("missing.vec"), Access::Append).unwrap_err();
    match err {
        MmvecError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_write_does_not_truncate_existing_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keep.vec");

    let v = Vector::<i32>::open(&path, Access::Write).unwrap();
    v.append_many(&[-5, 6, -7]).unwrap().release().unwrap();

    let v = Vector::<i32>::open(&path, Access::Write).unwrap();
    assert_eq!(v.as_slice(), &[-5, 6, -7]);
    let v = v.append(8).unwrap();
    v.release().unwrap();

    let v = Vector::<i32>::open(&path, Access::Append).unwrap();
    assert_eq!(v.as_slice(), &[-5, 6, -7, 8]);
}

#[test]
fn test_shrunk_exact_vector_truncates_file_on_release() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exact.vec");
    Vector::<u32>::new(10).unwrap().persist(&path).unwrap();

    let v = Vector::<u32>::open(&path, Access::Append).unwrap();
    assert_eq!(v.capacity(), 10);
    let v = v.resize(4).unwrap();
    assert_eq!(v.capacity(), 4);
    v.release().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 8 + 16);
    let v = Vector::<u32>::open(&path, Access::ReadOnly).unwrap();
    assert_eq!(v.len(), 4);
}

#[test]
fn test_persisted_file_opens_mapped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.vec");

    let records = [IdValue::new(1, 0.25), IdValue::new(4, 1.5), IdValue::new(9, -2.0)];
    let v = Vector::<IdValue>::new(0).unwrap().append_many(&records).unwrap();
    v.persist(&path).unwrap();

    let mapped = Vector::<IdValue>::open(&path, Access::ReadOnly).unwrap();
    assert_eq!(mapped.as_slice(), &records);
    assert_eq!(mapped.find(4).map(|r| r.value), Some(1.5));
    assert_eq!(mapped.lower_bound(5), 2);

    let copy = mapped.copy().unwrap();
    assert!(copy.is_writable());
    assert_eq!(copy.as_slice(), &records);
}

#[test]
fn test_file_resize_zero_fills() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("zero.vec");

    let mut v = Vector::<u8>::open(&path, Access::Write).unwrap().resize(3).unwrap();
    v.as_mut_slice().copy_from_slice(&[9, 9, 9]);
    let v = v.resize(1).unwrap().resize(4).unwrap();
    // within capacity only the count changes
    assert_eq!(v.as_slice(), &[9, 9, 9, 0]);
    let v = v.resize(100).unwrap();
    assert!(v.as_slice()[4..].iter().all(|&b| b == 0));
}

#[test]
fn test_config_populate_and_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.vec");
    let config = VectorConfig {
        populate_pages: true,
        flush_on_release: true,
    };
    assert!(config.validate().is_ok());

    let v = Vector::<u32>::open_with_config(&path, Access::Write, &config).unwrap();
    let v = v.append_many(&[1, 2, 3, 4, 5]).unwrap();
    v.release().unwrap();

    let v = Vector::<u32>::open_with_config(&path, Access::ReadOnly, &VectorConfig::read_mostly()).unwrap();
    assert_eq!(v.len(), 5);
}

#[test]
fn test_restore_file_vector_to_heap() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("restore.vec");
    Vector::<u32>::open(&path, Access::Write)
        .unwrap()
        .append_many(&[1, 2, 3])
        .unwrap()
        .release()
        .unwrap();

    let v = Vector::<u32>::restore(&path).unwrap();
    assert_eq!(v.mode(), MODE_HEAP);
    assert_eq!(v.as_slice(), &[1, 2, 3]);
    let v = v.append(4).unwrap();
    assert_eq!(v.len(), 4);
    // the file is untouched
    assert_eq!(header_of(&path).count, 3);
}

#[test]
#[should_panic(expected = "cannot resize")]
fn test_resize_read_only_panics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ro.vec");
    Vector::<u32>::new(2).unwrap().persist(&path).unwrap();
    let v = Vector::<u32>::open(&path, Access::ReadOnly).unwrap();
    let _ = v.append(3);
}

#[test]
#[should_panic(expected = "cannot modify")]
fn test_mutate_read_only_panics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ro2.vec");
    Vector::<u32>::new(2).unwrap().persist(&path).unwrap();
    let mut v = Vector::<u32>::open(&path, Access::ReadOnly).unwrap();
    v[0] = 1;
}
