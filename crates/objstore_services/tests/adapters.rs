//! Behavior every built-in adapter must share.

use objstore_segment::{PartPolicy, SegmentErrorKind};
use objstore_services::{
    ErrorKind, MultipartUpload, ObjectMode, Registry, StorageConfig, Storager,
};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const MIN: u64 = 8;

/// A storager of each built-in type; the temp dir keeps fs data alive.
fn storagers() -> Vec<(Arc<dyn Storager>, Option<TempDir>)> {
    let registry = Registry::with_builtin();
    let policy = PartPolicy::new().min_size(MIN).max_size(64);

    let memory = registry
        .new_storager(
            "memory",
            &StorageConfig::new().name("bucket").part_policy(policy),
        )
        .unwrap();

    let dir = TempDir::new().unwrap();
    let fs = registry
        .new_storager(
            "fs",
            &StorageConfig::new()
                .work_dir(dir.path().to_string_lossy())
                .part_policy(policy),
        )
        .unwrap();

    vec![(memory, None), (fs, Some(dir))]
}

#[test]
fn write_stat_read_delete() {
    for (store, _dir) in storagers() {
        store.write("docs/readme", b"objstore").unwrap();

        let object = store.stat("docs/readme").unwrap();
        assert_eq!(object.mode, ObjectMode::Read);
        assert_eq!(object.content_length, Some(8));
        assert_eq!(&store.read("docs/readme").unwrap()[..], b"objstore");

        store.delete("docs/readme").unwrap();
        let err = store.stat("docs/readme").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ObjectNotExist, "{}", store.metadata());
    }
}

#[test]
fn multipart_in_any_order() {
    for (store, _dir) in storagers() {
        let upload = MultipartUpload::start(store.clone(), "big").unwrap();
        upload.write_part(3, b"tail").unwrap();
        upload.write_part(1, b"00000000").unwrap();
        upload.write_part(2, b"11111111").unwrap();

        let object = upload.complete().unwrap();
        assert_eq!(object.content_length, Some(20));
        assert_eq!(&store.read("big").unwrap()[..], b"0000000011111111tail");
    }
}

#[test]
fn multipart_from_many_threads() {
    for (store, _dir) in storagers() {
        let upload = Arc::new(MultipartUpload::start(store.clone(), "parallel").unwrap());
        let parts = 24u32;

        let handles: Vec<_> = (1..=parts)
            .map(|index| {
                let upload = Arc::clone(&upload);
                thread::spawn(move || {
                    let data = vec![index as u8; MIN as usize];
                    upload.write_part(index, &data).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(upload.is_fulfilled().unwrap());
        upload.complete().unwrap();

        let data = store.read("parallel").unwrap();
        assert_eq!(data.len(), parts as usize * MIN as usize);
        for (n, chunk) in data.chunks(MIN as usize).enumerate() {
            assert!(chunk.iter().all(|&b| b as usize == n + 1));
        }
    }
}

#[test]
fn conflicting_part_aborts_remote_upload() {
    for (store, _dir) in storagers() {
        let upload = MultipartUpload::start(store.clone(), "conflict").unwrap();
        upload.write_part(1, b"aaaaaaaa").unwrap();

        let err = upload.write_part(1, b"bbbbbbbbbb").unwrap_err();
        assert_eq!(
            err.as_segment().map(|e| e.kind()),
            Some(SegmentErrorKind::PartIntersected)
        );

        let multiparter = store.as_multiparter().unwrap();
        let err = multiparter.list_multipart(upload.object()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ObjectNotExist);
    }
}

#[test]
fn listed_parts_match_segment() {
    for (store, _dir) in storagers() {
        let upload = MultipartUpload::start(store.clone(), "listed").unwrap();
        let second = upload.write_part(2, b"22222222").unwrap();
        let first = upload.write_part(1, b"11111111").unwrap();

        let listed = store
            .as_multiparter()
            .unwrap()
            .list_multipart(upload.object())
            .unwrap();
        assert_eq!(listed, vec![first, second]);
        upload.abort().unwrap();
    }
}

#[test]
fn rewritten_part_aborts_remote_upload() {
    for (store, _dir) in storagers() {
        let upload = MultipartUpload::start(store.clone(), "rewritten").unwrap();
        upload.write_part(1, b"aaaaaaaa").unwrap();
        upload.write_part(1, b"aaaaaaaa").unwrap();

        let err = upload.write_part(1, b"bbbbbbbb").unwrap_err();
        assert_eq!(
            err.as_segment().map(|e| e.kind()),
            Some(SegmentErrorKind::PartIntersected),
            "{}",
            store.metadata()
        );

        let multiparter = store.as_multiparter().unwrap();
        let err = multiparter.list_multipart(upload.object()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ObjectNotExist);
        assert!(store.stat("rewritten").is_err());
    }
}

#[test]
fn failed_completion_keeps_existing_object() {
    for (store, _dir) in storagers() {
        store.write("kept", b"precious data").unwrap();

        let multiparter = store.as_multiparter().unwrap();
        let upload = multiparter.create_multipart("kept").unwrap();
        let first = multiparter.write_multipart(&upload, 1, b"abc").unwrap();
        multiparter.write_multipart(&upload, 2, b"defg").unwrap();

        let manifest = [first, objstore_segment::Part::new(2, 99)];
        let err = multiparter.complete_multipart(&upload, &manifest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected, "{}", store.metadata());
        assert_eq!(&store.read("kept").unwrap()[..], b"precious data");

        multiparter.abort_multipart(&upload).unwrap();
    }
}
