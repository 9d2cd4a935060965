//! Registry Module Tests
//!
//! ## Test Scopes
//! - **Contract**: add/lookup/list semantics, run against both backends.
//! - **Concurrency**: parallel writers on distinct keys lose nothing; readers never
//!   see a half-applied add.
//! - **Records**: wire line formatting and parsing.

#[cfg(test)]
mod tests {
    use crate::protocol::{DocumentId, PeerAddress};
    use crate::registry::{DocumentRecord, FileIndex, Index, IndexRegistry, format_records};
    use std::sync::Arc;

    fn record(id: u32, title: &str, host: &str, port: u16) -> DocumentRecord {
        DocumentRecord::new(DocumentId(id), title, PeerAddress::new(host, port))
    }

    fn file_index() -> (tempfile::TempDir, FileIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = FileIndex::open(dir.path().join("offline_index.json")).unwrap();
        (dir, index)
    }

    // ============================================================
    // SHARED CONTRACT
    // ============================================================

    fn check_add_returns_confirmation(index: &dyn Index) {
        let confirmation = index
            .add(record(123, "A Proferred Official ICP", "thishost.csc.ncsu.edu", 5678))
            .unwrap();
        assert_eq!(
            confirmation,
            "RFC 123 A Proferred Official ICP thishost.csc.ncsu.edu 5678"
        );
    }

    fn check_lookup_preserves_registration_order(index: &dyn Index) {
        index.add(record(3457, "Doc", "peerA", 6001)).unwrap();
        index.add(record(3457, "Doc", "peerB", 6002)).unwrap();
        index.add(record(1, "Other", "peerA", 6001)).unwrap();

        let found = index.lookup(DocumentId(3457)).unwrap();
        let hosts: Vec<&str> = found.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["peerA", "peerB"]);
    }

    fn check_lookup_miss_is_empty(index: &dyn Index) {
        index.add(record(1, "One", "h", 1)).unwrap();
        assert!(index.lookup(DocumentId(99)).unwrap().is_empty());
    }

    fn check_readd_overwrites_title_in_place(index: &dyn Index) {
        index.add(record(5, "First", "peerA", 6001)).unwrap();
        index.add(record(5, "Second", "peerB", 6002)).unwrap();
        index.add(record(5, "Renamed", "peerA", 6001)).unwrap();

        let found = index.lookup(DocumentId(5)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], record(5, "Renamed", "peerA", 6001));
        assert_eq!(found[1], record(5, "Second", "peerB", 6002));
    }

    fn check_same_host_different_port_is_distinct(index: &dyn Index) {
        index.add(record(5, "Doc", "peer", 6001)).unwrap();
        index.add(record(5, "Doc", "peer", 6002)).unwrap();
        assert_eq!(index.lookup(DocumentId(5)).unwrap().len(), 2);
    }

    fn check_list_all_orders_by_id_then_insertion(index: &dyn Index) {
        index.add(record(2, "Two", "peerB", 2)).unwrap();
        index.add(record(1, "One", "peerA", 1)).unwrap();
        index.add(record(2, "Two", "peerA", 1)).unwrap();
        index.add(record(1, "One again", "peerA", 1)).unwrap();

        let all = index.list_all().unwrap();
        assert_eq!(
            all,
            vec![
                record(1, "One again", "peerA", 1),
                record(2, "Two", "peerB", 2),
                record(2, "Two", "peerA", 1),
            ]
        );
    }

    fn run_contract(make: impl Fn() -> (Option<tempfile::TempDir>, Box<dyn Index>)) {
        let checks: [fn(&dyn Index); 6] = [
            check_add_returns_confirmation,
            check_lookup_preserves_registration_order,
            check_lookup_miss_is_empty,
            check_readd_overwrites_title_in_place,
            check_same_host_different_port_is_distinct,
            check_list_all_orders_by_id_then_insertion,
        ];
        for check in checks {
            let (_guard, index) = make();
            check(index.as_ref());
        }
    }

    #[test]
    fn test_memory_registry_contract() {
        run_contract(|| (None, Box::new(IndexRegistry::default()) as Box<dyn Index>));
    }

    #[test]
    fn test_file_index_contract() {
        run_contract(|| {
            let (dir, index) = file_index();
            (Some(dir), Box::new(index) as Box<dyn Index>)
        });
    }

    // ============================================================
    // IN-MEMORY REGISTRY
    // ============================================================

    #[test]
    fn test_registry_starts_empty() {
        let registry = IndexRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn test_registry_len_counts_distinct_keys() {
        let registry = IndexRegistry::new();
        registry.add(record(1, "A", "h", 1));
        registry.add(record(1, "B", "h", 1));
        registry.add(record(1, "A", "h", 2));
        registry.add(record(2, "A", "h", 1));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_concurrent_adds_on_distinct_keys_all_persist() {
        let registry = IndexRegistry::new();
        let workers = 64;

        std::thread::scope(|scope| {
            for i in 0..workers {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    registry.add(record(
                        (i % 4) + 1,
                        "Concurrent",
                        &format!("peer-{}", i),
                        6000 + i as u16,
                    ));
                });
            }
        });

        assert_eq!(registry.len(), workers as usize);
        assert_eq!(registry.list_all().len(), workers as usize);
    }

    #[test]
    fn test_readers_never_observe_partial_state() {
        let registry = IndexRegistry::new();
        let rounds = 500;

        std::thread::scope(|scope| {
            let writer = Arc::clone(&registry);
            scope.spawn(move || {
                for i in 0..rounds {
                    writer.add(record(7, &format!("title-{}", i), "peer", 1));
                    writer.add(record(7, "x", &format!("peer-{}", i), 2));
                }
            });

            let reader = Arc::clone(&registry);
            scope.spawn(move || {
                let mut last_len = 0;
                for _ in 0..rounds {
                    let records = reader.lookup(DocumentId(7));
                    // Grows monotonically, never has duplicate keys.
                    assert!(records.len() >= last_len);
                    last_len = records.len();
                    for (i, a) in records.iter().enumerate() {
                        for b in &records[i + 1..] {
                            assert!(!a.same_key(b));
                        }
                    }
                }
            });
        });

        assert_eq!(registry.lookup(DocumentId(7)).len(), rounds + 1);
    }

    // ============================================================
    // FILE INDEX
    // ============================================================

    #[test]
    fn test_file_index_shared_between_handles() {
        let (_dir, index) = file_index();
        let other = FileIndex::open(index.path()).unwrap();

        index.add(record(10, "Shared", "peerA", 6001)).unwrap();
        assert_eq!(other.lookup(DocumentId(10)).unwrap().len(), 1);
    }

    #[test]
    fn test_file_index_concurrent_writers() {
        let (_dir, index) = file_index();
        let workers = 16u16;

        std::thread::scope(|scope| {
            for i in 0..workers {
                let index = index.clone();
                scope.spawn(move || {
                    index
                        .add(record(1, "Doc", &format!("peer-{}", i), 6000 + i))
                        .unwrap();
                });
            }
        });

        assert_eq!(index.list_all().unwrap().len(), workers as usize);
    }

    #[test]
    fn test_file_index_recovers_from_corrupted_file() {
        let (_dir, index) = file_index();
        std::fs::write(index.path(), "{not json").unwrap();

        assert!(index.list_all().unwrap().is_empty());
        index.add(record(1, "Fresh", "h", 1)).unwrap();
        assert_eq!(index.list_all().unwrap().len(), 1);
    }

    // ============================================================
    // RECORD FORMAT
    // ============================================================

    #[test]
    fn test_file_index_releases_lock_after_each_operation() {
        use fs2::FileExt;

        let (_dir, index) = file_index();
        index.add(record(1, "One", "peerA", 6001)).unwrap();
        index.lookup(DocumentId(1)).unwrap();

        let file = std::fs::File::open(index.path()).unwrap();
        FileExt::try_lock_exclusive(&file).unwrap();
        FileExt::unlock(&file).unwrap();

        assert_eq!(index.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_line_with_multiword_title() {
        let parsed =
            DocumentRecord::parse_line("RFC 123 A Proferred Official ICP thishost.csc.ncsu.edu 5678")
                .unwrap();
        assert_eq!(
            parsed,
            record(123, "A Proferred Official ICP", "thishost.csc.ncsu.edu", 5678)
        );
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        assert!(DocumentRecord::parse_line("").is_none());
        assert!(DocumentRecord::parse_line("RFC x T h 1").is_none());
        assert!(DocumentRecord::parse_line("DOC 1 T h 1").is_none());
        assert!(DocumentRecord::parse_line("RFC 1 T h port").is_none());
    }

    #[test]
    fn test_format_records_joins_with_crlf() {
        let body = format_records(&[record(1, "One", "a", 1), record(2, "Two", "b", 2)]);
        assert_eq!(body, "RFC 1 One a 1\r\nRFC 2 Two b 2");
        assert_eq!(format_records(&[]), "");
    }
}
