//! Property-based tests for create idempotence and pagination coverage.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

mod common;

use accounts_lifecycle::PageRequest;
use common::Harness;
use proptest::prelude::*;
use std::collections::HashSet;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,15}".prop_map(|s| s.trim().to_string())
}

fn description() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z ]{0,20}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn second_create_never_overwrites(
        id in "[a-z0-9-]{1,12}",
        first_name in name(),
        first_description in description(),
        second_name in name(),
        second_description in description(),
    ) {
        let (first, second, stored) = runtime().block_on(async {
            let h = Harness::new();
            let first = h
                .manager
                .create(&id, &first_name, first_description.as_deref())
                .await
                .expect("create");
            let second = h
                .manager
                .create(&id, &second_name, second_description.as_deref())
                .await
                .expect("create");
            let stored = h.manager.get(&id).await.expect("get");
            (first, second, stored)
        });

        prop_assert!(first.created);
        prop_assert!(!second.created);
        prop_assert_eq!(&stored.name, &first_name);
        prop_assert_eq!(
            stored.description,
            first_description.filter(|d| !d.is_empty())
        );
        prop_assert_eq!(second.account, first.account);
    }

    #[test]
    fn paging_visits_every_account_once(total in 0usize..30, page_size in 1i64..10) {
        let (seen, pages) = runtime().block_on(async {
            let h = Harness::new();
            for i in 0..total {
                h.manager
                    .create(&format!("acct-{i}"), "Paged", None)
                    .await
                    .expect("create");
            }

            let mut seen = Vec::new();
            let mut pages = 0usize;
            let mut token: Option<String> = None;
            loop {
                let page = h
                    .manager
                    .list(None, false, PageRequest::new(page_size, token.as_deref()))
                    .await
                    .expect("list");
                pages += 1;
                assert_eq!(page.total_count, total as u64);
                seen.extend(page.accounts.into_iter().map(|a| a.account_id));
                match page.next_page_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
            (seen, pages)
        });

        let unique: HashSet<_> = seen.iter().collect();
        prop_assert_eq!(seen.len(), total);
        prop_assert_eq!(unique.len(), total);

        let size = usize::try_from(page_size).expect("positive");
        prop_assert_eq!(pages, total.div_ceil(size).max(1));
    }
}
