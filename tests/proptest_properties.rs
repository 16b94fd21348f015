//! Property-based tests using proptest
//!
//! Partitioning, name sanitization, token mapping and inventory assembly
//! checked against randomized inputs.

use cloudsweep::discovery::partition;
use cloudsweep::gcp::auth::validate_project_id;
use cloudsweep::mapper::{gcp_type_token, singular_pascal, split_token};
use cloudsweep::model::{sanitize_display_name, CanonicalRecord, Inventory, TypeDescriptor};
use proptest::prelude::*;
use std::collections::HashSet;
use std::num::NonZeroUsize;

fn arb_catalog() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,12}-[a-z]{1,12}", 0..60)
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #[test]
    fn partition_covers_every_item_once(items in arb_catalog(), shards in 1usize..16) {
        let split = partition(items.clone(), NonZeroUsize::new(shards).unwrap());
        prop_assert_eq!(split.len(), shards);

        let flattened: Vec<String> = split.iter().flatten().cloned().collect();
        prop_assert_eq!(flattened.len(), items.len());

        let unique: HashSet<&String> = flattened.iter().collect();
        prop_assert_eq!(unique.len(), items.len());
        prop_assert_eq!(unique, items.iter().collect::<HashSet<_>>());
    }

    #[test]
    fn partition_is_balanced(count in 0usize..200, shards in 1usize..16) {
        let split = partition(0..count, NonZeroUsize::new(shards).unwrap());
        let largest = split.iter().map(Vec::len).max().unwrap_or(0);
        let smallest = split.iter().map(Vec::len).min().unwrap_or(0);
        prop_assert!(largest - smallest <= 1);
    }

    #[test]
    fn sanitize_keeps_only_allowed_characters(raw in "\\PC{0,64}") {
        let clean = sanitize_display_name(&raw);
        prop_assert!(clean.chars().all(|c| c.is_ascii_alphanumeric() || c == ' '));

        let expected: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
            .collect();
        prop_assert_eq!(clean, expected);
    }

    #[test]
    fn sanitize_is_idempotent(raw in "\\PC{0,64}") {
        let once = sanitize_display_name(&raw);
        prop_assert_eq!(sanitize_display_name(&once), once.clone());
    }

    #[test]
    fn gcp_tokens_are_stable_and_well_formed(
        service in "[a-z]{2,12}",
        version in "v[1-3](beta[1-2])?",
        collection in "[a-z][a-zA-Z]{1,20}",
    ) {
        let namespace = format!("{}/{}", service, version);
        let descriptor = TypeDescriptor::new("k", &namespace, &collection, "k");

        let first = gcp_type_token(&descriptor).unwrap();
        let second = gcp_type_token(&descriptor).unwrap();
        prop_assert_eq!(&first, &second);

        let (package, module, kind) = split_token(&first).unwrap();
        prop_assert_eq!(package, "google-native");
        prop_assert_eq!(module, namespace.as_str());
        prop_assert_eq!(kind, singular_pascal(&collection));
        prop_assert!(kind.chars().next().unwrap().is_ascii_uppercase());
    }

    #[test]
    fn accepted_project_ids_are_well_formed(project in "[a-z0-9-]{0,40}") {
        if validate_project_id(&project) {
            prop_assert!(project.len() >= 6 && project.len() <= 30);
            prop_assert!(project.starts_with(|c: char| c.is_ascii_lowercase()));
            prop_assert!(!project.ends_with('-'));
        }
    }

    #[test]
    fn deduplicated_inventory_validates(ids in prop::collection::vec("[a-z]{1,6}", 0..50)) {
        let mut seen = HashSet::new();
        let mut inventory = Inventory::new();
        for id in &ids {
            let record = CanonicalRecord::new("fake:mod:Thing", id, id, None);
            if seen.insert(record.key()) {
                inventory.push(record);
            }
        }
        prop_assert!(inventory.validate().is_ok());
        prop_assert_eq!(inventory.len(), ids.iter().collect::<HashSet<_>>().len());
    }
}
