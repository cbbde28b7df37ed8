use clusterctl::error::SelectionError;
use clusterctl::inventory::{BINARIES, CORE_SERVICES, default_clean_items};
use clusterctl::selection::{Selection, SelectionInput};

fn service_names(selection: &Selection) -> Vec<&str> {
    selection.services.iter().map(|s| s.name).collect()
}

#[test]
fn output_is_the_ordered_intersection_with_the_inventory() {
    let input = SelectionInput {
        services: vec![
            "indexd".into(),
            "metad".into(),
            "bogus".into(),
            "metad".into(),
        ],
        ..Default::default()
    };
    let selection = Selection::resolve(&input).unwrap();
    assert_eq!(service_names(&selection), vec!["metad", "indexd"]);
}

#[test]
fn empty_lists_select_full_service_and_binary_inventories_but_no_cleanup() {
    let selection = Selection::resolve(&SelectionInput::default()).unwrap();
    assert_eq!(selection.services.len(), CORE_SERVICES.len());
    assert_eq!(selection.binaries.len(), BINARIES.len());
    assert!(selection.clean_items.is_empty());
}

#[test]
fn all_with_extra_names_equals_all_alone() {
    let with_extra = Selection::resolve(&SelectionInput {
        clean: vec!["all".into(), "journal".into(), "bogus".into()],
        ..Default::default()
    })
    .unwrap();
    let alone = Selection::resolve(&SelectionInput {
        clean: vec!["all".into()],
        ..Default::default()
    })
    .unwrap();
    assert_eq!(with_extra.clean_items, alone.clean_items);
    assert_eq!(with_extra.clean_items, default_clean_items());
}

#[test]
fn exclusion_applies_to_the_default_full_selection() {
    let input = SelectionInput {
        exclude_services: vec!["gatewayd".into()],
        ..Default::default()
    };
    let selection = Selection::resolve(&input).unwrap();
    assert!(!service_names(&selection).contains(&"gatewayd"));
    assert_eq!(selection.services.len(), CORE_SERVICES.len() - 1);
}

#[test]
fn resolution_is_total_without_strict_mode() {
    let input = SelectionInput {
        services: vec!["no-such-service".into()],
        binaries: vec!["no-such-binary".into()],
        clean: vec!["no-such-item".into()],
        ..Default::default()
    };
    let selection = Selection::resolve(&input).unwrap();
    assert!(selection.services.is_empty());
    assert!(selection.binaries.is_empty());
    assert!(selection.clean_items.is_empty());
}

#[test]
fn strict_mode_turns_dropped_names_into_errors() {
    let input = SelectionInput {
        binaries: vec!["clustersh".into(), "no-such-binary".into()],
        strict: true,
        ..Default::default()
    };
    let SelectionError::UnknownNames { kind, names } =
        Selection::resolve(&input).unwrap_err();
    assert_eq!(kind, "binary");
    assert_eq!(names, vec!["no-such-binary".to_string()]);
}
