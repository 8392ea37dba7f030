use super::*;

#[test]
fn own_annotation_wins() {
    let tree = SlideTree::from_annotations(&[Some("left"), None]);
    assert_eq!(
        tree.resolve_style(SlideId(0)),
        StyleTag::Tagged("left".to_string())
    );
    assert_eq!(tree.resolve_style(SlideId(1)), StyleTag::None);
}

#[test]
fn nested_slides_inherit_from_the_nearest_annotated_ancestor() {
    let tree = SlideTree::new();
    let section = tree.add_slide(None, Some("right"));
    let group = tree.add_slide(Some(section), None);
    let leaf = tree.add_slide(Some(group), None);
    let override_leaf = tree.add_slide(Some(group), Some("small"));

    assert_eq!(tree.resolve_style(leaf), StyleTag::Tagged("right".into()));
    assert_eq!(
        tree.resolve_style(override_leaf),
        StyleTag::Tagged("small".into())
    );
}

#[test]
fn sentinel_values_stop_inheritance() {
    let tree = SlideTree::new();
    let section = tree.add_slide(None, Some("left"));
    let blank = tree.add_slide(Some(section), Some("blank"));
    let off = tree.add_slide(Some(section), Some("false"));
    let below_blank = tree.add_slide(Some(blank), None);

    assert_eq!(tree.resolve_style(blank), StyleTag::None);
    assert_eq!(tree.resolve_style(off), StyleTag::None);
    assert_eq!(tree.resolve_style(below_blank), StyleTag::None);
}

#[test]
fn repeated_resolution_walks_the_chain_once() {
    let tree = SlideTree::new();
    let section = tree.add_slide(None, Some("left"));
    let group = tree.add_slide(Some(section), None);
    let leaf = tree.add_slide(Some(group), None);

    assert_eq!(tree.cached_style(leaf), None);
    let first = tree.resolve_style(leaf);
    let second = tree.resolve_style(leaf);
    assert_eq!(first, second);
    assert_eq!(tree.ancestor_walks(), 1);

    // The walk cached every node it passed through.
    assert_eq!(tree.cached_style(group), Some(first.clone()));
    tree.resolve_style(group);
    assert_eq!(tree.ancestor_walks(), 1);
}

#[test]
fn annotation_updates_invalidate_descendants() {
    let tree = SlideTree::new();
    let section = tree.add_slide(None, Some("left"));
    let leaf = tree.add_slide(Some(section), None);
    let sibling_root = tree.add_slide(None, Some("top"));

    assert_eq!(tree.resolve_style(leaf), StyleTag::Tagged("left".into()));
    tree.resolve_style(sibling_root);

    tree.set_annotation(section, Some("right"));
    assert_eq!(tree.cached_style(leaf), None);
    assert!(tree.cached_style(sibling_root).is_some());
    assert_eq!(tree.resolve_style(leaf), StyleTag::Tagged("right".into()));

    tree.set_annotation(section, None);
    assert_eq!(tree.resolve_style(leaf), StyleTag::None);
}

#[test]
fn unknown_slides_resolve_to_none() {
    let tree = SlideTree::from_annotations(&[Some("left")]);
    assert_eq!(tree.resolve_style(SlideId(7)), StyleTag::None);
    assert_eq!(tree.ancestor_walks(), 0);
    assert_eq!(tree.len(), 1);
}
