use std::sync::{
    atomic::{AtomicUsize, Ordering},
    PoisonError, RwLock,
};

use shared::domain::{SlideId, StyleTag};
use tracing::warn;

pub trait SlideStyleResolver: Send + Sync {
    fn resolve_style(&self, slide: SlideId) -> StyleTag;
}

struct SlideNode {
    parent: Option<SlideId>,
    children: Vec<SlideId>,
    annotation: Option<String>,
    resolved: Option<StyleTag>,
}

/// Arena of slide nodes with parent links.
///
/// A node's style is the annotation of the nearest annotated node on its
/// ancestor chain (itself included). Resolved values are cached on every
/// node the walk passes through.
#[derive(Default)]
pub struct SlideTree {
    nodes: RwLock<Vec<SlideNode>>,
    walks: AtomicUsize,
}

impl SlideTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a flat deck: one top-level slide per entry, in order.
    pub fn from_annotations<S: AsRef<str>>(annotations: &[Option<S>]) -> Self {
        let tree = Self::new();
        for annotation in annotations {
            let annotation: Option<&str> = annotation.as_ref().map(|value| value.as_ref());
            tree.add_slide(None, annotation);
        }
        tree
    }

    pub fn add_slide(&self, parent: Option<SlideId>, annotation: Option<&str>) -> SlideId {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let id = SlideId(nodes.len());
        let parent = parent.filter(|parent| parent.0 < nodes.len());
        if let Some(parent) = parent {
            nodes[parent.0].children.push(id);
        }
        nodes.push(SlideNode {
            parent,
            children: Vec::new(),
            annotation: annotation.map(str::to_string),
            resolved: None,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces a node's annotation and drops cached results for it and its
    /// descendants.
    pub fn set_annotation(&self, slide: SlideId, annotation: Option<&str>) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let Some(node) = nodes.get_mut(slide.0) else {
            warn!("slides: annotation update for unknown slide={}", slide.0);
            return;
        };
        node.annotation = annotation.map(str::to_string);

        let mut stack = vec![slide];
        while let Some(id) = stack.pop() {
            let node = &mut nodes[id.0];
            node.resolved = None;
            stack.extend(node.children.iter().copied());
        }
    }

    pub fn cached_style(&self, slide: SlideId) -> Option<StyleTag> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slide.0)
            .and_then(|node| node.resolved.clone())
    }

    /// Number of uncached ancestor walks performed so far.
    pub fn ancestor_walks(&self) -> usize {
        self.walks.load(Ordering::Relaxed)
    }
}

impl SlideStyleResolver for SlideTree {
    fn resolve_style(&self, slide: SlideId) -> StyleTag {
        if let Some(cached) = self.cached_style(slide) {
            return cached;
        }

        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if slide.0 >= nodes.len() {
            warn!("slides: style lookup for unknown slide={}", slide.0);
            return StyleTag::None;
        }
        // Another caller may have filled the cache between the two locks.
        if let Some(cached) = nodes[slide.0].resolved.clone() {
            return cached;
        }

        self.walks.fetch_add(1, Ordering::Relaxed);
        let mut visited = Vec::new();
        let mut cursor = Some(slide);
        let mut style = StyleTag::None;
        while let Some(id) = cursor {
            let node = &nodes[id.0];
            if let Some(cached) = &node.resolved {
                style = cached.clone();
                break;
            }
            visited.push(id);
            if let Some(annotation) = &node.annotation {
                style = StyleTag::from_annotation(annotation);
                break;
            }
            cursor = node.parent;
        }

        for id in visited {
            nodes[id.0].resolved = Some(style.clone());
        }
        style
    }
}

#[cfg(test)]
#[path = "tests/slide_style_tests.rs"]
mod tests;
