use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

impl NodeType {
    fn closer(self) -> u8 {
        match self {
            Self::Object => b'}',
            Self::Array => b']',
        }
    }
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all balanced JSON object/array structures in `text`. Coordinates are byte indices.
///
/// Brackets inside string literals are ignored; a closer that does not match the
/// innermost open structure discards that structure.
#[instrument(target = "topic_quiz::json", skip(text), fields(text_len = text.len()))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            match (escape, b) {
                (true, _) => escape = false,
                (false, b'\\') => escape = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            continue;
        }

        let kind = match b {
            b'"' => {
                in_string = true;
                continue;
            }
            b'{' | b'[' => {
                let kind = if b == b'{' { NodeType::Object } else { NodeType::Array };
                stack.push(Frame { start: i, kind, children: Vec::new() });
                continue;
            }
            b'}' => NodeType::Object,
            b']' => NodeType::Array,
            _ => continue,
        };

        let Some(frame) = stack.pop() else { continue };
        if frame.kind.closer() != kind.closer() {
            trace!(target: "topic_quiz::json", at = i, "unbalanced closer");
            continue;
        }

        let node = ObjCoords { start: frame.start, end: i, kind, children: frame.children };
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => results.push(node),
        }
    }

    debug!(target: "topic_quiz::json", count = results.len(), "found root structures");
    results
}

/// Parse a model payload as a list of `T`.
///
/// The whole text is tried first. Models without native structured output often wrap
/// the array in prose or a code fence, so on failure the first non-empty embedded JSON
/// array that deserializes is used instead. An empty array inside some other document
/// says nothing about the payload. When nothing matches, the error from parsing the
/// whole text is returned.
#[instrument(target = "topic_quiz::json", skip(text), fields(text_len = text.len()))]
pub fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, serde_json::Error> {
    let whole = match serde_json::from_str::<Vec<T>>(text.trim()) {
        Ok(items) => return Ok(items),
        Err(e) => e,
    };

    fn first_array<T: DeserializeOwned>(text: &str, node: &ObjCoords) -> Option<Vec<T>> {
        if node.kind == NodeType::Array {
            match serde_json::from_str::<Vec<T>>(node.slice(text)) {
                Ok(items) if !items.is_empty() => return Some(items),
                _ => {}
            }
        }
        node.children.iter().find_map(|child| first_array(text, child))
    }

    let found = find_json_structures(text)
        .iter()
        .find_map(|node| first_array::<T>(text, node));

    match found {
        Some(items) => {
            debug!(target: "topic_quiz::json", items = items.len(), "recovered embedded array");
            Ok(items)
        }
        None => Err(whole),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_structures_become_children() {
        let text = r#"x {"a":[1,{"b":2}]} y [3]"#;
        let roots = find_json_structures(text);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].kind, NodeType::Object);
        assert_eq!(roots[0].slice(text), r#"{"a":[1,{"b":2}]}"#);
        assert_eq!(roots[0].children.len(), 1);
        assert_eq!(roots[0].children[0].children.len(), 1);
        assert_eq!(roots[1].slice(text), "[3]");
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        let text = r#"{"s":"not ] a } closer \" still [ string"}"#;
        let roots = find_json_structures(text);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].end, text.len() - 1);
        assert!(roots[0].children.is_empty());
    }

    #[test]
    fn mismatched_closer_drops_structure() {
        let roots = find_json_structures("[1, 2} [4]");
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].start, 7);
    }
}
