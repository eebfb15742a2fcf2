//! Rich-text edit operations in the Quill delta format.
//!
//! A [`Delta`] is both the full contents of a document (inserts only) and an
//! incremental change (inserts, retains, deletes). Changes are combined with
//! [`Delta::compose`], which is associative, so the order in which pending
//! edits get folded together never matters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) type AttributeMap = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Insert {
    Text(String),
    /// Image, video, formula... Always length 1.
    Embed(Value),
}

impl Insert {
    fn len(&self) -> usize {
        match self {
            Insert::Text(s) => utf16_len(s),
            Insert::Embed(_) => 1,
        }
    }

    fn slice(&self, start: usize, len: usize) -> Insert {
        match self {
            Insert::Text(s) => Insert::Text(slice_utf16(s, start, len)),
            Insert::Embed(v) => Insert::Embed(v.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOp", into = "RawOp")]
pub(crate) enum Op {
    Insert {
        insert: Insert,
        attributes: Option<AttributeMap>,
    },
    Retain {
        retain: usize,
        attributes: Option<AttributeMap>,
    },
    Delete {
        delete: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpKind {
    Insert,
    Retain,
    Delete,
}

impl Op {
    pub(crate) fn len(&self) -> usize {
        match self {
            Op::Insert { insert, .. } => insert.len(),
            Op::Retain { retain, .. } => *retain,
            Op::Delete { delete } => *delete,
        }
    }

    fn kind(&self) -> OpKind {
        match self {
            Op::Insert { .. } => OpKind::Insert,
            Op::Retain { .. } => OpKind::Retain,
            Op::Delete { .. } => OpKind::Delete,
        }
    }

    /// Merge `next` into `self` when both are the same kind with the same attributes.
    fn absorb(&mut self, next: &Op) -> bool {
        match (self, next) {
            (
                Op::Insert {
                    insert: Insert::Text(text),
                    attributes,
                },
                Op::Insert {
                    insert: Insert::Text(more),
                    attributes: next_attributes,
                },
            ) => {
                if *attributes != *next_attributes {
                    return false;
                }
                text.push_str(more);
                true
            }
            (
                Op::Retain { retain, attributes },
                Op::Retain {
                    retain: more,
                    attributes: next_attributes,
                },
            ) => {
                if *attributes != *next_attributes {
                    return false;
                }
                *retain += more;
                true
            }
            (Op::Delete { delete }, Op::Delete { delete: more }) => {
                *delete += more;
                true
            }
            _ => false,
        }
    }
}

/// Wire shape of one op: `{"insert": ..}`, `{"retain": n}` or `{"delete": n}`,
/// each with optional `attributes`.
#[derive(Serialize, Deserialize)]
struct RawOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retain: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delete: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributeMap>,
}

impl TryFrom<RawOp> for Op {
    type Error = String;

    fn try_from(raw: RawOp) -> Result<Self, Self::Error> {
        let attributes = raw.attributes.filter(|a| !a.is_empty());
        match (raw.insert, raw.retain, raw.delete) {
            (Some(Value::String(text)), None, None) => Ok(Op::Insert {
                insert: Insert::Text(text),
                attributes,
            }),
            (Some(embed @ Value::Object(_)), None, None) => Ok(Op::Insert {
                insert: Insert::Embed(embed),
                attributes,
            }),
            (None, Some(retain), None) => Ok(Op::Retain { retain, attributes }),
            (None, None, Some(delete)) => Ok(Op::Delete { delete }),
            _ => Err("delta op must have exactly one of insert, retain or delete".to_string()),
        }
    }
}

impl From<Op> for RawOp {
    fn from(op: Op) -> Self {
        match op {
            Op::Insert { insert, attributes } => RawOp {
                insert: Some(match insert {
                    Insert::Text(text) => Value::String(text),
                    Insert::Embed(v) => v,
                }),
                retain: None,
                delete: None,
                attributes,
            },
            Op::Retain { retain, attributes } => RawOp {
                insert: None,
                retain: Some(retain),
                delete: None,
                attributes,
            },
            Op::Delete { delete } => RawOp {
                insert: None,
                retain: None,
                delete: Some(delete),
                attributes: None,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Delta {
    #[serde(default)]
    pub ops: Vec<Op>,
}

impl Delta {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn insert(mut self, text: &str) -> Self {
        self.push(Op::Insert {
            insert: Insert::Text(text.to_string()),
            attributes: None,
        });
        self
    }

    #[cfg(test)]
    pub(crate) fn insert_with(mut self, text: &str, attributes: AttributeMap) -> Self {
        self.push(Op::Insert {
            insert: Insert::Text(text.to_string()),
            attributes: Some(attributes).filter(|a| !a.is_empty()),
        });
        self
    }

    #[cfg(test)]
    pub(crate) fn retain(mut self, n: usize) -> Self {
        self.push(Op::Retain {
            retain: n,
            attributes: None,
        });
        self
    }

    #[cfg(test)]
    pub(crate) fn retain_with(mut self, n: usize, attributes: AttributeMap) -> Self {
        self.push(Op::Retain {
            retain: n,
            attributes: Some(attributes).filter(|a| !a.is_empty()),
        });
        self
    }

    #[cfg(test)]
    pub(crate) fn delete(mut self, n: usize) -> Self {
        self.push(Op::Delete { delete: n });
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total length of all ops, in UTF-16 code units.
    #[cfg(test)]
    pub(crate) fn length(&self) -> usize {
        self.ops.iter().map(Op::len).sum()
    }

    /// Append an op, merging with the tail where possible.
    ///
    /// An insert pushed after a delete is placed before it; the two are
    /// equivalent and the canonical form keeps inserts first.
    pub(crate) fn push(&mut self, op: Op) {
        if op.len() == 0 {
            return;
        }

        let mut index = self.ops.len();
        if let Some(last) = self.ops.last_mut() {
            if last.kind() == OpKind::Delete {
                if op.kind() == OpKind::Delete {
                    last.absorb(&op);
                    return;
                }
                if op.kind() == OpKind::Insert {
                    index -= 1;
                    if index == 0 {
                        self.ops.insert(0, op);
                        return;
                    }
                }
            }
        }

        if index > 0 && self.ops[index - 1].absorb(&op) {
            return;
        }

        self.ops.insert(index, op);
    }

    fn chop(mut self) -> Self {
        if let Some(Op::Retain {
            attributes: None, ..
        }) = self.ops.last()
        {
            self.ops.pop();
        }
        self
    }

    /// Apply `other` on top of `self`, producing one delta with the effect of both.
    pub(crate) fn compose(&self, other: &Delta) -> Delta {
        let mut this = OpIter::new(&self.ops);
        let mut that = OpIter::new(&other.ops);
        let mut out = Delta::new();

        while this.has_next() || that.has_next() {
            if that.peek_kind() == OpKind::Insert {
                out.push(that.next(usize::MAX));
            } else if this.peek_kind() == OpKind::Delete {
                out.push(this.next(usize::MAX));
            } else {
                let length = this.peek_len().min(that.peek_len());
                let this_op = this.next(length);
                let that_op = that.next(length);

                match that_op {
                    Op::Retain {
                        attributes: that_attributes,
                        ..
                    } => {
                        let composed = match this_op {
                            Op::Retain { attributes, .. } => Op::Retain {
                                retain: length,
                                attributes: compose_attributes(
                                    attributes.as_ref(),
                                    that_attributes.as_ref(),
                                    true,
                                ),
                            },
                            Op::Insert { insert, attributes } => Op::Insert {
                                insert,
                                attributes: compose_attributes(
                                    attributes.as_ref(),
                                    that_attributes.as_ref(),
                                    false,
                                ),
                            },
                            delete @ Op::Delete { .. } => delete,
                        };
                        out.push(composed);
                    }
                    // Deleting something this delta inserted cancels both.
                    Op::Delete { delete } => {
                        if this_op.kind() == OpKind::Retain {
                            out.push(Op::Delete { delete });
                        }
                    }
                    Op::Insert { .. } => {}
                }
            }
        }

        out.chop()
    }

    /// Hydrate from the `delta` wire field: a JSON string, an inline object, or nothing.
    pub(crate) fn from_wire(value: Value) -> Delta {
        match value {
            Value::String(s) if !s.trim().is_empty() => {
                serde_json::from_str(&s).unwrap_or_default()
            }
            v @ Value::Object(_) => serde_json::from_value(v).unwrap_or_default(),
            _ => Delta::default(),
        }
    }

    pub(crate) fn to_wire(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `#[serde(with = "...")]` adapter: the backend stores deltas as JSON strings.
pub(crate) mod wire {
    use super::Delta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(delta: &Delta, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&delta.to_wire())
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Delta, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        Ok(Delta::from_wire(value))
    }
}

fn compose_attributes(
    a: Option<&AttributeMap>,
    b: Option<&AttributeMap>,
    keep_null: bool,
) -> Option<AttributeMap> {
    let mut out = b.cloned().unwrap_or_default();
    if !keep_null {
        out.retain(|_, v| !v.is_null());
    }
    if let Some(a) = a {
        for (k, v) in a {
            if !b.is_some_and(|b| b.contains_key(k)) {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    Some(out).filter(|m| !m.is_empty())
}

struct OpIter<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpIter<'a> {
    fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    fn has_next(&self) -> bool {
        self.index < self.ops.len()
    }

    /// Remaining length of the current op; `usize::MAX` once exhausted
    /// (an implicit infinite retain).
    fn peek_len(&self) -> usize {
        self.ops
            .get(self.index)
            .map(|op| op.len() - self.offset)
            .unwrap_or(usize::MAX)
    }

    fn peek_kind(&self) -> OpKind {
        self.ops
            .get(self.index)
            .map(Op::kind)
            .unwrap_or(OpKind::Retain)
    }

    fn next(&mut self, length: usize) -> Op {
        let Some(op) = self.ops.get(self.index) else {
            return Op::Retain {
                retain: usize::MAX,
                attributes: None,
            };
        };

        let offset = self.offset;
        let remaining = op.len() - offset;
        let length = if length >= remaining {
            self.index += 1;
            self.offset = 0;
            remaining
        } else {
            self.offset += length;
            length
        };

        match op {
            Op::Insert { insert, attributes } => Op::Insert {
                insert: insert.slice(offset, length),
                attributes: attributes.clone(),
            },
            Op::Retain { attributes, .. } => Op::Retain {
                retain: length,
                attributes: attributes.clone(),
            },
            Op::Delete { .. } => Op::Delete { delete: length },
        }
    }
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

fn slice_utf16(s: &str, start: usize, len: usize) -> String {
    let end = start.saturating_add(len);
    let mut pos = 0;
    let mut out = String::new();
    for c in s.chars() {
        if pos >= end {
            break;
        }
        let w = c.len_utf16();
        if pos >= start && pos + w <= end {
            out.push(c);
        }
        pos += w;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bold() -> AttributeMap {
        let mut m = AttributeMap::new();
        m.insert("bold".to_string(), json!(true));
        m
    }

    #[test]
    fn parses_quill_contents() {
        let json = r#"{"ops":[{"insert":"Hello "},{"insert":"world","attributes":{"bold":true}},{"insert":"\n"}]}"#;
        let d: Delta = serde_json::from_str(json).expect("quill delta should parse");
        assert_eq!(d.ops.len(), 3);
        assert_eq!(d.length(), 12);
        assert_eq!(
            d.ops[1],
            Op::Insert {
                insert: Insert::Text("world".to_string()),
                attributes: Some(bold()),
            }
        );
    }

    #[test]
    fn serializes_without_empty_fields() {
        let d = Delta::new().retain(3).delete(2);
        let v = serde_json::to_value(&d).expect("should serialize");
        assert_eq!(v, json!({"ops":[{"retain":3},{"delete":2}]}));
    }

    #[test]
    fn rejects_op_with_two_kinds() {
        let res = serde_json::from_str::<Delta>(r#"{"ops":[{"insert":"a","delete":1}]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn embeds_count_as_one() {
        let d: Delta =
            serde_json::from_str(r#"{"ops":[{"insert":{"image":"a.png"}},{"insert":"\n"}]}"#)
                .expect("embed should parse");
        assert_eq!(d.length(), 2);
    }

    #[test]
    fn length_counts_utf16_units() {
        let d = Delta::new().insert("a😀");
        assert_eq!(d.length(), 3);
    }

    #[test]
    fn push_merges_and_reorders_insert_before_delete() {
        let d = Delta::new().insert("a").insert("b").delete(1).insert("c");
        assert_eq!(d.ops.len(), 2);
        assert_eq!(
            d.ops[0],
            Op::Insert {
                insert: Insert::Text("abc".to_string()),
                attributes: None,
            }
        );
        assert_eq!(d.ops[1], Op::Delete { delete: 1 });
    }

    #[test]
    fn compose_typing() {
        let a = Delta::new().insert("H");
        let b = Delta::new().retain(1).insert("i");
        assert_eq!(a.compose(&b), Delta::new().insert("Hi"));
    }

    #[test]
    fn compose_insert_then_delete_cancels() {
        let a = Delta::new().retain(4).insert("x");
        let b = Delta::new().retain(4).delete(1);
        assert!(a.compose(&b).is_empty());
    }

    #[test]
    fn compose_retain_formatting_onto_insert() {
        let a = Delta::new().insert("abc");
        let b = Delta::new().retain_with(2, bold());
        let c = a.compose(&b);
        assert_eq!(c, Delta::new().insert_with("ab", bold()).insert("c"));
    }

    #[test]
    fn compose_null_attribute_removes_format() {
        let mut unbold = AttributeMap::new();
        unbold.insert("bold".to_string(), Value::Null);

        let a = Delta::new().insert_with("ab", bold());
        let b = Delta::new().retain_with(2, unbold.clone());
        assert_eq!(a.compose(&b), Delta::new().insert("ab"));

        // On a retain the null is kept so it still clears the format downstream.
        let a = Delta::new().retain_with(2, bold());
        assert_eq!(a.compose(&b), Delta::new().retain_with(2, unbold));
    }

    #[test]
    fn compose_deletes_pass_through() {
        let a = Delta::new().delete(2);
        let b = Delta::new().delete(1);
        assert_eq!(a.compose(&b), Delta::new().delete(3));

        let b = Delta::new().retain(1).delete(1);
        assert_eq!(a.compose(&b), Delta::new().delete(2).retain(1).delete(1));
    }

    #[test]
    fn compose_is_associative_for_edit_sequence() {
        let a = Delta::new().insert("Hello\n");
        let b = Delta::new().retain(5).insert(" world");
        let c = Delta::new().retain(6).delete(5).insert("there");
        let left = a.compose(&b).compose(&c);
        let right = a.compose(&b.compose(&c));
        assert_eq!(left, right);
        assert_eq!(left, Delta::new().insert("Hello there\n"));
    }

    #[test]
    fn compose_splits_multibyte_text() {
        let a = Delta::new().insert("é😀z");
        let b = Delta::new().retain(1).delete(2);
        assert_eq!(a.compose(&b), Delta::new().insert("éz"));
    }

    #[test]
    fn wire_string_round_trip_and_fallbacks() {
        let d = Delta::new().insert("x\n");
        assert_eq!(Delta::from_wire(Value::String(d.to_wire())), d);
        assert!(Delta::from_wire(Value::String(String::new())).is_empty());
        assert!(Delta::from_wire(Value::String("not json".to_string())).is_empty());
        assert!(Delta::from_wire(Value::Null).is_empty());
        assert_eq!(Delta::new().to_wire(), "");
    }
}
