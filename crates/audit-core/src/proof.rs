//! Proof string parsing.
//!
//! Membership proofs are comma-separated `<side>:<hex>` items ordered from
//! leaf to root, where side is `l` (sibling on the left) or `r` (sibling on
//! the right). A consistency item is `x:<subroot-hex>` followed by the
//! membership proof of that subroot in the newer tree.

use std::str::FromStr;

use audit_canonical::Hash;

use crate::errors::ProofError;

/// Which side of the accumulator a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Sibling is the left operand.
    Left,
    /// Sibling is the right operand.
    Right,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
        }
    }
}

/// One sibling on a leaf-to-root path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofItem {
    /// Side of the sibling.
    pub side: Side,
    /// Sibling hash.
    pub hash: Hash,
}

/// Parsed membership proof.
///
/// An empty string parses to a proof with no items, which verifies only when
/// the leaf is itself the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipProof {
    items: Vec<ProofItem>,
}

impl MembershipProof {
    /// Builds a proof from already-typed items.
    pub fn new(items: Vec<ProofItem>) -> Self {
        Self { items }
    }

    /// Parses the wire form.
    pub fn parse(value: &str) -> Result<Self, ProofError> {
        if value.is_empty() {
            return Ok(Self::default());
        }

        let items = value
            .split(',')
            .map(|item| {
                let (label, hex) = item
                    .split_once(':')
                    .ok_or_else(|| ProofError::MissingSeparator(item.to_string()))?;
                let side = match label {
                    "l" => Side::Left,
                    "r" => Side::Right,
                    other => return Err(ProofError::InvalidSide(other.to_string())),
                };
                Ok(ProofItem {
                    side,
                    hash: Hash::from_hex(hex)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items })
    }

    /// Items in leaf-to-root order.
    pub fn items(&self) -> &[ProofItem] {
        &self.items
    }

    /// True when the proof has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Renders the wire form.
    pub fn to_wire(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{}:{}", item.side.label(), item.hash))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for MembershipProof {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One subroot of the older tree plus its membership in the newer tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyItem {
    /// Subroot hash of the older tree.
    pub subroot: Hash,
    /// Path from the subroot to the newer root.
    pub membership: MembershipProof,
}

impl ConsistencyItem {
    /// Parses `x:<subroot>[,<membership proof>]`.
    pub fn parse(value: &str) -> Result<Self, ProofError> {
        let (root_chunk, rest) = value.split_once(',').unwrap_or((value, ""));
        let (label, hex) = root_chunk
            .split_once(':')
            .ok_or_else(|| ProofError::MissingSeparator(root_chunk.to_string()))?;
        if label != "x" {
            return Err(ProofError::InvalidRootLabel(label.to_string()));
        }

        Ok(Self {
            subroot: Hash::from_hex(hex)?,
            membership: MembershipProof::parse(rest)?,
        })
    }

    /// Renders the wire form.
    pub fn to_wire(&self) -> String {
        if self.membership.is_empty() {
            format!("x:{}", self.subroot)
        } else {
            format!("x:{},{}", self.subroot, self.membership.to_wire())
        }
    }
}

/// Parsed consistency proof; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyProof {
    items: Vec<ConsistencyItem>,
}

impl ConsistencyProof {
    /// Parses every item, rejecting an empty list.
    pub fn parse<S: AsRef<str>>(items: &[S]) -> Result<Self, ProofError> {
        if items.is_empty() {
            return Err(ProofError::Empty);
        }
        let items = items
            .iter()
            .map(|item| ConsistencyItem::parse(item.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }

    /// Items in wire order.
    pub fn items(&self) -> &[ConsistencyItem] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> Hash {
        Hash::from_bytes([byte; 32])
    }

    #[test]
    fn parses_sided_items() {
        let wire = format!("l:{},r:{}", h(1), h(2));
        let proof = MembershipProof::parse(&wire).unwrap();

        assert_eq!(
            proof.items(),
            &[
                ProofItem { side: Side::Left, hash: h(1) },
                ProofItem { side: Side::Right, hash: h(2) },
            ]
        );
        assert_eq!(proof.to_wire(), wire);
    }

    #[test]
    fn rejects_unknown_side() {
        let wire = format!("notvalidside:{}", h(1));
        assert_eq!(
            MembershipProof::parse(&wire),
            Err(ProofError::InvalidSide("notvalidside".into()))
        );
    }

    #[test]
    fn rejects_missing_separator_and_bad_hash() {
        assert!(matches!(
            MembershipProof::parse("l"),
            Err(ProofError::MissingSeparator(_))
        ));
        assert!(matches!(
            MembershipProof::parse("l:zz"),
            Err(ProofError::InvalidHash(_))
        ));
    }

    #[test]
    fn empty_membership_has_no_items() {
        assert!(MembershipProof::parse("").unwrap().is_empty());
    }

    #[test]
    fn parses_consistency_item() {
        let wire = format!("x:{},r:{}", h(3), h(4));
        let item = ConsistencyItem::parse(&wire).unwrap();

        assert_eq!(item.subroot, h(3));
        assert_eq!(item.membership.items().len(), 1);
        assert_eq!(item.to_wire(), wire);

        let bare = ConsistencyItem::parse(&format!("x:{}", h(5))).unwrap();
        assert!(bare.membership.is_empty());
    }

    #[test]
    fn consistency_requires_x_label() {
        let wire = format!("{},r:{}", h(3), h(4));
        assert!(ConsistencyItem::parse(&wire).is_err());

        let wire = format!("l:{},r:{}", h(3), h(4));
        assert_eq!(
            ConsistencyItem::parse(&wire),
            Err(ProofError::InvalidRootLabel("l".into()))
        );
    }

    #[test]
    fn empty_consistency_proof_is_rejected() {
        let items: [&str; 0] = [];
        assert_eq!(ConsistencyProof::parse(&items), Err(ProofError::Empty));
    }
}
