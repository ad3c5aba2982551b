//! Monotone policy formulas: parsing, evaluation, and tree-based sharing
//!
//! The grammar is deliberately small:
//!
//! ```text
//! expr   := factor ((and|or) factor)*
//! factor := IDENT | "(" expr ")"
//! ```
//!
//! `and` and `or` carry **equal precedence and associate to the left**, so
//! `a and b or c` parses as `(a and b) or c`. This is a wire-format
//! property: the share map distributed over a formula depends on its
//! shape, and a conventional-precedence parser would produce different
//! maps for the same text. Identifiers are any whitespace-delimited word
//! that is not a reserved operator or parenthesis, and each identifier
//! may appear as at most one leaf — the share map is keyed by identifier,
//! so a repeated atom under two different `and` splits would collide and
//! reconstruct garbage. [`Policy::parse`] rejects such formulas.
//!
//! Sharing walks the tree top-down starting from `(0, root_secret)`:
//! an `and` node splits its secret with a (2,2) Shamir sharing (abscissa 1
//! left, 2 right), an `or` node hands the same secret to both children
//! (tagged 1 and 2), and a leaf binds its identifier to the arriving pair.
//! Reconstruction inverts the walk: `and` interpolates its children at
//! zero, `or` takes whichever child succeeds, preferring the left. Any
//! satisfying set of leaf shares therefore rebuilds exactly the root
//! secret, and an unsatisfying one rebuilds nothing.
//!
//! The tree owns its children outright; there are no parent links.
//!
//! ```
//! use std::collections::BTreeSet;
//! use redactset::policy::Policy;
//!
//! let policy = Policy::parse("(alice and bob) or carol").unwrap();
//! let present: BTreeSet<String> = ["carol".to_string()].into_iter().collect();
//! assert!(policy.evaluate(&present));
//!
//! let present: BTreeSet<String> = ["alice".to_string()].into_iter().collect();
//! assert!(!policy.evaluate(&present));
//! ```

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

use crate::shamir::{self, Share};

/// Policy parsing failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The text contained no formula.
    #[error("policy text is empty")]
    Empty,

    /// A token appeared where the grammar does not allow it.
    #[error("unexpected `{found}` at position {pos} in policy")]
    UnexpectedToken {
        /// The offending token text.
        found: String,
        /// Byte offset of the token in the input.
        pos: usize,
    },

    /// The text ended in the middle of a production.
    #[error("policy text ended unexpectedly")]
    UnexpectedEnd,

    /// An identifier occurred as more than one leaf.
    #[error("identifier `{0}` appears more than once in policy")]
    DuplicateAtom(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Vec<(Token, usize)> {
    let mut tokens = Vec::new();
    let mut word_start = None;
    let flush = |tokens: &mut Vec<(Token, usize)>, text: &str, start: usize, end: usize| {
        let word = &text[start..end];
        let token = match word {
            "and" => Token::And,
            "or" => Token::Or,
            _ => Token::Ident(word.to_string()),
        };
        tokens.push((token, start));
    };
    for (i, c) in text.char_indices() {
        match c {
            '(' | ')' => {
                if let Some(start) = word_start.take() {
                    flush(&mut tokens, text, start, i);
                }
                let token = if c == '(' { Token::LParen } else { Token::RParen };
                tokens.push((token, i));
            }
            c if c.is_whitespace() => {
                if let Some(start) = word_start.take() {
                    flush(&mut tokens, text, start, i);
                }
            }
            _ => {
                if word_start.is_none() {
                    word_start = Some(i);
                }
            }
        }
    }
    if let Some(start) = word_start {
        flush(&mut tokens, text, start, text.len());
    }
    tokens
}

/// A node of the parsed formula.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyNode {
    /// A member identifier.
    Leaf(String),
    /// Conjunction of both children.
    And(Box<PolicyNode>, Box<PolicyNode>),
    /// Disjunction of both children.
    Or(Box<PolicyNode>, Box<PolicyNode>),
}

/// A parsed monotone formula.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    root: PolicyNode,
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a (Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a (Token, usize)> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_expr(&mut self) -> Result<PolicyNode, PolicyError> {
        let mut node = self.parse_factor()?;
        while let Some((token, _)) = self.peek() {
            let make: fn(Box<PolicyNode>, Box<PolicyNode>) -> PolicyNode = match token {
                Token::And => PolicyNode::And,
                Token::Or => PolicyNode::Or,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_factor()?;
            node = make(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<PolicyNode, PolicyError> {
        match self.next() {
            Some((Token::Ident(id), _)) => Ok(PolicyNode::Leaf(id.clone())),
            Some((Token::LParen, _)) => {
                let inner = self.parse_expr()?;
                match self.next() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((t, pos)) => Err(PolicyError::UnexpectedToken {
                        found: token_text(t),
                        pos: *pos,
                    }),
                    None => Err(PolicyError::UnexpectedEnd),
                }
            }
            Some((t, pos)) => Err(PolicyError::UnexpectedToken {
                found: token_text(t),
                pos: *pos,
            }),
            None => Err(PolicyError::UnexpectedEnd),
        }
    }
}

fn token_text(t: &Token) -> String {
    match t {
        Token::Ident(s) => s.clone(),
        Token::And => "and".into(),
        Token::Or => "or".into(),
        Token::LParen => "(".into(),
        Token::RParen => ")".into(),
    }
}

/// Walk the tree and reject any identifier that occurs as more than one
/// leaf. The share map is keyed by identifier, so a second occurrence
/// would overwrite the first share; with the two leaves sitting under
/// different `and` nodes, reconstruction would then interpolate points
/// from mismatched polynomials and miss the root secret entirely.
fn check_unique_atoms(
    node: &PolicyNode,
    seen: &mut BTreeSet<String>,
) -> Result<(), PolicyError> {
    match node {
        PolicyNode::Leaf(id) => {
            if !seen.insert(id.clone()) {
                return Err(PolicyError::DuplicateAtom(id.clone()));
            }
            Ok(())
        }
        PolicyNode::And(l, r) | PolicyNode::Or(l, r) => {
            check_unique_atoms(l, seen)?;
            check_unique_atoms(r, seen)
        }
    }
}

impl Policy {
    /// Parse policy text under the crate grammar.
    ///
    /// Each identifier may appear as at most one leaf; repeated atoms are
    /// rejected with [`PolicyError::DuplicateAtom`].
    pub fn parse(text: &str) -> Result<Policy, PolicyError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(PolicyError::Empty);
        }
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let root = parser.parse_expr()?;
        if let Some((t, pos)) = parser.next() {
            return Err(PolicyError::UnexpectedToken {
                found: token_text(t),
                pos: *pos,
            });
        }
        check_unique_atoms(&root, &mut BTreeSet::new())?;
        Ok(Policy { root })
    }

    /// Evaluate the formula over a set of identifiers bound true.
    ///
    /// Identifiers absent from `present` are false.
    pub fn evaluate(&self, present: &BTreeSet<String>) -> bool {
        fn walk(node: &PolicyNode, present: &BTreeSet<String>) -> bool {
            match node {
                PolicyNode::Leaf(id) => present.contains(id),
                PolicyNode::And(l, r) => {
                    let lv = walk(l, present);
                    let rv = walk(r, present);
                    lv && rv
                }
                PolicyNode::Or(l, r) => walk(l, present) || walk(r, present),
            }
        }
        walk(&self.root, present)
    }

    /// All identifiers appearing as leaves.
    pub fn atoms(&self) -> BTreeSet<String> {
        fn walk(node: &PolicyNode, out: &mut BTreeSet<String>) {
            match node {
                PolicyNode::Leaf(id) => {
                    out.insert(id.clone());
                }
                PolicyNode::And(l, r) | PolicyNode::Or(l, r) => {
                    walk(l, out);
                    walk(r, out);
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.root, &mut out);
        out
    }

    /// Distribute shares of a freshly sampled root secret over the tree.
    ///
    /// Returns the leaf binding `identifier → (x, y)` and the root secret
    /// the satisfying reconstructions will produce. Parsing guarantees one
    /// leaf per identifier, so every binding is distinct.
    pub fn distribute_shares<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> (BTreeMap<String, Share>, BigUint) {
        fn walk<R: RngCore + CryptoRng>(
            node: &PolicyNode,
            x: u32,
            y: BigUint,
            rng: &mut R,
            out: &mut BTreeMap<String, Share>,
        ) {
            match node {
                PolicyNode::Leaf(id) => {
                    out.insert(id.clone(), Share { x: BigUint::from(x), y });
                }
                PolicyNode::And(l, r) => {
                    let split = shamir::share(&y, 2, 2, rng);
                    walk(l, 1, split[0].y.clone(), rng, out);
                    walk(r, 2, split[1].y.clone(), rng, out);
                }
                PolicyNode::Or(l, r) => {
                    walk(l, 1, y.clone(), rng, out);
                    walk(r, 2, y, rng, out);
                }
            }
        }

        let secret = shamir::random_field_element(rng);
        let mut out = BTreeMap::new();
        walk(&self.root, 0, secret.clone(), rng, &mut out);
        (out, secret)
    }

    /// Rebuild the root secret from leaf shares.
    ///
    /// Returns `None` whenever the bound identifiers do not satisfy the
    /// formula (some required leaf is missing).
    pub fn reconstruct(&self, shares: &BTreeMap<String, Share>) -> Option<BigUint> {
        fn walk(node: &PolicyNode, shares: &BTreeMap<String, Share>) -> Option<Share> {
            match node {
                PolicyNode::Leaf(id) => shares.get(id).cloned(),
                PolicyNode::And(l, r) => {
                    let ls = walk(l, shares)?;
                    let rs = walk(r, shares)?;
                    let y = shamir::reconstruct(&[
                        Share { x: BigUint::from(1u32), y: ls.y },
                        Share { x: BigUint::from(2u32), y: rs.y },
                    ])?;
                    Some(Share { x: BigUint::from(0u32), y })
                }
                PolicyNode::Or(l, r) => walk(l, shares).or_else(|| walk(r, shares)),
            }
        }
        walk(&self.root, shares).map(|s| s.y)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_expected_shapes() {
        let p = Policy::parse("a").unwrap();
        assert_eq!(p.root, PolicyNode::Leaf("a".into()));

        let p = Policy::parse("(a and b) or (c and d)").unwrap();
        assert_eq!(
            p.root,
            PolicyNode::Or(
                Box::new(PolicyNode::And(
                    Box::new(PolicyNode::Leaf("a".into())),
                    Box::new(PolicyNode::Leaf("b".into())),
                )),
                Box::new(PolicyNode::And(
                    Box::new(PolicyNode::Leaf("c".into())),
                    Box::new(PolicyNode::Leaf("d".into())),
                )),
            )
        );
    }

    #[test]
    fn operators_share_precedence_left_associatively() {
        // `a and b or c` must parse as `(a and b) or c`. Conventional
        // precedence would bind `b or c` first and flip the result for
        // {c} alone.
        let p = Policy::parse("a and b or c").unwrap();
        assert!(p.evaluate(&set(&["c"])));
        assert!(!p.evaluate(&set(&["a"])));
        assert!(p.evaluate(&set(&["a", "b"])));

        // Same shape check on the tree itself.
        assert_eq!(
            p.root,
            PolicyNode::Or(
                Box::new(PolicyNode::And(
                    Box::new(PolicyNode::Leaf("a".into())),
                    Box::new(PolicyNode::Leaf("b".into())),
                )),
                Box::new(PolicyNode::Leaf("c".into())),
            )
        );
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(Policy::parse(""), Err(PolicyError::Empty));
        assert_eq!(Policy::parse("   "), Err(PolicyError::Empty));
        assert_eq!(Policy::parse("a and"), Err(PolicyError::UnexpectedEnd));
        assert_eq!(Policy::parse("(a"), Err(PolicyError::UnexpectedEnd));
        assert!(matches!(
            Policy::parse("a b"),
            Err(PolicyError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Policy::parse(") a"),
            Err(PolicyError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Policy::parse("and a"),
            Err(PolicyError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn evaluation_matches_truth_table() {
        let p = Policy::parse("(a and b) or (c and d)").unwrap();
        assert!(p.evaluate(&set(&["a", "b"])));
        assert!(p.evaluate(&set(&["c", "d"])));
        assert!(p.evaluate(&set(&["a", "b", "c", "d"])));
        assert!(!p.evaluate(&set(&["a", "c"])));
        assert!(!p.evaluate(&set(&["b", "d"])));
        assert!(!p.evaluate(&set(&[])));
        // Unknown identifiers are simply false.
        assert!(!p.evaluate(&set(&["x", "y"])));
    }

    #[test]
    fn atoms_are_collected() {
        let p = Policy::parse("(a and b) or (c and d)").unwrap();
        assert_eq!(p.atoms(), set(&["a", "b", "c", "d"]));
        assert_eq!(Policy::parse("solo").unwrap().atoms(), set(&["solo"]));
    }

    #[test]
    fn repeated_atoms_are_rejected() {
        // A repeated atom under two different `and` splits would collide
        // in the share map and interpolate mismatched polynomials.
        for bad in ["a and a", "(a and b) or (a and c)", "a or (b and a)"] {
            assert_eq!(
                Policy::parse(bad),
                Err(PolicyError::DuplicateAtom("a".into())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn satisfying_subsets_reconstruct_the_root_secret() {
        let mut rng = StdRng::from_seed([41u8; 32]);
        let p = Policy::parse("(a and b) or (c and d)").unwrap();
        let (shares, secret) = p.distribute_shares(&mut rng);
        assert_eq!(shares.len(), 4);

        // Full map.
        assert_eq!(p.reconstruct(&shares), Some(secret.clone()));

        // Each satisfying restriction.
        for keep in [["a", "b"], ["c", "d"]] {
            let sub: BTreeMap<String, Share> = shares
                .iter()
                .filter(|(k, _)| keep.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            assert_eq!(p.reconstruct(&sub), Some(secret.clone()), "{keep:?}");
        }
    }

    #[test]
    fn unsatisfying_subsets_reconstruct_nothing() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let p = Policy::parse("(a and b) or (c and d)").unwrap();
        let (shares, _) = p.distribute_shares(&mut rng);

        for keep in [vec!["a", "c"], vec!["b"], vec![]] {
            let sub: BTreeMap<String, Share> = shares
                .iter()
                .filter(|(k, _)| keep.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            assert_eq!(p.reconstruct(&sub), None, "{keep:?}");
        }
    }

    #[test]
    fn leaf_abscissas_track_branch_position() {
        let mut rng = StdRng::from_seed([43u8; 32]);

        // Root leaf carries the untouched (0, secret) pair.
        let p = Policy::parse("solo").unwrap();
        let (shares, secret) = p.distribute_shares(&mut rng);
        assert_eq!(shares["solo"], Share { x: BigUint::from(0u32), y: secret });

        // Children of a binary node are tagged 1 (left) and 2 (right).
        let p = Policy::parse("l or r").unwrap();
        let (shares, secret) = p.distribute_shares(&mut rng);
        assert_eq!(shares["l"].x, BigUint::from(1u32));
        assert_eq!(shares["r"].x, BigUint::from(2u32));
        // `or` replicates the secret itself.
        assert_eq!(shares["l"].y, secret);
        assert_eq!(shares["r"].y, secret);
    }

    #[test]
    fn every_subset_of_atoms_behaves_like_boolean_evaluation() {
        // For each subset X of the atom set, `evaluate` must agree with
        // plain boolean evaluation (atoms in X true, the rest false), and
        // reconstruction from the share sub-map restricted to X must
        // succeed exactly on the satisfying subsets.
        let mut rng = StdRng::from_seed([45u8; 32]);
        let p = Policy::parse("(a and b) or (c and d)").unwrap();
        let atoms = ["a", "b", "c", "d"];
        let (shares, secret) = p.distribute_shares(&mut rng);

        for mask in 0u32..16 {
            let subset: Vec<&str> = atoms
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| *s)
                .collect();
            let present = set(&subset);

            let a = mask & 1 != 0;
            let b = mask & 2 != 0;
            let c = mask & 4 != 0;
            let d = mask & 8 != 0;
            let expected = (a && b) || (c && d);
            assert_eq!(p.evaluate(&present), expected, "mask {mask:04b}");

            let restricted: BTreeMap<String, Share> = shares
                .iter()
                .filter(|(k, _)| present.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let rebuilt = p.reconstruct(&restricted);
            if expected {
                assert_eq!(rebuilt, Some(secret.clone()), "mask {mask:04b}");
            } else {
                assert_eq!(rebuilt, None, "mask {mask:04b}");
            }
        }
    }

    #[test]
    fn and_split_is_a_two_of_two_sharing() {
        let mut rng = StdRng::from_seed([44u8; 32]);
        let p = Policy::parse("l and r").unwrap();
        let (shares, secret) = p.distribute_shares(&mut rng);
        // Neither child alone carries the secret, together they do.
        assert_ne!(shares["l"].y, secret);
        assert_ne!(shares["r"].y, secret);
        assert_eq!(p.reconstruct(&shares), Some(secret));
    }
}
